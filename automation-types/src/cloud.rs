//! Cloud-side asset records, normalised from the service's responses.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct CloudVariable {
    pub name: String,
    /// JSON-encoded value text; `None` when the service redacts it.
    pub value: Option<String>,
    pub is_encrypted: bool,
    pub last_modified: DateTime<Utc>,
}

/// The service never returns credential passwords.
#[derive(Clone, Debug, PartialEq)]
pub struct CloudCredential {
    pub name: String,
    pub username: Option<String>,
    pub last_modified: DateTime<Utc>,
}

/// Cloud certificates carry no file path or password.
#[derive(Clone, Debug, PartialEq)]
pub struct CloudCertificate {
    pub name: String,
    pub thumbprint: Option<String>,
    pub is_exportable: bool,
    pub last_modified: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CloudConnection {
    pub name: String,
    pub connection_type: String,
    /// Encrypted fields come back as `None`.
    pub field_values: BTreeMap<String, Option<String>>,
    pub last_modified: DateTime<Utc>,
}
