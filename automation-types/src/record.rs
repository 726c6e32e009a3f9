//! Local-store record shapes.
//!
//! These are the cleartext forms of the entries in `LocalAssets.json` and
//! `SecureLocalAssets.json`. Field names match the on-disk documents.

use crate::asset::AssetKind;
use crate::timestamp::last_modified;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalVariable {
    pub name: String,
    #[serde(with = "last_modified")]
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub value: Value,
    /// Implied by the document the record was read from.
    #[serde(skip)]
    pub encrypted: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalCredential {
    pub name: String,
    #[serde(with = "last_modified")]
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalCertificate {
    pub name: String,
    #[serde(with = "last_modified")]
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub thumbprint: Option<String>,
    #[serde(default, rename = "CertPath")]
    pub certificate_path: Option<PathBuf>,
    #[serde(default)]
    pub exportable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Implied by the document the record was read from.
    #[serde(skip)]
    pub encrypted: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalConnection {
    pub name: String,
    #[serde(with = "last_modified")]
    pub last_modified: DateTime<Utc>,
    pub connection_type: String,
    #[serde(default)]
    pub value_fields: BTreeMap<String, Value>,
}

/// Unified, decrypted view of everything stored for one workspace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalAssets {
    pub variables: Vec<LocalVariable>,
    pub credentials: Vec<LocalCredential>,
    pub certificates: Vec<LocalCertificate>,
    pub connections: Vec<LocalConnection>,
}

impl LocalAssets {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.variables.len()
            + self.credentials.len()
            + self.certificates.len()
            + self.connections.len()
    }

    pub fn variable(&self, name: &str) -> Option<&LocalVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn credential(&self, name: &str) -> Option<&LocalCredential> {
        self.credentials.iter().find(|c| c.name == name)
    }

    pub fn certificate(&self, name: &str) -> Option<&LocalCertificate> {
        self.certificates.iter().find(|c| c.name == name)
    }

    pub fn connection(&self, name: &str) -> Option<&LocalConnection> {
        self.connections.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, kind: AssetKind, name: &str) -> bool {
        match kind {
            AssetKind::Variable => self.variable(name).is_some(),
            AssetKind::Credential => self.credential(name).is_some(),
            AssetKind::Certificate => self.certificate(name).is_some(),
            AssetKind::Connection => self.connection(name).is_some(),
        }
    }
}
