//! Resource manager request and response shapes.

use automation_types::{
    CloudCertificate, CloudConnection, CloudCredential, CloudVariable, ConnectionTypeSchema,
    FieldDefinition,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One page of a collection. `next_link` is an absolute URL.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Resource<P> {
    pub name: String,
    pub properties: P,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResourceBody<P> {
    pub name: String,
    pub properties: P,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct NameRef {
    pub name: String,
}

/// Error payload, either bare or wrapped in `{"error": {...}}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    pub error: Option<Box<ErrorBody>>,
}

impl ErrorBody {
    pub fn into_parts(self) -> (Option<String>, Option<String>) {
        match self.error {
            Some(inner) => inner.into_parts(),
            None => (self.code, self.message),
        }
    }
}

fn modified(last_modified: Option<DateTime<Utc>>, created: Option<DateTime<Utc>>) -> DateTime<Utc> {
    last_modified.or(created).unwrap_or(DateTime::UNIX_EPOCH)
}

// ── Variables ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariableProperties {
    pub value: Option<String>,
    #[serde(default)]
    pub is_encrypted: bool,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_modified_time: Option<DateTime<Utc>>,
}

impl From<Resource<VariableProperties>> for CloudVariable {
    fn from(r: Resource<VariableProperties>) -> Self {
        let p = r.properties;
        CloudVariable {
            name: r.name,
            value: p.value,
            is_encrypted: p.is_encrypted,
            last_modified: modified(p.last_modified_time, p.creation_time),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariableCreate {
    /// JSON text of the value.
    pub value: String,
    pub is_encrypted: bool,
}

// ── Credentials ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CredentialProperties {
    pub user_name: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_modified_time: Option<DateTime<Utc>>,
}

impl From<Resource<CredentialProperties>> for CloudCredential {
    fn from(r: Resource<CredentialProperties>) -> Self {
        let p = r.properties;
        CloudCredential {
            name: r.name,
            username: p.user_name,
            last_modified: modified(p.last_modified_time, p.creation_time),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CredentialCreate {
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

// ── Certificates ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CertificateProperties {
    pub thumbprint: Option<String>,
    #[serde(default)]
    pub is_exportable: bool,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_modified_time: Option<DateTime<Utc>>,
}

impl From<Resource<CertificateProperties>> for CloudCertificate {
    fn from(r: Resource<CertificateProperties>) -> Self {
        let p = r.properties;
        CloudCertificate {
            name: r.name,
            thumbprint: p.thumbprint,
            is_exportable: p.is_exportable,
            last_modified: modified(p.last_modified_time, p.creation_time),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CertificateCreate {
    pub base64_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub is_exportable: bool,
}

// ── Connections ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConnectionProperties {
    #[serde(default)]
    pub connection_type: NameRef,
    /// Only populated on single-connection reads; encrypted fields are omitted.
    #[serde(default)]
    pub field_definition_values: BTreeMap<String, Option<String>>,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_modified_time: Option<DateTime<Utc>>,
}

impl From<Resource<ConnectionProperties>> for CloudConnection {
    fn from(r: Resource<ConnectionProperties>) -> Self {
        let p = r.properties;
        CloudConnection {
            name: r.name,
            connection_type: p.connection_type.name,
            field_values: p.field_definition_values,
            last_modified: modified(p.last_modified_time, p.creation_time),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConnectionCreate {
    pub connection_type: NameRef,
    pub field_definition_values: BTreeMap<String, String>,
}

// ── Connection types ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConnectionTypeProperties {
    #[serde(default)]
    pub field_definitions: BTreeMap<String, FieldDefinitionWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldDefinitionWire {
    #[serde(default)]
    pub is_encrypted: bool,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(rename = "type", default)]
    pub field_type: String,
}

impl From<Resource<ConnectionTypeProperties>> for ConnectionTypeSchema {
    fn from(r: Resource<ConnectionTypeProperties>) -> Self {
        let fields = r
            .properties
            .field_definitions
            .into_iter()
            .map(|(name, f)| {
                let definition = FieldDefinition {
                    is_encrypted: f.is_encrypted,
                    is_optional: f.is_optional,
                    field_type: f.field_type,
                };
                (name, definition)
            })
            .collect();
        ConnectionTypeSchema {
            name: r.name,
            fields,
        }
    }
}
