//! The four asset variants and the `Asset` sum type over them.

use crate::cloud::{CloudCertificate, CloudConnection, CloudCredential, CloudVariable};
use crate::item::{ItemMeta, SyncStatus};
use crate::record::{LocalCertificate, LocalConnection, LocalCredential, LocalVariable};
use crate::snippet::{self, RunbookLanguage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Asset variant tag.
///
/// Declaration order matches the alphabetical order of [`AssetKind::type_name`],
/// so the derived `Ord` sorts by type name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Certificate,
    Connection,
    Credential,
    Variable,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Certificate,
        AssetKind::Connection,
        AssetKind::Credential,
        AssetKind::Variable,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            AssetKind::Certificate => "AutomationCertificate",
            AssetKind::Connection => "AutomationConnection",
            AssetKind::Credential => "AutomationCredential",
            AssetKind::Variable => "AutomationVariable",
        }
    }

    /// Top-level key of this kind's array in the local documents.
    pub fn document_key(self) -> &'static str {
        match self {
            AssetKind::Certificate => "Certificate",
            AssetKind::Connection => "Connection",
            AssetKind::Credential => "PSCredential",
            AssetKind::Variable => "Variable",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Identity of an asset within a workspace: variant plus case-sensitive name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetKey {
    pub kind: AssetKind,
    pub name: String,
}

impl AssetKey {
    pub fn new(kind: AssetKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.document_key(), self.name)
    }
}

// ============================================================================
// Variable
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    meta: ItemMeta,
    value: Value,
    encrypted: bool,
}

impl Variable {
    /// A new variable authored locally.
    pub fn new(name: impl Into<String>, value: Value, encrypted: bool) -> Self {
        Self {
            meta: ItemMeta::created_now(name),
            value,
            encrypted,
        }
    }

    pub fn from_local(record: &LocalVariable) -> Self {
        Self {
            meta: ItemMeta::local(&record.name, record.last_modified),
            value: record.value.clone(),
            encrypted: record.encrypted,
        }
    }

    /// Builds a cloud-only variable. An unparsable value degrades to null.
    pub fn from_cloud(record: &CloudVariable) -> Self {
        Self {
            meta: ItemMeta::cloud(&record.name, record.last_modified),
            value: parse_cloud_value(&record.name, record.value.as_deref()),
            encrypted: record.is_encrypted,
        }
    }

    /// Cloud is authoritative for the encryption flag and for plain values;
    /// an encrypted value comes back redacted, so the local one is kept.
    pub fn merged(local: &LocalVariable, cloud: &CloudVariable) -> Self {
        let value = if cloud.is_encrypted {
            local.value.clone()
        } else {
            parse_cloud_value(&cloud.name, cloud.value.as_deref())
        };
        Self {
            meta: ItemMeta::both(&cloud.name, local.last_modified, cloud.last_modified),
            value,
            encrypted: cloud.is_encrypted,
        }
    }

    pub fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn set_encrypted(&mut self, encrypted: bool) {
        self.encrypted = encrypted;
    }

    pub fn to_local_record(&self) -> LocalVariable {
        LocalVariable {
            name: self.meta.name().to_string(),
            last_modified: self.meta.last_modified(),
            value: self.value.clone(),
            encrypted: self.encrypted,
        }
    }
}

fn parse_cloud_value(name: &str, raw: Option<&str>) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("variable {name}: cloud value is not valid JSON, using null: {e}");
            Value::Null
        }
    }
}

// ============================================================================
// Credential
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Credential {
    meta: ItemMeta,
    username: Option<String>,
    password: Option<String>,
}

impl Credential {
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            meta: ItemMeta::created_now(name),
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    pub fn from_local(record: &LocalCredential) -> Self {
        Self {
            meta: ItemMeta::local(&record.name, record.last_modified),
            username: record.username.clone(),
            password: record.password.clone(),
        }
    }

    pub fn from_cloud(record: &CloudCredential) -> Self {
        Self {
            meta: ItemMeta::cloud(&record.name, record.last_modified),
            username: record.username.clone(),
            password: None,
        }
    }

    /// Username from the cloud, password from the local record.
    pub fn merged(local: &LocalCredential, cloud: &CloudCredential) -> Self {
        Self {
            meta: ItemMeta::both(&cloud.name, local.last_modified, cloud.last_modified),
            username: cloud.username.clone().or_else(|| local.username.clone()),
            password: local.password.clone(),
        }
    }

    pub fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn set_password(&mut self, password: Option<String>) {
        self.password = password;
    }

    pub fn to_local_record(&self) -> LocalCredential {
        LocalCredential {
            name: self.meta.name().to_string(),
            last_modified: self.meta.last_modified(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

// ============================================================================
// Certificate
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Certificate {
    meta: ItemMeta,
    thumbprint: Option<String>,
    certificate_path: Option<PathBuf>,
    password: Option<String>,
    exportable: bool,
    encrypted: bool,
}

impl Certificate {
    pub fn new(
        name: impl Into<String>,
        certificate_path: impl Into<PathBuf>,
        password: Option<String>,
        exportable: bool,
        encrypted: bool,
    ) -> Self {
        Self {
            meta: ItemMeta::created_now(name),
            thumbprint: None,
            certificate_path: Some(certificate_path.into()),
            password,
            exportable,
            encrypted,
        }
    }

    pub fn from_local(record: &LocalCertificate) -> Self {
        Self {
            meta: ItemMeta::local(&record.name, record.last_modified),
            thumbprint: record.thumbprint.clone(),
            certificate_path: record.certificate_path.clone(),
            password: record.password.clone(),
            exportable: record.exportable,
            encrypted: record.encrypted,
        }
    }

    pub fn from_cloud(record: &CloudCertificate) -> Self {
        Self {
            meta: ItemMeta::cloud(&record.name, record.last_modified),
            thumbprint: record.thumbprint.clone(),
            certificate_path: None,
            password: None,
            exportable: record.is_exportable,
            encrypted: false,
        }
    }

    /// Thumbprint and exportability from the cloud; file path, password and
    /// encryption preference from the local record.
    pub fn merged(local: &LocalCertificate, cloud: &CloudCertificate) -> Self {
        Self {
            meta: ItemMeta::both(&cloud.name, local.last_modified, cloud.last_modified),
            thumbprint: cloud.thumbprint.clone().or_else(|| local.thumbprint.clone()),
            certificate_path: local.certificate_path.clone(),
            password: local.password.clone(),
            exportable: cloud.is_exportable,
            encrypted: local.encrypted,
        }
    }

    pub fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    pub fn thumbprint(&self) -> Option<&str> {
        self.thumbprint.as_deref()
    }

    pub fn set_thumbprint(&mut self, thumbprint: Option<String>) {
        self.thumbprint = thumbprint;
    }

    pub fn certificate_path(&self) -> Option<&Path> {
        self.certificate_path.as_deref()
    }

    pub fn set_certificate_path(&mut self, path: Option<PathBuf>) {
        self.certificate_path = path;
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn set_password(&mut self, password: Option<String>) {
        self.password = password;
    }

    pub fn is_exportable(&self) -> bool {
        self.exportable
    }

    pub fn set_exportable(&mut self, exportable: bool) {
        self.exportable = exportable;
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn set_encrypted(&mut self, encrypted: bool) {
        self.encrypted = encrypted;
    }

    /// A certificate holding a password is kept in the secure document even
    /// when not flagged encrypted.
    pub fn needs_secure_storage(&self) -> bool {
        self.encrypted || self.password.is_some()
    }

    pub fn to_local_record(&self) -> LocalCertificate {
        LocalCertificate {
            name: self.meta.name().to_string(),
            last_modified: self.meta.last_modified(),
            thumbprint: self.thumbprint.clone(),
            certificate_path: self.certificate_path.clone(),
            exportable: self.exportable,
            password: self.password.clone(),
            encrypted: self.needs_secure_storage(),
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    meta: ItemMeta,
    connection_type: String,
    value_fields: BTreeMap<String, Value>,
}

impl Connection {
    pub fn new(
        name: impl Into<String>,
        connection_type: impl Into<String>,
        value_fields: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            meta: ItemMeta::created_now(name),
            connection_type: connection_type.into(),
            value_fields,
        }
    }

    pub fn from_local(record: &LocalConnection) -> Self {
        Self {
            meta: ItemMeta::local(&record.name, record.last_modified),
            connection_type: record.connection_type.clone(),
            value_fields: record.value_fields.clone(),
        }
    }

    pub fn from_cloud(record: &CloudConnection) -> Self {
        Self {
            meta: ItemMeta::cloud(&record.name, record.last_modified),
            connection_type: record.connection_type.clone(),
            value_fields: record
                .field_values
                .iter()
                .map(|(field, value)| (field.clone(), cloud_field(value)))
                .collect(),
        }
    }

    /// Fields the cloud returned win; fields it redacted keep their local value.
    pub fn merged(local: &LocalConnection, cloud: &CloudConnection) -> Self {
        let mut value_fields = local.value_fields.clone();
        for (field, value) in &cloud.field_values {
            match value {
                Some(_) => {
                    value_fields.insert(field.clone(), cloud_field(value));
                }
                None => {
                    value_fields.entry(field.clone()).or_insert(Value::Null);
                }
            }
        }
        Self {
            meta: ItemMeta::both(&cloud.name, local.last_modified, cloud.last_modified),
            connection_type: cloud.connection_type.clone(),
            value_fields,
        }
    }

    pub fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    pub fn connection_type(&self) -> &str {
        &self.connection_type
    }

    pub fn value_fields(&self) -> &BTreeMap<String, Value> {
        &self.value_fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value_fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.value_fields.insert(name.into(), value);
    }

    pub fn to_local_record(&self) -> LocalConnection {
        LocalConnection {
            name: self.meta.name().to_string(),
            last_modified: self.meta.last_modified(),
            connection_type: self.connection_type.clone(),
            value_fields: self.value_fields.clone(),
        }
    }
}

fn cloud_field(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

// ============================================================================
// Asset
// ============================================================================

/// Any of the four asset variants.
///
/// Equality and ordering consider identity only: variant, then name.
#[derive(Clone, Debug)]
pub enum Asset {
    Variable(Variable),
    Credential(Credential),
    Certificate(Certificate),
    Connection(Connection),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Variable(_) => AssetKind::Variable,
            Asset::Credential(_) => AssetKind::Credential,
            Asset::Certificate(_) => AssetKind::Certificate,
            Asset::Connection(_) => AssetKind::Connection,
        }
    }

    pub fn meta(&self) -> &ItemMeta {
        match self {
            Asset::Variable(v) => &v.meta,
            Asset::Credential(c) => &c.meta,
            Asset::Certificate(c) => &c.meta,
            Asset::Connection(c) => &c.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ItemMeta {
        match self {
            Asset::Variable(v) => &mut v.meta,
            Asset::Credential(c) => &mut c.meta,
            Asset::Certificate(c) => &mut c.meta,
            Asset::Connection(c) => &mut c.meta,
        }
    }

    pub fn name(&self) -> &str {
        self.meta().name()
    }

    pub fn key(&self) -> AssetKey {
        AssetKey::new(self.kind(), self.name())
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.meta().sync_status()
    }

    /// Runbook expression that retrieves this asset.
    pub fn get_snippet(&self, language: RunbookLanguage) -> String {
        snippet::getter(self.kind(), self.name(), language)
    }

    /// Runbook statement that writes this asset, where the service supports it.
    pub fn set_snippet(&self, language: RunbookLanguage) -> Option<String> {
        snippet::setter(self.kind(), self.name(), language)
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.name() == other.name()
    }
}

impl Eq for Asset {}

impl PartialOrd for Asset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Asset {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind()
            .type_name()
            .cmp(other.kind().type_name())
            .then_with(|| self.name().cmp(other.name()))
    }
}

impl From<Variable> for Asset {
    fn from(v: Variable) -> Self {
        Asset::Variable(v)
    }
}

impl From<Credential> for Asset {
    fn from(c: Credential) -> Self {
        Asset::Credential(c)
    }
}

impl From<Certificate> for Asset {
    fn from(c: Certificate) -> Self {
        Asset::Certificate(c)
    }
}

impl From<Connection> for Asset {
    fn from(c: Connection) -> Self {
        Asset::Connection(c)
    }
}
