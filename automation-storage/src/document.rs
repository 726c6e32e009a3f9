//! The two per-workspace JSON documents and their file I/O.

use crate::error::StorageResult;
use automation_types::{LocalCertificate, LocalConnection, LocalCredential, LocalVariable};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, warn};

pub const PLAIN_DOCUMENT: &str = "LocalAssets.json";
pub const SECURE_DOCUMENT: &str = "SecureLocalAssets.json";

/// `LocalAssets.json`. Has no slot for credentials or connections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlainDocument {
    #[serde(rename = "Variable", default)]
    pub variables: Vec<LocalVariable>,
    #[serde(rename = "Certificate", default)]
    pub certificates: Vec<LocalCertificate>,
}

/// `SecureLocalAssets.json`. Secret fields hold base64 ciphertext.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SecureDocument {
    #[serde(rename = "Variable", default)]
    pub variables: Vec<LocalVariable>,
    #[serde(rename = "PSCredential", default)]
    pub credentials: Vec<LocalCredential>,
    #[serde(rename = "Certificate", default)]
    pub certificates: Vec<LocalCertificate>,
    #[serde(rename = "Connection", default)]
    pub connections: Vec<ConnectionEntry>,
}

/// A stored connection plus the fields that were encrypted when it was
/// written, so it can be read back without the connection-type schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEntry {
    #[serde(flatten)]
    pub record: LocalConnection,
    #[serde(rename = "EncryptedFields", default, skip_serializing_if = "Option::is_none")]
    pub encrypted_fields: Option<Vec<String>>,
}

/// Reads a document. A missing or unparsable file reads as empty.
pub(crate) fn read_document<T>(path: &Path) -> StorageResult<T>
where
    T: DeserializeOwned + Default,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not found, treating as empty", path.display());
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice(&bytes) {
        Ok(doc) => Ok(doc),
        Err(e) => {
            warn!("{} is corrupt, treating as empty: {e}", path.display());
            Ok(T::default())
        }
    }
}

/// Reads a document that must already hold valid JSON.
///
/// Returns `None` for a missing file. Unlike [`read_document`], a corrupt
/// file is an error so that callers never overwrite it.
pub(crate) fn read_document_strict<T>(path: &Path) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Replaces a document in one step: write a sibling temp file, then rename.
pub(crate) fn write_document<T: Serialize>(path: &Path, doc: &T) -> StorageResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, doc)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
