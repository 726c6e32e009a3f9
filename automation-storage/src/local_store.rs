//! Reads and writes a workspace's assets, encrypting secret fields.

use crate::document::{
    read_document, read_document_strict, write_document, ConnectionEntry, PlainDocument,
    SecureDocument, PLAIN_DOCUMENT, SECURE_DOCUMENT,
};
use crate::error::{StorageError, StorageResult};
use automation_crypto::{
    ciphertext_str, decrypt_field, encrypt_field, reencrypt_field, KeyHandle, KeyStore,
};
use automation_types::{
    Asset, ConnectionTypeSchemas, LocalAssets, LocalCertificate, LocalConnection,
};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Encrypted local asset store.
///
/// Holds no per-workspace state: every call names the workspace directory
/// and the thumbprint of the key to use.
#[derive(Clone)]
pub struct LocalAssetsStore {
    keys: Arc<dyn KeyStore>,
}

impl LocalAssetsStore {
    pub fn new(keys: Arc<dyn KeyStore>) -> Self {
        Self { keys }
    }

    /// Reads both documents and decrypts every secret field.
    ///
    /// Missing or corrupt documents read as empty. A secret field that is
    /// neither null nor a string is an error.
    pub fn get(
        &self,
        workspace: &Path,
        thumbprint: &str,
        schemas: &ConnectionTypeSchemas,
    ) -> StorageResult<LocalAssets> {
        let plain: PlainDocument = read_document(&workspace.join(PLAIN_DOCUMENT))?;
        let secure: SecureDocument = read_document(&workspace.join(SECURE_DOCUMENT))?;
        let mut key = LazyKey::new(self.keys.as_ref(), thumbprint);
        let mut assets = LocalAssets::default();

        for mut variable in plain.variables {
            variable.encrypted = false;
            upsert(&mut assets.variables, variable, |v| &v.name);
        }
        for mut certificate in plain.certificates {
            certificate.encrypted = false;
            upsert(&mut assets.certificates, certificate, |c| &c.name);
        }

        for mut variable in secure.variables {
            variable.value = key.decrypt(&variable.value)?;
            variable.encrypted = true;
            upsert(&mut assets.variables, variable, |v| &v.name);
        }
        for mut credential in secure.credentials {
            credential.password = key.decrypt_string(credential.password.take())?;
            upsert(&mut assets.credentials, credential, |c| &c.name);
        }
        for mut certificate in secure.certificates {
            certificate.password = key.decrypt_string(certificate.password.take())?;
            certificate.encrypted = true;
            upsert(&mut assets.certificates, certificate, |c| &c.name);
        }
        for entry in secure.connections {
            let mut connection = entry.record;
            let connection_type = connection.connection_type.clone();
            for (field, value) in connection.value_fields.iter_mut() {
                let encrypted = match &entry.encrypted_fields {
                    Some(fields) => fields.contains(field),
                    None => schemas.is_field_encrypted(&connection_type, field),
                };
                if encrypted {
                    *value = key.decrypt(value)?;
                }
            }
            upsert(&mut assets.connections, connection, |c| &c.name);
        }

        debug!("read {} local assets from {}", assets.len(), workspace.display());
        Ok(assets)
    }

    /// Writes `assets` into the workspace, replacing records of the same
    /// identity.
    ///
    /// Secret fields the new record leaves null (as the cloud returns them)
    /// are carried over from the record being replaced. With `replace` set to
    /// false the matching records are only removed.
    pub fn set(
        &self,
        workspace: &Path,
        assets: &[Asset],
        thumbprint: &str,
        schemas: &ConnectionTypeSchemas,
        replace: bool,
    ) -> StorageResult<()> {
        let mut local = self.get(workspace, thumbprint, schemas)?;

        for asset in assets {
            match asset {
                Asset::Variable(v) => {
                    let mut record = v.to_local_record();
                    if let Some(old) = take_named(&mut local.variables, &record.name, |r| &r.name) {
                        if record.encrypted && record.value.is_null() {
                            record.value = old.value;
                        }
                    }
                    if replace {
                        local.variables.push(record);
                    }
                }
                Asset::Credential(c) => {
                    let mut record = c.to_local_record();
                    let old = take_named(&mut local.credentials, &record.name, |r| &r.name);
                    if let Some(old) = old {
                        if record.password.is_none() {
                            record.password = old.password;
                        }
                    }
                    if replace {
                        local.credentials.push(record);
                    }
                }
                Asset::Certificate(c) => {
                    let mut record = c.to_local_record();
                    let old = take_named(&mut local.certificates, &record.name, |r| &r.name);
                    if let Some(old) = old {
                        patch_certificate(&mut record, old);
                    }
                    if replace {
                        local.certificates.push(record);
                    }
                }
                Asset::Connection(c) => {
                    let mut record = c.to_local_record();
                    let old = take_named(&mut local.connections, &record.name, |r| &r.name);
                    if let Some(old) = old {
                        patch_connection(&mut record, old, schemas);
                    }
                    if replace {
                        local.connections.push(record);
                    }
                }
            }
        }

        self.write(workspace, local, thumbprint, schemas)?;
        info!(
            "{} {} local assets in {}",
            if replace { "stored" } else { "removed" },
            assets.len(),
            workspace.display()
        );
        Ok(())
    }

    /// Inserts or replaces assets.
    pub fn add(
        &self,
        workspace: &Path,
        assets: &[Asset],
        thumbprint: &str,
        schemas: &ConnectionTypeSchemas,
    ) -> StorageResult<()> {
        self.set(workspace, assets, thumbprint, schemas, true)
    }

    /// Removes assets by identity.
    pub fn delete(
        &self,
        workspace: &Path,
        assets: &[Asset],
        thumbprint: &str,
        schemas: &ConnectionTypeSchemas,
    ) -> StorageResult<()> {
        self.set(workspace, assets, thumbprint, schemas, false)
    }

    /// Re-encrypts every secure document under `base` from one key to
    /// another. Returns the number of documents rewritten.
    ///
    /// A document that does not parse is left byte-for-byte as it is and is
    /// not counted.
    ///
    /// Maintenance operation for key rotation; not part of the sync path.
    pub fn reencrypt_workspaces(
        &self,
        base: &Path,
        old_thumbprint: &str,
        new_thumbprint: &str,
        schemas: &ConnectionTypeSchemas,
    ) -> StorageResult<usize> {
        let old = self.keys.resolve(old_thumbprint)?;
        let new = self.keys.resolve(new_thumbprint)?;
        let mut rewritten = 0;
        let mut skipped = 0;

        for entry in WalkDir::new(base) {
            let entry = entry?;
            if !entry.file_type().is_file() || entry.file_name() != SECURE_DOCUMENT {
                continue;
            }
            let path = entry.path();
            let mut doc: SecureDocument = match read_document_strict(path) {
                Ok(Some(doc)) => doc,
                Ok(None) => continue,
                Err(StorageError::Serialization(e)) => {
                    warn!("{} is corrupt, leaving it untouched: {e}", path.display());
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            rotate_document(&mut doc, &old, &new, schemas)?;
            write_document(path, &doc)?;
            debug!("re-encrypted {}", path.display());
            rewritten += 1;
        }

        info!(
            "re-encrypted {rewritten} secure documents under {} for key {}, {skipped} corrupt",
            base.display(),
            new.thumbprint()
        );
        Ok(rewritten)
    }

    fn write(
        &self,
        workspace: &Path,
        local: LocalAssets,
        thumbprint: &str,
        schemas: &ConnectionTypeSchemas,
    ) -> StorageResult<()> {
        let mut key = LazyKey::new(self.keys.as_ref(), thumbprint);
        let mut plain = PlainDocument::default();
        let mut secure = SecureDocument::default();

        for mut variable in local.variables {
            if variable.encrypted {
                variable.value = key.encrypt(&variable.value)?;
                secure.variables.push(variable);
            } else {
                plain.variables.push(variable);
            }
        }
        for mut credential in local.credentials {
            credential.password = key.encrypt_string(credential.password.take())?;
            secure.credentials.push(credential);
        }
        for mut certificate in local.certificates {
            if certificate.encrypted || certificate.password.is_some() {
                certificate.password = key.encrypt_string(certificate.password.take())?;
                secure.certificates.push(certificate);
            } else {
                plain.certificates.push(certificate);
            }
        }
        for mut connection in local.connections {
            let mut encrypted_fields = Vec::new();
            for (field, value) in connection.value_fields.iter_mut() {
                if schemas.is_field_encrypted(&connection.connection_type, field) {
                    *value = key.encrypt(value)?;
                    encrypted_fields.push(field.clone());
                }
            }
            secure.connections.push(ConnectionEntry {
                record: connection,
                encrypted_fields: Some(encrypted_fields),
            });
        }

        plain.variables.sort_by(|a, b| a.name.cmp(&b.name));
        plain.certificates.sort_by(|a, b| a.name.cmp(&b.name));
        secure.variables.sort_by(|a, b| a.name.cmp(&b.name));
        secure.credentials.sort_by(|a, b| a.name.cmp(&b.name));
        secure.certificates.sort_by(|a, b| a.name.cmp(&b.name));
        secure.connections.sort_by(|a, b| a.record.name.cmp(&b.record.name));

        fs::create_dir_all(workspace)?;
        write_document(&workspace.join(PLAIN_DOCUMENT), &plain)?;
        write_document(&workspace.join(SECURE_DOCUMENT), &secure)?;
        Ok(())
    }
}

/// Resolves the key on first use, so documents without ciphertext never
/// touch the key store.
struct LazyKey<'a> {
    store: &'a dyn KeyStore,
    thumbprint: &'a str,
    key: Option<KeyHandle>,
}

impl<'a> LazyKey<'a> {
    fn new(store: &'a dyn KeyStore, thumbprint: &'a str) -> Self {
        Self {
            store,
            thumbprint,
            key: None,
        }
    }

    fn get(&mut self) -> StorageResult<&KeyHandle> {
        let key = match self.key.take() {
            Some(key) => key,
            None => self.store.resolve(self.thumbprint)?,
        };
        Ok(self.key.insert(key))
    }

    fn encrypt(&mut self, value: &Value) -> StorageResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(encrypt_field(value, self.get()?)?)
    }

    fn decrypt(&mut self, value: &Value) -> StorageResult<Value> {
        if ciphertext_str(value)?.is_none() {
            return Ok(Value::Null);
        }
        Ok(decrypt_field(value, self.get()?)?)
    }

    fn encrypt_string(&mut self, value: Option<String>) -> StorageResult<Option<String>> {
        let encrypted = self.encrypt(&value.map(Value::String).unwrap_or(Value::Null))?;
        Ok(into_string(encrypted))
    }

    fn decrypt_string(&mut self, value: Option<String>) -> StorageResult<Option<String>> {
        let decrypted = self.decrypt(&value.map(Value::String).unwrap_or(Value::Null))?;
        Ok(into_string(decrypted))
    }
}

fn into_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn upsert<T>(records: &mut Vec<T>, record: T, name: impl Fn(&T) -> &String) {
    let key = name(&record).clone();
    records.retain(|r| *name(r) != key);
    records.push(record);
}

fn take_named<T>(records: &mut Vec<T>, target: &str, name: impl Fn(&T) -> &String) -> Option<T> {
    let idx = records.iter().position(|r| name(r) == target)?;
    Some(records.remove(idx))
}

/// Carries over what the cloud never returns: password, file path, and the
/// encryption preference.
fn patch_certificate(record: &mut LocalCertificate, old: LocalCertificate) {
    if record.password.is_none() {
        record.password = old.password;
    }
    if record.certificate_path.is_none() {
        record.certificate_path = old.certificate_path;
    }
    record.encrypted |= old.encrypted;
}

fn patch_connection(
    record: &mut LocalConnection,
    old: LocalConnection,
    schemas: &ConnectionTypeSchemas,
) {
    for (field, old_value) in old.value_fields {
        if !schemas.is_field_encrypted(&record.connection_type, &field) {
            continue;
        }
        let slot = record.value_fields.entry(field).or_insert(Value::Null);
        if slot.is_null() {
            *slot = old_value;
        }
    }
}

fn rotate_document(
    doc: &mut SecureDocument,
    old: &KeyHandle,
    new: &KeyHandle,
    schemas: &ConnectionTypeSchemas,
) -> StorageResult<()> {
    for variable in &mut doc.variables {
        variable.value = reencrypt_field(&variable.value, old, new)?;
    }
    for credential in &mut doc.credentials {
        credential.password = rotate_string(credential.password.take(), old, new)?;
    }
    for certificate in &mut doc.certificates {
        certificate.password = rotate_string(certificate.password.take(), old, new)?;
    }
    for entry in &mut doc.connections {
        let record = &mut entry.record;
        for (field, value) in record.value_fields.iter_mut() {
            let encrypted = match &entry.encrypted_fields {
                Some(fields) => fields.contains(field),
                None => schemas.is_field_encrypted(&record.connection_type, field),
            };
            if encrypted {
                *value = reencrypt_field(value, old, new)?;
            }
        }
    }
    Ok(())
}

fn rotate_string(
    value: Option<String>,
    old: &KeyHandle,
    new: &KeyHandle,
) -> StorageResult<Option<String>> {
    let rotated = reencrypt_field(&value.map(Value::String).unwrap_or(Value::Null), old, new)?;
    Ok(into_string(rotated))
}
