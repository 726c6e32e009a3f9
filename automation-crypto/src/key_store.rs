//! Thumbprint → key handle resolution.

use crate::error::{CryptoError, CryptoResult};
use crate::key::KeyHandle;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// Resolves a thumbprint to the key pair it identifies.
pub trait KeyStore: Send + Sync {
    fn resolve(&self, thumbprint: &str) -> CryptoResult<KeyHandle>;
}

fn normalize(thumbprint: &str) -> String {
    thumbprint.trim().to_ascii_uppercase()
}

/// Key store backed by a directory of `<THUMBPRINT>.pem` files (PKCS#8).
#[derive(Clone, Debug)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a key into the store, returning the file it was written to.
    pub fn install(&self, key: &KeyHandle) -> CryptoResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key.thumbprint())?;
        let pem = key.to_pkcs8_pem()?;
        write_owner_only(&path, pem.as_bytes())?;
        debug!("installed key {} at {}", key.thumbprint(), path.display());
        Ok(path)
    }

    /// Removes a key. Returns whether a file was deleted.
    pub fn remove(&self, thumbprint: &str) -> CryptoResult<bool> {
        let path = self.path_for(thumbprint)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, thumbprint: &str) -> CryptoResult<PathBuf> {
        let thumbprint = normalize(thumbprint);
        if thumbprint.is_empty() || !thumbprint.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CryptoError::KeyStore(format!(
                "invalid thumbprint {thumbprint:?}"
            )));
        }
        Ok(self.dir.join(format!("{thumbprint}.pem")))
    }
}

impl KeyStore for FileKeyStore {
    fn resolve(&self, thumbprint: &str) -> CryptoResult<KeyHandle> {
        let path = self.path_for(thumbprint)?;
        let pem = match fs::read_to_string(&path) {
            Ok(pem) => zeroize::Zeroizing::new(pem),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CryptoError::KeyNotFound(normalize(thumbprint)));
            }
            Err(e) => return Err(e.into()),
        };
        let key = KeyHandle::from_pkcs8_pem(&pem)?;
        if key.thumbprint() != normalize(thumbprint) {
            return Err(CryptoError::KeyStore(format!(
                "{} holds key {}",
                path.display(),
                key.thumbprint()
            )));
        }
        Ok(key)
    }
}

/// The file is never readable by others, not even before the key lands in it.
/// An existing file is narrowed to 0600 before it is truncated and rewritten.
#[cfg(unix)]
fn write_owner_only(path: &Path, contents: &[u8]) -> CryptoResult<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.set_len(0)?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn write_owner_only(path: &Path, contents: &[u8]) -> CryptoResult<()> {
    fs::write(path, contents)?;
    Ok(())
}

/// In-memory key store.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<String, KeyHandle>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: KeyHandle) -> CryptoResult<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|e| CryptoError::KeyStore(e.to_string()))?;
        keys.insert(key.thumbprint().to_string(), key);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.read().map(|keys| keys.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyStore for MemoryKeyStore {
    fn resolve(&self, thumbprint: &str) -> CryptoResult<KeyHandle> {
        let keys = self
            .keys
            .read()
            .map_err(|e| CryptoError::KeyStore(e.to_string()))?;
        keys.get(&normalize(thumbprint))
            .cloned()
            .ok_or_else(|| CryptoError::KeyNotFound(normalize(thumbprint)))
    }
}
