//! Secret-field encryption for the local asset store.
//!
//! Secrets are encrypted one field at a time with an asymmetric key pair,
//! addressed by its thumbprint:
//!
//! 1. **Key handle**: an RSA key pair. The public half encrypts, the private
//!    half decrypts. Its thumbprint is the uppercase hex SHA-256 of the
//!    DER-encoded public key.
//!
//! 2. **Key store**: resolves a thumbprint to a key handle. Stores are
//!    read-only from the asset store's point of view; installing or rotating
//!    keys happens outside the sync path.
//!
//! 3. **Field cipher**: a field's ciphertext is the base64 of the RSA-OAEP
//!    (SHA-256) encryption of its UTF-8 JSON serialisation. `null` stays
//!    `null` in both directions and never touches the key.

mod error;
pub mod field;
mod key;
mod key_store;

pub use error::{CryptoError, CryptoResult};
pub use field::{
    ciphertext_str, decrypt_bytes, decrypt_field, encrypt_bytes, encrypt_field, reencrypt_field,
};
pub use key::{thumbprint_of, KeyHandle, DEFAULT_KEY_BITS};
pub use key_store::{FileKeyStore, KeyStore, MemoryKeyStore};
