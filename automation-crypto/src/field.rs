//! Field-level encryption of JSON values.

use crate::error::{CryptoError, CryptoResult};
use crate::key::KeyHandle;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::rand_core::OsRng;
use rsa::{Oaep, RsaPublicKey};
use rsa::traits::PublicKeyParts;
use serde_json::Value;
use sha2::Sha256;
use zeroize::Zeroizing;

/// OAEP padding overhead for SHA-256: two digests plus two bytes.
const OAEP_SHA256_OVERHEAD: usize = 2 * 32 + 2;

/// Encrypts a JSON value into a base64 ciphertext string. `null` stays `null`.
pub fn encrypt_field(value: &Value, key: &KeyHandle) -> CryptoResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let plaintext = Zeroizing::new(serde_json::to_vec(value)?);
    let ciphertext = encrypt_bytes(&plaintext, key.public_key())?;
    Ok(Value::String(BASE64.encode(ciphertext)))
}

/// Decrypts a base64 ciphertext string back into its JSON value.
///
/// `null` decrypts to `null` without using the key. Any other non-string
/// value means the document is corrupt and is rejected.
pub fn decrypt_field(value: &Value, key: &KeyHandle) -> CryptoResult<Value> {
    let Some(encoded) = ciphertext_str(value)? else {
        return Ok(Value::Null);
    };
    let ciphertext = BASE64
        .decode(encoded)
        .map_err(|e| CryptoError::Decryption(format!("base64 decode: {e}")))?;
    let plaintext = decrypt_bytes(&ciphertext, key)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Checks a stored field is a valid ciphertext slot: `None` for null,
/// the encoded string otherwise.
pub fn ciphertext_str(value: &Value) -> CryptoResult<Option<&str>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(CryptoError::CiphertextNotString(json_type(other))),
    }
}

/// Moves a ciphertext from one key to another without exposing the value
/// outside this call.
pub fn reencrypt_field(value: &Value, old: &KeyHandle, new: &KeyHandle) -> CryptoResult<Value> {
    let cleartext = decrypt_field(value, old)?;
    encrypt_field(&cleartext, new)
}

/// RSA-OAEP encrypts arbitrary-length input by splitting it into chunks that
/// fit one block each. Output is the concatenation of the block ciphertexts.
pub fn encrypt_bytes(plaintext: &[u8], public: &RsaPublicKey) -> CryptoResult<Vec<u8>> {
    let block = public.size();
    let chunk_len = block
        .checked_sub(OAEP_SHA256_OVERHEAD)
        .filter(|len| *len > 0)
        .ok_or_else(|| {
            CryptoError::InvalidKey(format!("{}-bit key too small for OAEP", block * 8))
        })?;

    let mut out = Vec::with_capacity(plaintext.len().div_ceil(chunk_len).max(1) * block);
    // An empty input still produces one block so it round-trips.
    if plaintext.is_empty() {
        out.extend(oaep_encrypt(public, &[])?);
    }
    for chunk in plaintext.chunks(chunk_len) {
        out.extend(oaep_encrypt(public, chunk)?);
    }
    Ok(out)
}

pub fn decrypt_bytes(ciphertext: &[u8], key: &KeyHandle) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let block = key.block_size();
    if ciphertext.is_empty() || ciphertext.len() % block != 0 {
        return Err(CryptoError::Decryption(format!(
            "ciphertext length {} is not a multiple of the {block}-byte block",
            ciphertext.len()
        )));
    }
    let mut out = Zeroizing::new(Vec::with_capacity(ciphertext.len()));
    for chunk in ciphertext.chunks(block) {
        let plain = Zeroizing::new(
            key.private_key()
                .decrypt(Oaep::new::<Sha256>(), chunk)
                .map_err(|_| {
                    CryptoError::Decryption("wrong key or tampered ciphertext".to_string())
                })?,
        );
        out.extend_from_slice(&plain);
    }
    Ok(out)
}

fn oaep_encrypt(public: &RsaPublicKey, chunk: &[u8]) -> CryptoResult<Vec<u8>> {
    public
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), chunk)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
