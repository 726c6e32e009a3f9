//! RSA key handles addressed by thumbprint.

use crate::error::{CryptoError, CryptoResult};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// Modulus size used for newly generated keys.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// An RSA key pair plus the thumbprint it is looked up by.
///
/// The private key zeroizes itself on drop.
#[derive(Clone)]
pub struct KeyHandle {
    thumbprint: String,
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyHandle {
    /// Generates a fresh key pair.
    pub fn generate(bits: usize) -> CryptoResult<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::InvalidKey(format!("key generation failed: {e}")))?;
        Self::from_private_key(private)
    }

    pub fn from_private_key(private: RsaPrivateKey) -> CryptoResult<Self> {
        let public = private.to_public_key();
        let thumbprint = thumbprint_of(&public)?;
        Ok(Self {
            thumbprint,
            private,
            public,
        })
    }

    /// Loads a PKCS#8 PEM-encoded private key.
    pub fn from_pkcs8_pem(pem: &str) -> CryptoResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| CryptoError::InvalidKey(format!("PKCS#8 decode failed: {e}")))?;
        Self::from_private_key(private)
    }

    pub fn to_pkcs8_pem(&self) -> CryptoResult<Zeroizing<String>> {
        self.private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(format!("PKCS#8 encode failed: {e}")))
    }

    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// Size of one RSA block (the modulus) in bytes.
    pub fn block_size(&self) -> usize {
        self.public.size()
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHandle")
            .field("thumbprint", &self.thumbprint)
            .field("bits", &(self.block_size() * 8))
            .finish_non_exhaustive()
    }
}

/// Uppercase hex SHA-256 of the DER-encoded public key.
pub fn thumbprint_of(public: &RsaPublicKey) -> CryptoResult<String> {
    let der = public
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKey(format!("public key encode failed: {e}")))?;
    Ok(hex::encode_upper(Sha256::digest(der.as_bytes())))
}
