//! Loads a local certificate file and re-exports it as PKCS#12, the only
//! format the certificate endpoint accepts.

use crate::error::{CloudError, CloudResult};
use p12_keystore::{Certificate as X509Certificate, KeyStore, KeyStoreEntry};
use std::io::BufReader;
use tracing::debug;

const PEM_PREFIX: &[u8] = b"-----BEGIN";

/// Re-exports certificate file contents as a PKCS#12 blob sealed with
/// `password` (empty when there is none).
///
/// Accepts a PKCS#12 file that `password` opens, PEM certificates, or a
/// single DER certificate. Anything else, including a PKCS#12 file with the
/// wrong password, is [`CloudError::Certificate`].
pub fn export_pkcs12(name: &str, contents: &[u8], password: Option<&str>) -> CloudResult<Vec<u8>> {
    let password = password.unwrap_or("");
    let keystore = match KeyStore::from_pkcs12(contents, password) {
        Ok(keystore) => keystore,
        Err(pkcs12_err) => load_x509(contents).map_err(|x509_err| {
            CloudError::Certificate(format!(
                "{name}: not a PKCS#12 file this password opens ({pkcs12_err}) \
                 and not an X.509 certificate ({x509_err})"
            ))
        })?,
    };
    if keystore.entries().next().is_none() {
        return Err(CloudError::Certificate(format!("{name}: file holds no certificates")));
    }

    let blob = keystore
        .writer(password)
        .write()
        .map_err(|e| CloudError::Certificate(format!("{name}: PKCS#12 export failed: {e}")))?;
    debug!("{name}: exported {} bytes of PKCS#12", blob.len());
    Ok(blob)
}

fn load_x509(contents: &[u8]) -> Result<KeyStore, String> {
    let ders = if contents.trim_ascii_start().starts_with(PEM_PREFIX) {
        rustls_pemfile::certs(&mut BufReader::new(contents))
            .map(|cert| cert.map(|der| der.to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?
    } else {
        vec![contents.to_vec()]
    };
    if ders.is_empty() {
        return Err("no CERTIFICATE block".to_string());
    }

    let mut keystore = KeyStore::new();
    for (i, der) in ders.iter().enumerate() {
        let cert = X509Certificate::from_der(der).map_err(|e| e.to_string())?;
        keystore.add_entry(&format!("certificate-{i}"), KeyStoreEntry::Certificate(cert));
    }
    Ok(keystore)
}
