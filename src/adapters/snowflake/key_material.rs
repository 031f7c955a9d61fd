use std::{io::Cursor, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine};
use error_stack::{report, ResultExt};
use ring::signature::RsaKeyPair;
use rustls_pemfile::Item;
use thiserror::Error;
use tracing::instrument;

use super::der;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyLoadError {
    #[error("Failed to read private key file")]
    Io,
    #[error("Private key file is not valid PEM")]
    InvalidPem,
    #[error("No unencrypted private key found")]
    MissingPrivateKey,
    #[error("Private key is not a usable RSA key")]
    UnsupportedKey,
    #[error("Private key material is not valid base64")]
    InvalidEncoding,
}

/// Unencrypted PKCS#8 DER private key, base64 encoded (standard alphabet).
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKeyMaterial(String);

impl std::fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKeyMaterial(<redacted>)")
    }
}

impl PrivateKeyMaterial {
    pub fn to_pkcs8_der(&self) -> error_stack::Result<Vec<u8>, KeyLoadError> {
        STANDARD
            .decode(&self.0)
            .change_context(KeyLoadError::InvalidEncoding)
    }

    pub fn key_pair(&self) -> error_stack::Result<RsaKeyPair, KeyLoadError> {
        rsa_key_pair(&self.to_pkcs8_der()?)
    }
}

/// Reads an unencrypted PEM private key and re-encodes it as base64 PKCS#8 DER.
///
/// Both `PRIVATE KEY` (PKCS#8) and `RSA PRIVATE KEY` (PKCS#1) blocks are
/// accepted; the first private key block in the file is used.
#[instrument]
pub fn load_private_key_base64(path: &Path) -> error_stack::Result<PrivateKeyMaterial, KeyLoadError> {
    let result = std::fs::read(path)
        .change_context(KeyLoadError::Io)
        .attach_printable_lazy(|| format!("Private key file: {}", path.display()))
        .and_then(|pem| pkcs8_der_from_pem(&pem))
        .and_then(|der| {
            rsa_key_pair(&der)?;
            Ok(PrivateKeyMaterial(STANDARD.encode(der)))
        });

    match &result {
        Ok(_) => tracing::info!("Private key loaded successfully"),
        Err(report) => tracing::error!("Failed to load or convert private key: {:?}", report),
    }
    result
}

fn pkcs8_der_from_pem(pem: &[u8]) -> error_stack::Result<Vec<u8>, KeyLoadError> {
    let mut reader = Cursor::new(pem);
    for item in rustls_pemfile::read_all(&mut reader) {
        match item.change_context(KeyLoadError::InvalidPem)? {
            Item::Pkcs8Key(key) => return Ok(key.secret_pkcs8_der().to_vec()),
            Item::Pkcs1Key(key) => return Ok(der::pkcs1_to_pkcs8(key.secret_pkcs1_der())),
            Item::Sec1Key(_) => {
                return Err(report!(KeyLoadError::UnsupportedKey))
                    .attach_printable("EC keys cannot be used for key-pair authentication")
            }
            _ => continue,
        }
    }
    Err(report!(KeyLoadError::MissingPrivateKey))
}

fn rsa_key_pair(pkcs8_der: &[u8]) -> error_stack::Result<RsaKeyPair, KeyLoadError> {
    RsaKeyPair::from_pkcs8(pkcs8_der).map_err(|rejected| {
        report!(KeyLoadError::UnsupportedKey).attach_printable(format!("{:?}", rejected))
    })
}
