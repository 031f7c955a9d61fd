use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use chrono::{DateTime, Duration, Utc};
use error_stack::{report, ResultExt};
use ring::{
    rand::SystemRandom,
    signature::{KeyPair, RsaKeyPair, RSA_PKCS1_SHA256},
};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{
    der,
    errors::SnowflakeError,
    key_material::{KeyLoadError, PrivateKeyMaterial},
};

const JWT_LIFETIME_MINUTES: i64 = 60;

#[derive(Serialize)]
struct JwtHeader {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    iat: i64,
    exp: i64,
}

/// Issues the RS256 tokens Snowflake accepts for key-pair authentication.
pub struct KeyPairJwt {
    issuer: String,
    subject: String,
    key_pair: RsaKeyPair,
}

impl std::fmt::Debug for KeyPairJwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairJwt")
            .field("issuer", &self.issuer)
            .field("subject", &self.subject)
            .finish()
    }
}

impl KeyPairJwt {
    pub fn new(
        account: &str,
        user: &str,
        key_material: &PrivateKeyMaterial,
    ) -> error_stack::Result<Self, KeyLoadError> {
        let key_pair = key_material.key_pair()?;
        let subject = format!("{}.{}", account_identifier(account), user.to_ascii_uppercase());
        let issuer = format!("{}.{}", subject, public_key_fingerprint(&key_pair));

        Ok(Self {
            issuer,
            subject,
            key_pair,
        })
    }

    /// Signs a token valid from `now` for one hour.
    pub fn issue(&self, now: DateTime<Utc>) -> error_stack::Result<String, SnowflakeError> {
        let header = JwtHeader {
            alg: "RS256",
            typ: "JWT",
        };
        let claims = JwtClaims {
            iss: &self.issuer,
            sub: &self.subject,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(JWT_LIFETIME_MINUTES)).timestamp(),
        };

        let header_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&header).change_context(SnowflakeError::JwtSigning)?,
        );
        let claims_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims).change_context(SnowflakeError::JwtSigning)?,
        );
        let signing_input = format!("{}.{}", header_b64, claims_b64);

        let mut signature = vec![0; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| report!(SnowflakeError::JwtSigning))?;

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(&signature)))
    }
}

/// Upper-cased account name, without any region or cloud suffix.
///
/// ```
/// use snowflake_to_sheets::adapters::snowflake::jwt::account_identifier;
/// assert_eq!(account_identifier("xy12345.us-east-1"), "XY12345");
/// assert_eq!(account_identifier("myorg-account1"), "MYORG-ACCOUNT1");
/// ```
pub fn account_identifier(account: &str) -> String {
    account
        .split('.')
        .next()
        .unwrap_or(account)
        .to_ascii_uppercase()
}

/// `SHA256:` followed by the base64 SHA-256 of the DER SubjectPublicKeyInfo.
pub fn public_key_fingerprint(key_pair: &RsaKeyPair) -> String {
    let spki = der::rsa_public_key_to_spki(key_pair.public_key().as_ref());
    format!("SHA256:{}", STANDARD.encode(Sha256::digest(spki)))
}
