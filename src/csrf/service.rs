//! Anti-forgery token issuance and one-time validation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::config::CsrfConfig;
use super::error::CsrfError;
use super::tokens::{now_millis, MemoryTokenStore, TokenRecord, TokenStats, TokenStore};

type HmacSha256 = Hmac<Sha256>;

/// Byte length of generated signing keys.
pub const SIGNING_KEY_BYTES: usize = 32;

/// What the client receives for a freshly issued token.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    /// Goes into the cookie.
    pub token_id: String,
    /// Goes into the form field or header.
    pub token: String,
    /// Expiry as epoch milliseconds.
    pub expires: i64,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token_id", &self.token_id)
            .field("token", &"***")
            .field("expires", &self.expires)
            .finish()
    }
}

/// Issues anti-forgery tokens bound to a server-held key and validates
/// client-submitted tokens exactly once within their validity window.
///
/// The record store is owned by the instance; two services never share
/// records unless they are given the same store.
pub struct CsrfTokenService<S: TokenStore = MemoryTokenStore> {
    config: CsrfConfig,
    /// HMAC already keyed with the signing key; cloned per computation.
    mac: HmacSha256,
    store: S,
}

impl CsrfTokenService<MemoryTokenStore> {
    /// Creates a service backed by a fresh in-memory store.
    pub fn new(config: CsrfConfig) -> Result<Self, CsrfError> {
        Self::with_store(config, MemoryTokenStore::new())
    }
}

impl<S: TokenStore> CsrfTokenService<S> {
    /// Creates a service over the given store.
    ///
    /// Without a configured signing key a random one is drawn, so tokens
    /// issued by this instance stop validating once the process exits.
    pub fn with_store(config: CsrfConfig, store: S) -> Result<Self, CsrfError> {
        config.validate()?;

        let key = match &config.signing_key {
            Some(key) => key.as_bytes().to_vec(),
            None => {
                tracing::warn!(
                    "No CSRF signing key configured, using a random per-process key"
                );
                random_bytes(SIGNING_KEY_BYTES)?
            }
        };
        let mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| CsrfError::InvalidConfig(e.to_string()))?;

        Ok(Self { config, mac, store })
    }

    /// Issues a new token and stores its record.
    pub fn generate_token(&self) -> Result<IssuedToken, CsrfError> {
        let length = self.config.token_byte_length;
        let token_id = URL_SAFE_NO_PAD.encode(random_bytes(length)?);
        let secret = URL_SAFE_NO_PAD.encode(random_bytes(length)?);

        let window = i64::try_from(self.config.token_expiration_ms).map_err(|_| {
            CsrfError::InvalidConfig("token_expiration_ms out of range".to_string())
        })?;
        let now = now_millis();
        let expires = now.saturating_add(window);
        let token = self.sign(&token_id, &secret);

        self.store.put(TokenRecord {
            token_id: token_id.clone(),
            secret,
            expires,
            created_at: now,
        });
        tracing::debug!(token_id = %token_id, expires, "Issued CSRF token");

        Ok(IssuedToken {
            token_id,
            token,
            expires,
        })
    }

    /// Validates a submitted token against the record for `token_id`.
    ///
    /// Returns `true` at most once per issued token. Expired records are
    /// removed on access; a mismatching token leaves the record in place.
    pub fn validate_token(&self, token_id: &str, supplied: &str) -> bool {
        if token_id.is_empty() || supplied.is_empty() {
            return false;
        }

        let now = now_millis();
        let Some(record) = self.store.get(token_id) else {
            tracing::debug!(token_id = %token_id, "Unknown CSRF token id");
            return false;
        };

        if record.is_expired(now) {
            self.store.delete(token_id);
            tracing::debug!(token_id = %token_id, "Expired CSRF token removed");
            return false;
        }

        let consumed = self.store.take_if(token_id, &|record| {
            !record.is_expired(now) && self.matches(record, supplied)
        });

        match consumed {
            Some(_) => {
                tracing::debug!(token_id = %token_id, "CSRF token consumed");
                true
            }
            None => {
                tracing::debug!(token_id = %token_id, "CSRF token mismatch");
                false
            }
        }
    }

    /// Removes every expired record. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let removed = self.store.sweep_expired(now_millis());
        if removed > 0 {
            tracing::debug!(removed, "Removed expired CSRF tokens");
        }
        removed
    }

    pub fn get_stats(&self) -> TokenStats {
        self.store.stats()
    }

    pub fn get_config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Hex HMAC-SHA256 over `token_id || secret`.
    fn sign(&self, token_id: &str, secret: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token_id.as_bytes());
        mac.update(secret.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn matches(&self, record: &TokenRecord, supplied: &str) -> bool {
        let expected = self.sign(&record.token_id, &record.secret);
        expected.as_bytes().ct_eq(supplied.as_bytes()).into()
    }
}

/// Generates a hex-encoded signing key suitable for configuration.
pub fn generate_signing_key() -> Result<String, CsrfError> {
    Ok(hex::encode(random_bytes(SIGNING_KEY_BYTES)?))
}

fn random_bytes(length: usize) -> Result<Vec<u8>, CsrfError> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CsrfError::Generation(e.to_string()))?;
    Ok(bytes)
}
