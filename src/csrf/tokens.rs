//! Token record storage.
//!
//! Records live in memory and expire after the configured window.
//! They are single-use - removed after a successful validation.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A stored anti-forgery token record.
///
/// The client-facing token is not kept here; it is derived from
/// `token_id` and `secret` whenever it is needed.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Lookup key, also the cookie value.
    pub token_id: String,
    /// Server-side random value mixed into the HMAC.
    pub secret: String,
    /// Expiry as epoch milliseconds.
    pub expires: i64,
    /// Issuance as epoch milliseconds.
    pub created_at: i64,
}

impl TokenRecord {
    /// A record is expired once `now` has moved past `expires`.
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires
    }
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("token_id", &self.token_id)
            .field("secret", &"***")
            .field("expires", &self.expires)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Snapshot of the store contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    /// Number of records currently stored.
    pub active_tokens: usize,
    /// `created_at` of the oldest stored record.
    pub oldest_token: Option<i64>,
}

/// Storage capability behind [`CsrfTokenService`](super::CsrfTokenService).
///
/// Implementations must make every method atomic with respect to the others.
/// `take_if` in particular is the only way a record is consumed, so at most
/// one caller can ever receive a given record from it.
pub trait TokenStore: Send + Sync {
    /// Inserts a record, replacing any record with the same id.
    fn put(&self, record: TokenRecord);

    /// Returns a copy of the record for `token_id`.
    fn get(&self, token_id: &str) -> Option<TokenRecord>;

    /// Removes the record for `token_id`. Returns whether one was present.
    fn delete(&self, token_id: &str) -> bool;

    /// Removes and returns the record for `token_id` if `predicate` accepts it.
    fn take_if(
        &self,
        token_id: &str,
        predicate: &dyn Fn(&TokenRecord) -> bool,
    ) -> Option<TokenRecord>;

    /// Removes every record expired at `now`. Returns the number removed.
    fn sweep_expired(&self, now: i64) -> usize;

    /// Returns the current record count and oldest issuance time.
    fn stats(&self) -> TokenStats;
}

/// In-memory token store.
///
/// Thread-safe via internal RwLock. Records are not shared across
/// processes, so tokens only validate on the instance that issued them.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    /// Records indexed by token id.
    records: RwLock<HashMap<String, TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenStore for MemoryTokenStore {
    fn put(&self, record: TokenRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.token_id.clone(), record);
    }

    fn get(&self, token_id: &str) -> Option<TokenRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(token_id).cloned()
    }

    fn delete(&self, token_id: &str) -> bool {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.remove(token_id).is_some()
    }

    fn take_if(
        &self,
        token_id: &str,
        predicate: &dyn Fn(&TokenRecord) -> bool,
    ) -> Option<TokenRecord> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if predicate(records.get(token_id)?) {
            records.remove(token_id)
        } else {
            None
        }
    }

    fn sweep_expired(&self, now: i64) -> usize {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        let after = records.len();

        before - after
    }

    fn stats(&self) -> TokenStats {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        TokenStats {
            active_tokens: records.len(),
            oldest_token: records.values().map(|r| r.created_at).min(),
        }
    }
}
