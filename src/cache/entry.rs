// Cache entry envelope.
// Pairs a payload with its absolute expiry instant.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper stored in the backend for every cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached data.
    pub data: T,
    /// When the entry stops being valid, stored as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expiry: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Create an entry that expires `ttl` from now.
    pub fn new(data: T, ttl: Duration) -> Self {
        Self::with_expiry(data, expiry_after(Utc::now(), ttl))
    }

    pub fn with_expiry(data: T, expiry: DateTime<Utc>) -> Self {
        Self { data, expiry }
    }

    /// An entry is valid strictly before its expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_expired(&self) -> bool {
        !self.is_valid()
    }
}

/// Saturating `now + ttl`; a TTL too large to represent never expires in practice.
fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
