//! Shared-store capability trait consumed by the limiter.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Remaining time-to-live of a store key.
///
/// Redis reports TTL as `-2` for a missing key and `-1` for a key without an
/// expiry; this enum makes those sentinels explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist
    Missing,
    /// The key exists but has no expiry set
    Persistent,
    /// The key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Decode a raw TTL reply (in seconds) into a [`KeyTtl`].
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            -2 => KeyTtl::Missing,
            -1 => KeyTtl::Persistent,
            s => KeyTtl::Expires(Duration::from_secs(s.max(0) as u64)),
        }
    }
}

/// Capability interface over the shared key-value store.
///
/// One subject maps to one key holding a field map of event-id to admission
/// timestamp. Implementations must be safe for concurrent use; the limiter
/// holds a single handle shared across callers.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Remaining time-to-live of `key`.
    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    /// All current field/value pairs for `key`.
    async fn get_all_fields(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Upsert one field; if `expiry` is given, (re)set the whole key's TTL.
    async fn set_field(
        &self,
        key: &str,
        field: &str,
        value: &str,
        expiry: Option<Duration>,
    ) -> Result<()>;

    /// Remove the given fields from `key`; no-op on missing fields.
    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<()>;

    /// Liveness check of the store connection.
    async fn ping(&self) -> Result<()>;

    /// Atomically purge stale events, count the live ones, and record a new
    /// event under `field` iff the live count is below `limit`.
    ///
    /// An event is stale once its timestamp is more than `frequency_secs`
    /// seconds behind `now`. On an admitted write the key's TTL is refreshed
    /// to `frequency_secs`. Returns whether the event was admitted.
    ///
    /// Check and record happen as one operation, so concurrent callers for
    /// the same key cannot overshoot the limit.
    async fn admit_and_record(
        &self,
        key: &str,
        field: &str,
        now: i64,
        limit: u64,
        frequency_secs: u64,
    ) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ttl_decodes_sentinels() {
        assert_eq!(KeyTtl::from_secs(-2), KeyTtl::Missing);
        assert_eq!(KeyTtl::from_secs(-1), KeyTtl::Persistent);
        assert_eq!(
            KeyTtl::from_secs(30),
            KeyTtl::Expires(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_key_ttl_zero_means_under_a_second() {
        // Redis rounds a sub-second remainder down to 0
        assert_eq!(
            KeyTtl::from_secs(0),
            KeyTtl::Expires(Duration::from_secs(0))
        );
    }
}
