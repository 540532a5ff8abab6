//! In-process implementation of the shared store.
//!
//! Useful for tests and single-process demos where a Redis server is not
//! available. TTL semantics follow the injected clock, so tests can drive
//! expiry deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::limit::Clock;

use super::shared::{KeyTtl, SharedStore};

struct Record {
    /// Epoch second after which the whole field map is gone
    expires_at: Option<i64>,
    fields: HashMap<String, String>,
}

/// Shared store held in process memory behind a mutex.
///
/// The mutex makes `admit_and_record` atomic, matching the transactional
/// script the Redis implementation uses.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<String, Record>>,
}

impl MemoryStore {
    /// Create a new store driven by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the record for `key` if its expiry has elapsed.
    fn evict_if_expired(records: &mut HashMap<String, Record>, key: &str, now: i64) {
        let expired = records
            .get(key)
            .and_then(|r| r.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            records.remove(key);
        }
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let now = self.clock.now();
        let mut records = self.records.lock().unwrap();
        Self::evict_if_expired(&mut records, key, now);

        let ttl = match records.get(key) {
            None => KeyTtl::Missing,
            Some(record) => match record.expires_at {
                None => KeyTtl::Persistent,
                Some(at) => KeyTtl::Expires(Duration::from_secs((at - now).max(0) as u64)),
            },
        };
        Ok(ttl)
    }

    async fn get_all_fields(&self, key: &str) -> Result<HashMap<String, String>> {
        let now = self.clock.now();
        let mut records = self.records.lock().unwrap();
        Self::evict_if_expired(&mut records, key, now);

        Ok(records
            .get(key)
            .map(|r| r.fields.clone())
            .unwrap_or_default())
    }

    async fn set_field(
        &self,
        key: &str,
        field: &str,
        value: &str,
        expiry: Option<Duration>,
    ) -> Result<()> {
        let now = self.clock.now();
        let mut records = self.records.lock().unwrap();
        Self::evict_if_expired(&mut records, key, now);

        let record = records.entry(key.to_string()).or_insert_with(|| Record {
            expires_at: None,
            fields: HashMap::new(),
        });
        record.fields.insert(field.to_string(), value.to_string());
        if let Some(expiry) = expiry {
            record.expires_at = Some(now + expiry.as_secs() as i64);
        }
        Ok(())
    }

    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<()> {
        let now = self.clock.now();
        let mut records = self.records.lock().unwrap();
        Self::evict_if_expired(&mut records, key, now);

        if let Some(record) = records.get_mut(key) {
            for field in fields {
                record.fields.remove(field);
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn admit_and_record(
        &self,
        key: &str,
        field: &str,
        now: i64,
        limit: u64,
        frequency_secs: u64,
    ) -> Result<bool> {
        let mut records = self.records.lock().unwrap();
        Self::evict_if_expired(&mut records, key, now);

        let record = records.entry(key.to_string()).or_insert_with(|| Record {
            expires_at: None,
            fields: HashMap::new(),
        });

        let frequency = frequency_secs as i64;
        record.fields.retain(|_, value| {
            value
                .parse::<i64>()
                .is_ok_and(|ts| ts + frequency >= now)
        });

        if record.fields.len() as u64 >= limit {
            return Ok(false);
        }

        record.fields.insert(field.to_string(), now.to_string());
        record.expires_at = Some(now + frequency);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limit::ManualClock;

    fn store_with_clock() -> (Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::new(0));
        let store = MemoryStore::new(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_ttl_reports_missing_key() {
        let (_, store) = store_with_clock();
        assert_eq!(store.ttl("nobody").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    async fn test_set_field_without_expiry_is_persistent() {
        let (_, store) = store_with_clock();
        store.set_field("k", "f", "0", None).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Persistent);
    }

    #[tokio::test]
    async fn test_expiry_removes_whole_field_map() {
        let (clock, store) = store_with_clock();
        store
            .set_field("k", "f", "0", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(
            store.ttl("k").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(60))
        );

        clock.advance(61);
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Missing);
        assert!(store.get_all_fields("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_fields_ignores_missing() {
        let (_, store) = store_with_clock();
        store.set_field("k", "a", "0", None).await.unwrap();
        store
            .delete_fields("k", &["a".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert!(store.get_all_fields("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admit_and_record_enforces_limit() {
        let (_, store) = store_with_clock();
        for _ in 0..3 {
            assert!(store.admit_and_record("k", &uuid(), 0, 3, 60).await.unwrap());
        }
        assert!(!store.admit_and_record("k", &uuid(), 0, 3, 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_admit_and_record_purges_stale_events() {
        let (_, store) = store_with_clock();
        assert!(store.admit_and_record("k", "old", 0, 2, 60).await.unwrap());
        assert!(store.admit_and_record("k", "mid", 30, 2, 60).await.unwrap());
        // 61 seconds in, "old" is out of the window but the key is still live
        assert!(store.admit_and_record("k", "new", 61, 2, 60).await.unwrap());

        let fields = store.get_all_fields("k").await.unwrap();
        assert!(!fields.contains_key("old"));
        assert!(fields.contains_key("mid"));
        assert!(fields.contains_key("new"));
    }

    fn uuid() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
