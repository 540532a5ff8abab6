//! Redis-backed implementation of the shared store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{FreqlimitError, Result};

use super::shared::{KeyTtl, SharedStore};

/// Purges stale events, counts live ones, and conditionally records the new
/// event with a refreshed key TTL, all in one round trip.
const ADMIT_AND_RECORD: &str = r#"
    local key = KEYS[1]
    local field = ARGV[1]
    local now = tonumber(ARGV[2])
    local limit = tonumber(ARGV[3])
    local frequency = tonumber(ARGV[4])

    local stale = {}
    local live = 0
    local items = redis.call("HGETALL", key)
    for i = 1, #items, 2 do
        local ts = tonumber(items[i + 1])
        if ts ~= nil and ts + frequency >= now then
            live = live + 1
        else
            stale[#stale + 1] = items[i]
        end
    end

    if #stale > 0 then
        redis.call("HDEL", key, unpack(stale))
    end

    if live >= limit then
        return 0
    end

    redis.call("HSET", key, field, tostring(now))
    redis.call("EXPIRE", key, frequency)
    return 1
"#;

/// Shared store backed by a Redis server.
///
/// Holds a single [`ConnectionManager`], which multiplexes commands from
/// concurrent callers over one connection and reconnects on failure. The
/// handle is constructed once at process start and passed into the limiter;
/// there is no process-wide singleton.
pub struct RedisStore {
    manager: ConnectionManager,
    admit_and_record: Script,
}

impl RedisStore {
    /// Connect to the store described by `config`.
    ///
    /// An invalid address is reported as a configuration error here rather
    /// than on first use.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let client = Client::open(config.url())
            .map_err(|e| FreqlimitError::Config(format!("invalid store address: {}", e)))?;
        let manager = client.get_connection_manager().await?;

        debug!(address = %config.address, db = config.db, "Connected to shared store");

        Ok(Self {
            manager,
            admit_and_record: Script::new(ADMIT_AND_RECORD),
        })
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut conn = self.manager.clone();
        let secs: i64 = conn.ttl(key).await?;
        Ok(KeyTtl::from_secs(secs))
    }

    async fn get_all_fields(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.manager.clone();
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn set_field(
        &self,
        key: &str,
        field: &str,
        value: &str,
        expiry: Option<Duration>,
    ) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.hset(key, field, value).await?;
        if let Some(expiry) = expiry {
            let _: () = conn.expire(key, expiry.as_secs() as i64).await?;
        }
        Ok(())
    }

    async fn delete_fields(&self, key: &str, fields: &[String]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        let _: () = conn.hdel(key, fields).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;
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
        let mut conn = self.manager.clone();
        let admitted: i64 = self
            .admit_and_record
            .key(key)
            .arg(field)
            .arg(now)
            .arg(limit)
            .arg(frequency_secs)
            .invoke_async(&mut conn)
            .await?;
        Ok(admitted == 1)
    }
}
