//! Core sliding-window admission logic.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::PolicyConfig;
use crate::error::Result;
use crate::store::{KeyTtl, SharedStore};

use super::clock::{Clock, SystemClock};

/// Store keys are namespaced to keep subjects clear of other tenants.
const KEY_PREFIX: &str = "freqlimit";

/// Sliding-window frequency limiter over a shared store.
///
/// Each subject maps to one store key holding a field map of event-id to
/// admission timestamp. The limiter owns no cross-call state beyond the store
/// handle, so a single instance can be shared across tasks.
pub struct FrequencyLimiter<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    limit: u64,
    frequency_secs: u64,
}

impl<S: SharedStore> FrequencyLimiter<S> {
    /// Create a limiter using the system clock.
    pub fn new(store: Arc<S>, policy: &PolicyConfig) -> Self {
        Self::with_clock(store, policy, Arc::new(SystemClock))
    }

    /// Create a limiter with an injected clock.
    pub fn with_clock(store: Arc<S>, policy: &PolicyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            limit: policy.limit,
            frequency_secs: policy.frequency_secs,
        }
    }

    /// Check whether `subject` has room left in its current window.
    ///
    /// `now` is epoch seconds; `None` reads the limiter's clock. Stale event
    /// records found along the way are deleted even when the decision is a
    /// reject. Store failures propagate unchanged and void the decision.
    pub async fn check(&self, subject: &str, now: Option<i64>) -> Result<bool> {
        let now = now.unwrap_or_else(|| self.clock.now());
        let key = self.subject_key(subject);

        // Fast path: a missing key has no events, and a key within a second
        // of expiry is about to shed its whole window.
        match self.store.ttl(&key).await? {
            KeyTtl::Missing => {
                trace!(subject, "No recorded events, admitting");
                return Ok(true);
            }
            KeyTtl::Expires(remaining) if remaining < Duration::from_secs(1) => {
                trace!(subject, "Window about to expire, admitting");
                return Ok(true);
            }
            KeyTtl::Persistent | KeyTtl::Expires(_) => {}
        }

        let events = self.store.get_all_fields(&key).await?;

        let mut live: u64 = 0;
        let mut stale = Vec::new();
        for (id, value) in &events {
            // Malformed timestamps count as stale and get purged with them
            match value.parse::<i64>() {
                Ok(ts) if ts + self.frequency_secs as i64 >= now => live += 1,
                _ => stale.push(id.clone()),
            }
        }

        if !stale.is_empty() {
            trace!(subject, count = stale.len(), "Purging stale events");
            self.store.delete_fields(&key, &stale).await?;
        }

        let admitted = live < self.limit;
        if !admitted {
            debug!(subject, live, limit = self.limit, "Frequency limit reached");
        }
        Ok(admitted)
    }

    /// Decide admission for `subject` and, if admitted, record the action.
    ///
    /// Decision and write happen as one atomic store operation, so concurrent
    /// callers cannot drive the live count past the limit. A failed write
    /// surfaces as an error, never as an admission result.
    pub async fn incr_and_check(&self, subject: &str) -> Result<bool> {
        let now = self.clock.now();
        let key = self.subject_key(subject);
        let event_id = Uuid::new_v4().to_string();

        let admitted = self
            .store
            .admit_and_record(&key, &event_id, now, self.limit, self.frequency_secs)
            .await?;

        debug!(subject, admitted, "Recorded admission attempt");
        Ok(admitted)
    }

    fn subject_key(&self, subject: &str) -> String {
        format!("{}:{}", KEY_PREFIX, subject)
    }
}
