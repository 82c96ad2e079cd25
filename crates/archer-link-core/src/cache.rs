//! # Change-Aware Cache
//!
//! A key/timeout store over any `KeyValueStore`.
//!
//! Each entry records the time it was written (`last_update`) next to an
//! opaque serialized payload. On `load`, the entry is trusted only while
//! `reference_time - last_update <= timeout`.
//!
//! ## Two Modes
//!
//! - **TTL**: omit the reference time. The current wall clock is used on
//!   both write and load, giving ordinary time-to-live semantics.
//! - **Change detection**: pass the upstream resource's last-modified time
//!   on both write and load. The entry then stays valid as long as the
//!   resource has not changed by more than `timeout`, no matter how much
//!   real time has passed.
//!
//! A timeout of zero makes every load a miss; callers use it to force a
//! refresh.

use crate::storage::KeyValueStore;
use crate::{ArcherError, ContentId};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The persisted form of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Reference time the payload was written with (ISO-8601, UTC).
    pub last_update: DateTime<Utc>,
    /// Serialized payload (JSON text).
    pub payload: String,
}

/// A cache slot for one `(logical name, record)` pair.
pub struct ChangeAwareCache<'a> {
    store: &'a dyn KeyValueStore,
    key: String,
    timeout_secs: u64,
    /// `last_update` of the entry this instance last read or wrote.
    observed: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for ChangeAwareCache<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeAwareCache")
            .field("key", &self.key)
            .field("timeout_secs", &self.timeout_secs)
            .field("observed", &self.observed)
            .finish_non_exhaustive()
    }
}

impl<'a> ChangeAwareCache<'a> {
    /// Create a cache slot named `<name>-<record_id>`.
    ///
    /// `timeout_secs == 0` disables caching: every `load` misses.
    pub fn new(
        store: &'a dyn KeyValueStore,
        name: &str,
        record_id: ContentId,
        timeout_secs: u64,
    ) -> Self {
        Self {
            store,
            key: format!("{name}-{record_id}"),
            timeout_secs,
            observed: None,
        }
    }

    /// Storage key of this slot.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Configured timeout in seconds.
    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// `last_update` of the most recently observed entry.
    #[must_use]
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.observed
    }

    /// True if this instance has not yet seen an entry for its key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observed.is_none()
    }

    /// Load the payload if an entry exists and is still valid at
    /// `reference_time` (defaults to now).
    ///
    /// Returns `Ok(None)` for a missing or expired entry. With timeout 0 the
    /// store is not read at all. A stored entry that cannot be decoded is
    /// an error.
    pub fn load<T: DeserializeOwned>(
        &mut self,
        reference_time: Option<DateTime<Utc>>,
    ) -> Result<Option<T>, ArcherError> {
        if self.timeout_secs == 0 {
            return Ok(None);
        }

        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };

        let entry: CacheEntry = serde_json::from_str(&raw).map_err(|e| {
            ArcherError::Serialization(format!("cache entry '{}': {e}", self.key))
        })?;
        self.observed = Some(entry.last_update);

        let reference = reference_time.unwrap_or_else(Utc::now);
        if !self.is_valid_at(entry.last_update, reference) {
            return Ok(None);
        }

        let payload = serde_json::from_str(&entry.payload).map_err(|e| {
            ArcherError::Serialization(format!("cache payload '{}': {e}", self.key))
        })?;
        Ok(Some(payload))
    }

    /// Persist `payload` tagged with `reference_time` (defaults to now),
    /// overwriting any existing entry.
    pub fn write<T: Serialize>(
        &mut self,
        payload: &T,
        reference_time: Option<DateTime<Utc>>,
    ) -> Result<(), ArcherError> {
        let entry = CacheEntry {
            last_update: reference_time.unwrap_or_else(Utc::now),
            payload: serde_json::to_string(payload)
                .map_err(|e| ArcherError::Serialization(e.to_string()))?,
        };
        let raw =
            serde_json::to_string(&entry).map_err(|e| ArcherError::Serialization(e.to_string()))?;

        self.store.set(&self.key, &raw)?;
        self.observed = Some(entry.last_update);
        Ok(())
    }

    fn is_valid_at(&self, last_update: DateTime<Utc>, reference: DateTime<Utc>) -> bool {
        let elapsed_ms = reference.signed_duration_since(last_update).num_milliseconds();
        let timeout_ms = i64::try_from(self.timeout_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        elapsed_ms <= timeout_ms
    }
}

// =============================================================================
// TESTS
// =============================================================================
