use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::store::{KvStore, StoreError};

use super::fix::Fix;

/// Most recent fixes kept in the trail; older entries are evicted.
pub const TRAIL_CAPACITY: usize = 120;

/// Storage key for the serialized trail. Versioned so a future layout
/// change can coexist with old data.
pub const TRAIL_KEY: &str = "fixtrail.trail.v1";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("location store unavailable")]
    Unavailable,
    #[error("malformed trail data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Consumer-facing degradation notice. Malformed stored data never appears
/// here: it recovers silently to an empty trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Advisory {
    StoreUnavailable,
    CacheWriteFailed,
    Source(String),
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::StoreUnavailable => write!(f, "location store unavailable"),
            Advisory::CacheWriteFailed => write!(f, "failed to cache fix"),
            Advisory::Source(msg) => write!(f, "{}", msg),
        }
    }
}

/// Bounded, newest-first trail of fixes persisted as one JSON blob under
/// [`TRAIL_KEY`].
///
/// The store handle is resolved once at construction; `None` models a
/// runtime without durable storage, and every operation then degrades to
/// its documented empty result instead of failing the caller.
pub struct TrailCache {
    store: Option<Arc<dyn KvStore>>,
}

impl TrailCache {
    pub fn new(store: Option<Arc<dyn KvStore>>) -> Self {
        TrailCache { store }
    }

    /// Availability gate: does this runtime have a store at all?
    /// Synchronous, no I/O, safe to call on every tick.
    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    /// Current trail, newest first. Degrades to empty on any failure.
    pub async fn read(&self) -> Vec<Fix> {
        match self.try_read().await {
            Ok(trail) => trail,
            Err(e) => {
                log::warn!("trail read degraded to empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Prepend `fix`, evict past capacity, persist, and return the new
    /// trail. Degrades to empty ("not cached") on any failure.
    pub async fn append(&self, fix: Fix) -> Vec<Fix> {
        match self.try_append(fix).await {
            Ok(trail) => trail,
            Err(e) => {
                log::warn!("fix not cached: {}", e);
                Vec::new()
            }
        }
    }

    /// Fallible read, exposing which failure occurred. A malformed blob is
    /// reported as [`CacheError::Malformed`]; callers that want the
    /// original silent recovery use [`read`](Self::read).
    pub async fn try_read(&self) -> Result<Vec<Fix>, CacheError> {
        let store = self.store.as_ref().ok_or(CacheError::Unavailable)?;
        match store.get(TRAIL_KEY).await? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(Vec::new()),
        }
    }

    /// Fallible append. A malformed stored blob is treated as an empty
    /// base and replaced by this write; a failed `get` aborts without
    /// writing, so a trail that could not be read is never clobbered.
    ///
    /// The read-modify-write is not atomic against other writers on the
    /// same key; with concurrent appenders the later write wins.
    pub async fn try_append(&self, fix: Fix) -> Result<Vec<Fix>, CacheError> {
        let store = self.store.as_ref().ok_or(CacheError::Unavailable)?;

        let mut trail = match store.get(TRAIL_KEY).await? {
            Some(blob) => match serde_json::from_str::<Vec<Fix>>(&blob) {
                Ok(trail) => trail,
                Err(e) => {
                    log::warn!("replacing malformed trail data: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        trail.insert(0, fix);
        trail.truncate(TRAIL_CAPACITY);

        let blob = serde_json::to_string(&trail)?;
        store.set(TRAIL_KEY, &blob).await?;
        Ok(trail)
    }
}
