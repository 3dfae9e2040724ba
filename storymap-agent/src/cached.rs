//! Best-effort JSON reads and writes against an optional [`Cache`].
//!
//! Failures never reach the caller: a failed or undecodable read is a miss,
//! a failed write is logged and dropped.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use storymap_core::Cache;
use storymap_telemetry::{debug, warn};

pub(crate) async fn read<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring undecodable cache entry");
                None
            }
        },
        Ok(None) => {
            debug!(key = %key, "Cache miss");
            None
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Cache read failed");
            None
        }
    }
}

pub(crate) async fn write<T: Serialize>(cache: &dyn Cache, key: &str, value: &T, ttl: Duration) {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key = %key, error = %e, "Could not encode cache entry");
            return;
        }
    };
    match cache.set_with_ttl(key, bytes, ttl).await {
        Ok(()) => debug!(key = %key, ttl_secs = ttl.as_secs(), "Cached result"),
        Err(e) => warn!(key = %key, error = %e, "Cache write failed"),
    }
}
