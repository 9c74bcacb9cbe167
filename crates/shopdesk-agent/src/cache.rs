// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort cache of finished pipeline results.
//!
//! A store failure is never an error here: reads degrade to a miss and
//! writes to a no-op.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use shopdesk_config::model::CacheConfig;
use shopdesk_core::{KeyValueStore, PipelineResult, RequestContext};
use tracing::{debug, warn};

const KEY_PREFIX: &str = "chat_cache:";

pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
    enabled: bool,
    ttl: Duration,
    op_timeout: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            enabled: config.enabled,
            ttl: Duration::from_secs(config.ttl_secs),
            op_timeout: Duration::from_millis(config.op_timeout_ms),
        }
    }

    /// Cache key for `query` as seen by a caller with the context's permissions.
    ///
    /// Case and surrounding whitespace do not matter; the permission set does.
    pub fn generate_key(query: &str, ctx: &RequestContext) -> String {
        let permissions: Vec<&str> = ctx.permissions().iter().map(String::as_str).collect();
        let material = format!("{}:{}", query.trim().to_lowercase(), permissions.join(":"));
        let digest = Sha256::digest(material.as_bytes());
        format!("{KEY_PREFIX}{}", hex::encode(digest))
    }

    pub async fn get(&self, key: &str) -> Option<PipelineResult> {
        if !self.enabled {
            return None;
        }
        let raw = match tokio::time::timeout(self.op_timeout, self.store.get(key)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => {
                debug!(key, "cache miss");
                return None;
            }
            Ok(Err(e)) => {
                warn!(key, error = %e, "cache read failed");
                return None;
            }
            Err(_) => {
                warn!(key, "cache read timed out");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(result) => {
                debug!(key, "cache hit");
                Some(result)
            }
            Err(e) => {
                warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, result: &PipelineResult) {
        if !self.enabled {
            return;
        }
        let encoded = match serde_json::to_string(result) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key, error = %e, "failed to encode result for cache");
                return;
            }
        };
        match tokio::time::timeout(self.op_timeout, self.store.set(key, &encoded, self.ttl)).await {
            Ok(Ok(())) => debug!(key, ttl_secs = self.ttl.as_secs(), "cached response"),
            Ok(Err(e)) => warn!(key, error = %e, "cache write failed"),
            Err(_) => warn!(key, "cache write timed out"),
        }
    }

    pub async fn delete(&self, key: &str) {
        let keys = [key.to_string()];
        match tokio::time::timeout(self.op_timeout, self.store.delete(&keys)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key, error = %e, "cache delete failed"),
            Err(_) => warn!(key, "cache delete timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shopdesk_core::Intent;
    use shopdesk_store::MemoryStore;

    use super::*;

    fn cache(store: Arc<MemoryStore>) -> ResponseCache {
        ResponseCache::new(store, &CacheConfig::default())
    }

    fn ctx(perms: &[&str]) -> RequestContext {
        RequestContext::new("u1", "s1").with_permissions(perms.iter().copied())
    }

    #[test]
    fn key_ignores_case_and_whitespace() {
        let a = ResponseCache::generate_key("Sales This Week", &ctx(&["read"]));
        let b = ResponseCache::generate_key("  sales this week \n", &ctx(&["read"]));
        assert_eq!(a, b);
        assert!(a.starts_with("chat_cache:"));
        assert_eq!(a.len(), KEY_PREFIX.len() + 64);
    }

    #[test]
    fn key_depends_on_permission_set_not_order() {
        let q = "inventory";
        assert_ne!(
            ResponseCache::generate_key(q, &ctx(&["read"])),
            ResponseCache::generate_key(q, &ctx(&["read", "admin"]))
        );
        assert_eq!(
            ResponseCache::generate_key(q, &ctx(&["b", "a"])),
            ResponseCache::generate_key(q, &ctx(&["a", "b"]))
        );
    }

    proptest! {
        #[test]
        fn key_is_stable_under_case_and_padding(q in "[a-zA-Z0-9 ]{1,40}", pad in 0usize..4) {
            let padded = format!("{}{}{}", " ".repeat(pad), q.to_uppercase(), "\t".repeat(pad));
            prop_assert_eq!(
                ResponseCache::generate_key(&q, &ctx(&["read"])),
                ResponseCache::generate_key(&padded, &ctx(&["read"]))
            );
        }
    }

    #[tokio::test]
    async fn round_trips_results() {
        let c = cache(Arc::new(MemoryStore::new()));
        let result = PipelineResult::new(
            "q",
            Intent::SalesData,
            "narrative",
            serde_json::json!({"narrative": "narrative"}),
            "s1",
        )
        .with_confidence(0.8);
        c.set("k", &result).await;
        assert_eq!(c.get("k").await, Some(result));
        c.delete("k").await;
        assert_eq!(c.get("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let c = ResponseCache::new(
            Arc::new(MemoryStore::new()),
            &CacheConfig {
                ttl_secs: 10,
                ..CacheConfig::default()
            },
        );
        let result = PipelineResult::failed("q", "s", "x");
        c.set("k", &result).await;
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(c.get("k").await.is_none());
    }

    #[tokio::test]
    async fn undecodable_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        store.set("k", "not json", Duration::from_secs(60)).await.unwrap();
        assert!(cache(store).get("k").await.is_none());
    }

    #[tokio::test]
    async fn disabled_cache_never_hits() {
        let store = Arc::new(MemoryStore::new());
        let c = ResponseCache::new(
            store.clone(),
            &CacheConfig {
                enabled: false,
                ..CacheConfig::default()
            },
        );
        c.set("k", &PipelineResult::failed("q", "s", "x")).await;
        assert!(store.is_empty());
        assert!(c.get("k").await.is_none());
    }
}
