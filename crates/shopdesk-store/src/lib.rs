// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store backends for Shopdesk.
//!
//! Rate-limit counters, cached responses and usage analytics all live behind
//! [`shopdesk_core::KeyValueStore`]. Redis is the production backend; the
//! in-memory store serves single-node setups and tests.

pub mod memory;
pub mod redis_store;

use std::sync::Arc;

use shopdesk_config::model::{StoreBackend, StoreConfig};
use shopdesk_core::{KeyValueStore, ShopdeskError};

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Builds the backend selected in `[store]`.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, ShopdeskError> {
    match config.backend {
        StoreBackend::Redis => Ok(Arc::new(RedisStore::new(
            &config.redis_url,
            config.transaction_retries,
        )?)),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use shopdesk_core::PluginAdapter;

    use super::*;

    #[test]
    fn memory_backend_is_selectable() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn redis_backend_is_lazy() {
        let store = open_store(&StoreConfig::default()).unwrap();
        assert_eq!(store.name(), "redis");
    }
}
