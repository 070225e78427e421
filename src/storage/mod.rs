//! Persistent key/value storage / 持久化键值存储
//!
//! Cache records and search history are stored as whole JSON documents under
//! namespaced keys. Every write replaces the full record, so concurrent writers
//! never need a read-modify-write cycle: last write wins.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::LookupResult;

/// Key prefix for word cache records / 词条缓存键前缀
pub const DICT_KEY_PREFIX: &str = "dict:";
/// Key holding the ordered search history / 搜索历史键
pub const HISTORY_KEY: &str = "search:history";

/// Key/value store contract / 键值存储接口
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> LookupResult<Option<String>>;

    /// Replace the whole record stored under `key`
    async fn set(&self, key: &str, value: &str) -> LookupResult<()>;

    async fn remove(&self, key: &str) -> LookupResult<()>;

    async fn keys_with_prefix(&self, prefix: &str) -> LookupResult<Vec<String>>;
}

/// In-memory store for tests and ephemeral sessions / 内存存储
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> LookupResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> LookupResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> LookupResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> LookupResult<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
