//! Persistent word cache with negative entries / 词条缓存（含否定缓存）
//!
//! Records are whole JSON documents under `dict:<normalized headword>`.
//! Records are never evicted automatically; `clear` exists for operators.

use serde::Serialize;
use std::sync::Arc;

use crate::error::LookupError;
use crate::models::Resolution;
use crate::storage::{KvStore, DICT_KEY_PREFIX};

/// Parsed cache record together with its stored form
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub key: String,
    pub payload: Resolution,
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub negative_entries: usize,
    /// Total size of the stored records
    pub bytes: usize,
}

#[derive(Clone)]
pub struct WordCache {
    store: Arc<dyn KvStore>,
}

impl WordCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key_for(headword: &str) -> String {
        format!("{}{}", DICT_KEY_PREFIX, headword)
    }

    /// Read a record. Corrupted records are deleted and reported as a miss.
    pub async fn get(&self, headword: &str) -> Option<CacheRecord> {
        self.read(Self::key_for(headword)).await
    }

    async fn read(&self, key: String) -> Option<CacheRecord> {
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Word cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<Resolution>(&raw) {
            Ok(payload) => Some(CacheRecord { key, payload, raw }),
            Err(e) => {
                let err = LookupError::CacheCorruption { key: key.clone(), reason: e.to_string() };
                tracing::warn!("{}; dropping record", err);
                if let Err(e) = self.store.remove(&key).await {
                    tracing::warn!("Failed to delete corrupted record {}: {}", key, e);
                }
                None
            }
        }
    }

    /// Replace the record for `headword` / 写入缓存
    pub async fn put(&self, headword: &str, resolution: &Resolution) {
        let key = Self::key_for(headword);
        let raw = match serde_json::to_string(resolution) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to serialize cache record {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(&key, &raw).await {
            tracing::warn!("Word cache write failed for {}: {}", key, e);
        }
    }

    /// Drop the record for `headword`; returns whether one existed / 删除单条缓存
    pub async fn remove(&self, headword: &str) -> bool {
        let key = Self::key_for(headword);
        let existed = matches!(self.store.get(&key).await, Ok(Some(_)));
        if let Err(e) = self.store.remove(&key).await {
            tracing::warn!("Word cache delete failed for {}: {}", key, e);
            return false;
        }
        existed
    }

    pub async fn stats(&self) -> CacheStats {
        let keys = self.store.keys_with_prefix(DICT_KEY_PREFIX).await.unwrap_or_default();
        let mut stats = CacheStats::default();
        for key in keys {
            if let Some(record) = self.read(key).await {
                stats.entries += 1;
                stats.bytes += record.raw.len();
                if record.payload == Resolution::NotFound {
                    stats.negative_entries += 1;
                }
            }
        }
        stats
    }

    /// Remove every cached word; returns the number of removed records / 清空缓存
    pub async fn clear(&self) -> usize {
        let keys = match self.store.keys_with_prefix(DICT_KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Failed to list word cache keys: {}", e);
                return 0;
            }
        };
        let mut removed = 0;
        for key in keys {
            if self.store.remove(&key).await.is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResolvedWord, WordSource};
    use crate::storage::MemoryStore;

    fn word() -> ResolvedWord {
        ResolvedWord {
            headword: "猫".to_string(),
            readings: Vec::new(),
            senses: Vec::new(),
            is_common: true,
            levels: vec!["N5".to_string()],
            source: WordSource::CachedRemote,
            raw: Some(serde_json::json!({"slug": "猫"})),
        }
    }

    #[tokio::test]
    async fn test_positive_and_negative_records() {
        let cache = WordCache::new(Arc::new(MemoryStore::new()));
        assert!(cache.get("猫").await.is_none());

        cache.put("猫", &Resolution::Found { word: word() }).await;
        cache.put("zzz", &Resolution::NotFound).await;

        let found = cache.get("猫").await.unwrap();
        assert_eq!(found.key, "dict:猫");
        assert_eq!(found.payload.found().unwrap().headword, "猫");
        assert_eq!(cache.get("zzz").await.unwrap().payload, Resolution::NotFound);

        let stats = cache.stats().await;
        assert_eq!((stats.entries, stats.negative_entries), (2, 1));
        assert_eq!(stats.bytes, found.raw.len() + cache.get("zzz").await.unwrap().raw.len());

        assert!(cache.remove("zzz").await);
        assert!(!cache.remove("zzz").await);
        assert!(cache.get("zzz").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupted_record_is_deleted() {
        let store = Arc::new(MemoryStore::new());
        store.set("dict:猫", "{not json").await.unwrap();
        let cache = WordCache::new(store.clone());

        assert!(cache.get("猫").await.is_none());
        assert!(store.get("dict:猫").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_only_touches_dictionary_keys() {
        let store = Arc::new(MemoryStore::new());
        store.set("search:history", "[]").await.unwrap();
        let cache = WordCache::new(store.clone());
        cache.put("a", &Resolution::NotFound).await;
        cache.put("b", &Resolution::NotFound).await;

        store.set("dict:c", "garbage").await.unwrap();
        // corrupted records are dropped while counting
        assert_eq!(cache.stats().await.entries, 2);
        assert_eq!(store.len(), 3);

        assert_eq!(cache.clear().await, 2);
        assert_eq!(store.len(), 1);
    }
}
