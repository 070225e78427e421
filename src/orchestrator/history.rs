//! Recent queries / 搜索历史
//!
//! Stored as one JSON list under `search:history`, most recent first.

use std::sync::Arc;

use crate::error::LookupResult;
use crate::storage::{KvStore, HISTORY_KEY};

/// Trimmed, lower-cased form kept in the history list
pub fn history_key(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Move `query` to the front of `entries`, dropping duplicates and overflow
pub fn push_recent(entries: &mut Vec<String>, query: &str, limit: usize) -> bool {
    let query = history_key(query);
    if query.is_empty() {
        return false;
    }
    entries.retain(|e| *e != query);
    entries.insert(0, query);
    entries.truncate(limit);
    true
}

#[derive(Clone)]
pub struct SearchHistory {
    store: Arc<dyn KvStore>,
    limit: usize,
}

impl SearchHistory {
    pub fn new(store: Arc<dyn KvStore>, limit: usize) -> Self {
        Self { store, limit }
    }

    /// Stored list; an unreadable record reads as empty / 读取历史
    pub async fn entries(&self) -> Vec<String> {
        match self.store.get(HISTORY_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Search history record is corrupted, starting over: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read search history: {}", e);
                Vec::new()
            }
        }
    }

    async fn write(&self, entries: &[String]) -> LookupResult<()> {
        let raw = serde_json::to_string(entries).unwrap_or_else(|_| "[]".to_string());
        self.store.set(HISTORY_KEY, &raw).await
    }

    /// Record a committed query and return the updated list
    pub async fn record(&self, query: &str) -> LookupResult<Vec<String>> {
        let mut entries = self.entries().await;
        if push_recent(&mut entries, query, self.limit) {
            self.write(&entries).await?;
        }
        Ok(entries)
    }

    pub async fn remove(&self, query: &str) -> LookupResult<Vec<String>> {
        let key = history_key(query);
        let mut entries = self.entries().await;
        let before = entries.len();
        entries.retain(|e| *e != key);
        if entries.len() != before {
            self.write(&entries).await?;
        }
        Ok(entries)
    }

    pub async fn clear(&self) -> LookupResult<()> {
        self.store.remove(HISTORY_KEY).await
    }
}
