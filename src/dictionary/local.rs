//! Bundled local dictionary / 本地词典
//!
//! Loaded once per resolver (explicit `init`, or lazily on first lookup) and
//! read-only afterwards.

use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::OnceCell;

use crate::error::{LookupError, LookupResult};
use crate::models::DictionaryEntry;
use crate::text::{contains_cjk, katakana_to_hiragana, normalize_headword};

enum DatasetSource {
    File(PathBuf),
    Entries(Vec<DictionaryEntry>),
}

#[derive(Default)]
struct DictionaryIndex {
    entries: Vec<DictionaryEntry>,
    /// normalized headword -> position in `entries`
    by_headword: HashMap<String, usize>,
}

impl DictionaryIndex {
    fn build(entries: Vec<DictionaryEntry>) -> Self {
        let mut by_headword = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            // first occurrence wins for duplicated headwords
            by_headword.entry(normalize_headword(&entry.headword)).or_insert(pos);
        }
        Self { entries, by_headword }
    }
}

pub struct LocalDictionary {
    source: DatasetSource,
    index: OnceCell<DictionaryIndex>,
}

impl LocalDictionary {
    /// Dictionary backed by a JSON array file / 从 JSON 文件加载
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: DatasetSource::File(path.into()),
            index: OnceCell::new(),
        }
    }

    pub fn from_entries(entries: Vec<DictionaryEntry>) -> Self {
        Self {
            source: DatasetSource::Entries(entries),
            index: OnceCell::new(),
        }
    }

    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }

    async fn read_source(&self) -> LookupResult<Vec<DictionaryEntry>> {
        match &self.source {
            DatasetSource::Entries(entries) => Ok(entries.clone()),
            DatasetSource::File(path) => {
                let content = tokio::fs::read_to_string(path).await?;
                serde_json::from_str(&content)
                    .map_err(|e| LookupError::Dataset(format!("{:?}: {}", path, e)))
            }
        }
    }

    async fn index(&self) -> &DictionaryIndex {
        self.index.get_or_init(|| async {
            match self.read_source().await {
                Ok(entries) => {
                    tracing::info!("Local dictionary loaded: {} entries", entries.len());
                    DictionaryIndex::build(entries)
                }
                Err(e) => {
                    tracing::warn!("Local dictionary unavailable, continuing without it: {}", e);
                    DictionaryIndex::default()
                }
            }
        }).await
    }

    /// Load the dataset now; returns the number of entries / 立即加载，返回条目数
    pub async fn init(&self) -> usize {
        self.index().await.entries.len()
    }

    pub fn is_loaded(&self) -> bool {
        self.index.initialized()
    }

    /// Exact headword lookup, then a full scan of kanji/kana forms for Japanese input.
    pub async fn lookup(&self, word: &str) -> Option<DictionaryEntry> {
        let key = normalize_headword(word);
        if key.is_empty() {
            return None;
        }
        let index = self.index().await;

        if let Some(&pos) = index.by_headword.get(&key) {
            return index.entries.get(pos).cloned();
        }

        if !contains_cjk(&key) {
            return None;
        }

        let wanted = katakana_to_hiragana(&key);
        index.entries.iter()
            .find(|entry| {
                entry.kanji.as_deref() == Some(key.as_str())
                    || entry.kana.as_deref().map(katakana_to_hiragana).as_deref() == Some(wanted.as_str())
            })
            .cloned()
    }

    /// Entries whose headword, kanji or kana starts with `prefix` / 前缀联想
    pub async fn suggest(&self, prefix: &str, limit: usize) -> Vec<DictionaryEntry> {
        let prefix = normalize_headword(prefix);
        if prefix.is_empty() || limit == 0 {
            return Vec::new();
        }
        let kana_prefix = katakana_to_hiragana(&prefix);
        let index = self.index().await;

        index.entries.iter()
            .filter(|entry| {
                normalize_headword(&entry.headword).starts_with(&prefix)
                    || entry.kanji.as_deref().is_some_and(|k| k.starts_with(&prefix))
                    || entry.kana.as_deref().is_some_and(|k| katakana_to_hiragana(k).starts_with(&kana_prefix))
            })
            .take(limit)
            .cloned()
            .collect()
    }
}
