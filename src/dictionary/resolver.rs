//! Tiered word resolver / 分层查词
//!
//! local dictionary -> persistent cache -> remote failover chain.
//! Every remote outcome is written back to the cache, misses included, so an
//! unknown word walks the chain once until its record is evicted.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use super::cache::{CacheStats, WordCache};
use super::failover::{ChainOutcome, Endpoint, FailoverChain};
use super::local::LocalDictionary;
use super::remote::{GoogleTranslator, JishoProvider, RemoteLookup, Translator, WordProvider};
use crate::config::DictionaryConfig;
use crate::error::LookupError;
use crate::models::{DictionaryEntry, Resolution, ResolvedWord, Sense, WordSource};
use crate::storage::KvStore;
use crate::text::normalize_headword;

/// Counters per resolution tier / 各层命中统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolverStats {
    pub local_hits: u64,
    pub cache_hits: u64,
    pub remote_hits: u64,
    pub misses: u64,
    /// Remote chain walks (one per cache miss)
    pub remote_walks: u64,
}

pub struct WordResolver {
    local: Arc<LocalDictionary>,
    cache: WordCache,
    providers: FailoverChain<dyn WordProvider>,
    translators: FailoverChain<dyn Translator>,
    display_language: String,
    max_translated_definitions: usize,
    stats: Mutex<ResolverStats>,
}

impl WordResolver {
    pub fn new(local: Arc<LocalDictionary>, store: Arc<dyn KvStore>) -> Self {
        Self {
            local,
            cache: WordCache::new(store),
            providers: FailoverChain::new(),
            translators: FailoverChain::new(),
            display_language: "vi".to_string(),
            max_translated_definitions: 3,
            stats: Mutex::new(ResolverStats::default()),
        }
    }

    /// Build the resolver with HTTP providers described by configuration / 按配置构建
    pub fn from_config(config: &DictionaryConfig, store: Arc<dyn KvStore>) -> Self {
        let local = Arc::new(LocalDictionary::from_path(&config.dataset_path));
        let mut resolver = Self::new(local, store)
            .with_display_language(&config.display_language, config.max_translated_definitions);

        for ep in &config.endpoints {
            let provider: Arc<dyn WordProvider> = Arc::new(JishoProvider::new(&ep.name, &ep.base_url));
            let mut endpoint = Endpoint::new(&ep.name, provider, ep.timeout()).with_order(ep.order);
            endpoint.enabled = ep.enabled;
            resolver.providers.add(endpoint);
        }
        for ep in &config.translators {
            let translator: Arc<dyn Translator> = Arc::new(GoogleTranslator::new(&ep.base_url));
            let mut endpoint = Endpoint::new(&ep.name, translator, ep.timeout()).with_order(ep.order);
            endpoint.enabled = ep.enabled;
            resolver.translators.add(endpoint);
        }
        resolver
    }

    pub fn with_provider(mut self, endpoint: Endpoint<dyn WordProvider>) -> Self {
        self.providers.add(endpoint);
        self
    }

    pub fn with_translator(mut self, endpoint: Endpoint<dyn Translator>) -> Self {
        self.translators.add(endpoint);
        self
    }

    pub fn with_display_language(mut self, language: &str, max_translated_definitions: usize) -> Self {
        self.display_language = language.to_string();
        self.max_translated_definitions = max_translated_definitions;
        self
    }

    /// Load the local dictionary now instead of on first lookup / 预加载本地词典
    pub async fn init(&self) -> usize {
        let count = self.local.init().await;
        tracing::info!(
            "Word resolver ready: {} local entries, providers={:?}, translators={:?}",
            count,
            self.providers.names(),
            self.translators.names()
        );
        count
    }

    pub fn local(&self) -> &LocalDictionary {
        &self.local
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats.lock().clone()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    /// Evict a cached miss so the next lookup reaches the remote chain again.
    ///
    /// Found words stay cached. Returns whether a miss was evicted.
    pub async fn forget_miss(&self, word: &str) -> bool {
        let key = normalize_headword(word);
        if key.is_empty() {
            return false;
        }
        match self.cache.get(&key).await {
            Some(record) if record.payload == Resolution::NotFound => {
                tracing::debug!("Evicting cached miss {}", record.key);
                self.cache.remove(&key).await
            }
            _ => false,
        }
    }

    /// Local entries starting with `prefix`, for the dictionary suggestions row
    pub async fn suggest(&self, prefix: &str, limit: usize) -> Vec<DictionaryEntry> {
        self.local.suggest(prefix, limit).await
    }

    /// Resolve a word. Never fails: exhausting every source yields `NotFound`.
    pub async fn resolve(&self, word: &str) -> Resolution {
        let key = normalize_headword(word);
        if key.is_empty() {
            return Resolution::NotFound;
        }

        // CHECK_LOCAL_DICT
        if let Some(entry) = self.local.lookup(&key).await {
            tracing::debug!("resolve {}: local hit", key);
            self.stats.lock().local_hits += 1;
            return Resolution::Found { word: ResolvedWord::from_entry(&entry) };
        }

        // CHECK_CACHE
        if let Some(record) = self.cache.get(&key).await {
            tracing::debug!("resolve {}: cache hit", key);
            self.stats.lock().cache_hits += 1;
            return record.payload;
        }

        // REMOTE_ATTEMPT(i)
        self.stats.lock().remote_walks += 1;
        let outcome = self.providers.run(|provider| {
            let key = key.clone();
            async move {
                let result = provider.lookup(&key).await?;
                Ok::<_, LookupError>(result.found.then_some(result))
            }
        }).await;

        match outcome {
            ChainOutcome::Success { value, endpoint, attempts } => {
                tracing::debug!("resolve {}: resolved by {} after {} attempt(s)", key, endpoint, attempts);
                let word = self.localize(&key, value).await;
                let resolution = Resolution::Found { word };
                self.cache.put(&key, &resolution).await;
                self.stats.lock().remote_hits += 1;
                resolution
            }
            ChainOutcome::Exhausted { attempts, definitive_miss } => {
                if definitive_miss {
                    tracing::debug!("resolve {}: not found after {} attempt(s)", key, attempts);
                } else {
                    tracing::warn!("resolve {}: every endpoint failed ({} attempt(s))", key, attempts);
                }
                self.cache.put(&key, &Resolution::NotFound).await;
                self.stats.lock().misses += 1;
                Resolution::NotFound
            }
        }
    }

    /// Normalize a provider payload and translate definitions where possible.
    async fn localize(&self, key: &str, remote: RemoteLookup) -> ResolvedWord {
        let mut senses = Vec::with_capacity(remote.senses.len());
        for sense in remote.senses {
            let mut definitions = Vec::with_capacity(sense.definitions.len());
            for (i, definition) in sense.definitions.into_iter().enumerate() {
                if i < self.max_translated_definitions {
                    definitions.push(self.translate_or_keep(definition).await);
                } else {
                    definitions.push(definition);
                }
            }
            senses.push(Sense {
                parts_of_speech: sense.parts_of_speech,
                definitions,
                tags: sense.tags,
            });
        }

        let headword = remote.readings.first()
            .and_then(|r| r.word.clone().or_else(|| r.reading.clone()))
            .unwrap_or_else(|| key.to_string());

        ResolvedWord {
            headword,
            readings: remote.readings,
            senses,
            is_common: remote.is_common,
            levels: remote.levels,
            source: WordSource::CachedRemote,
            raw: Some(remote.raw),
        }
    }

    async fn translate_or_keep(&self, text: String) -> String {
        if self.translators.is_empty() || self.display_language.starts_with("en") {
            return text;
        }
        let lang = self.display_language.as_str();
        let outcome = self.translators.run(|translator| {
            let text = text.clone();
            async move { translator.translate(&text, lang).await.map(Some) }
        }).await;

        match outcome {
            ChainOutcome::Success { value, .. } => value,
            ChainOutcome::Exhausted { .. } => {
                tracing::debug!("translation unavailable, keeping source text: {}", text);
                text
            }
        }
    }
}
