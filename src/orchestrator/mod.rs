//! Query orchestrator - incremental search sessions / 增量搜索会话
//!
//! One orchestrator per open search session. Every keystroke bumps the
//! session generation and re-arms the debounce timer; the evaluation that
//! finally runs queries the registry synchronously and fans out to the word
//! resolver and the content library. Asynchronous branches commit only while
//! their generation is still current, so a slow lookup for an old query can
//! never overwrite the results of a newer one.

pub mod history;
pub mod selection;

pub use history::{push_recent, SearchHistory};
pub use selection::Selection;

use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SearchConfig;
use crate::content::{search_content, ContentMatches, ContentRepository};
use crate::dictionary::WordResolver;
use crate::models::{DictionaryResult, Resolution, ResolvedWord, SearchHit, SearchResults};
use crate::registry::Catalog;
use crate::storage::KvStore;
use crate::text::{contains_cjk, is_single_token, normalize_headword};

/// Engines shared by every session / 各会话共享的服务
#[derive(Clone)]
pub struct SearchServices {
    pub catalog: Catalog,
    pub resolver: Arc<WordResolver>,
    pub content: Arc<dyn ContentRepository>,
    pub store: Arc<dyn KvStore>,
    pub config: SearchConfig,
}

/// Which asynchronous branches a query warrants / 查询意图
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueryIntent {
    /// Japanese script, or a single token
    pub dictionary: bool,
    /// Long enough to walk the content library
    pub content: bool,
}

pub fn classify(query: &str, min_content_query_len: usize) -> QueryIntent {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return QueryIntent::default();
    }
    QueryIntent {
        dictionary: contains_cjk(trimmed) || is_single_token(trimmed),
        content: trimmed.chars().count() >= min_content_query_len,
    }
}

/// Published view of a session / 会话快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSnapshot {
    pub generation: u64,
    pub query: String,
    pub results: SearchResults,
    pub selected: usize,
    /// No branch of this generation is still running
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct PendingBranches {
    dictionary: bool,
    content: bool,
}

struct QueryState {
    query: String,
    role: Option<String>,
    results: SearchResults,
    selection: Selection,
    generation: u64,
    debounce: Option<JoinHandle<()>>,
    pending: PendingBranches,
}

impl QueryState {
    fn snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            generation: self.generation,
            query: self.query.clone(),
            results: self.results.clone(),
            selected: self.selection.index(),
            complete: !self.pending.dictionary && !self.pending.content,
        }
    }
}

struct Shared {
    services: SearchServices,
    history: SearchHistory,
    state: Mutex<QueryState>,
    updates: watch::Sender<SearchSnapshot>,
}

impl Shared {
    fn publish(&self, state: &QueryState) {
        self.updates.send_replace(state.snapshot());
    }

    /// Apply `update` only if `generation` is still current / 仅提交当前代的结果
    fn commit(&self, generation: u64, update: impl FnOnce(&mut QueryState)) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!(
                "Discarding stale result of generation {} (current {})",
                generation,
                state.generation
            );
            return false;
        }
        update(&mut state);
        let total = state.results.total();
        state.selection.sync(total);
        self.publish(&state);
        true
    }
}

pub struct QueryOrchestrator {
    shared: Arc<Shared>,
}

impl QueryOrchestrator {
    pub fn new(services: SearchServices) -> Self {
        let history = SearchHistory::new(services.store.clone(), services.config.history_limit);
        let state = QueryState {
            query: String::new(),
            role: None,
            results: SearchResults::default(),
            selection: Selection::new(services.config.page_step),
            generation: 0,
            debounce: None,
            pending: PendingBranches::default(),
        };
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            shared: Arc::new(Shared {
                services,
                history,
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.shared.state.lock().generation
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.shared.state.lock().snapshot()
    }

    pub fn results(&self) -> SearchResults {
        self.shared.state.lock().results.clone()
    }

    pub fn history(&self) -> &SearchHistory {
        &self.shared.history
    }

    /// Handle a keystroke: bump the generation and re-arm the debounce timer.
    ///
    /// Must be called from within a tokio runtime. Returns the new generation.
    pub fn on_query_change(&self, query: &str, role: Option<&str>) -> u64 {
        let mut state = self.shared.state.lock();
        state.generation += 1;
        let generation = state.generation;
        if let Some(timer) = state.debounce.take() {
            timer.abort();
        }
        state.query = query.to_string();
        state.role = role.map(str::to_string);

        if query.trim().is_empty() {
            state.results = SearchResults::default();
            state.pending = PendingBranches::default();
            state.selection.sync(0);
            self.shared.publish(&state);
            return generation;
        }

        let shared = self.shared.clone();
        let delay = self.shared.services.config.debounce();
        // Aborting the timer only cancels the wait; a started evaluation runs
        // to completion and is filtered by its generation.
        state.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(evaluate(shared, generation));
        }));
        generation
    }

    /// Re-run the current query after a "not found, try again" row.
    ///
    /// The cached miss for the query is evicted first so the word resolver
    /// walks its remote chain again. Returns the new generation.
    pub async fn retry(&self) -> u64 {
        let (query, role) = {
            let state = self.shared.state.lock();
            (state.query.clone(), state.role.clone())
        };
        if self.shared.services.resolver.forget_miss(query.trim()).await {
            tracing::info!("Retrying {:?} against remote dictionaries", query.trim());
        }
        self.on_query_change(&query, role.as_deref())
    }

    /// Feed `query` and wait for its merged results / 执行增量搜索并等待结果
    ///
    /// If a newer query arrives meanwhile, the newer results are returned.
    pub async fn run_incremental_search(&self, query: &str, role: Option<&str>) -> SearchResults {
        let mut updates = self.subscribe();
        let generation = self.on_query_change(query, role);
        self.wait_until_complete(&mut updates, generation).await.results
    }

    /// Wait for the first complete snapshot at or after `generation`
    pub async fn wait_for(&self, generation: u64) -> SearchSnapshot {
        let mut updates = self.subscribe();
        self.wait_until_complete(&mut updates, generation).await
    }

    async fn wait_until_complete(
        &self,
        updates: &mut watch::Receiver<SearchSnapshot>,
        generation: u64,
    ) -> SearchSnapshot {
        loop {
            {
                let snapshot = updates.borrow_and_update();
                if snapshot.generation >= generation && snapshot.complete {
                    return snapshot.clone();
                }
            }
            if updates.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    fn with_selection(&self, step: impl FnOnce(&mut Selection)) -> usize {
        let mut state = self.shared.state.lock();
        step(&mut state.selection);
        self.shared.publish(&state);
        state.selection.index()
    }

    pub fn select_next(&self) -> usize {
        self.with_selection(Selection::next)
    }

    pub fn select_previous(&self) -> usize {
        self.with_selection(Selection::previous)
    }

    pub fn page_down(&self) -> usize {
        self.with_selection(Selection::page_down)
    }

    pub fn page_up(&self) -> usize {
        self.with_selection(Selection::page_up)
    }

    pub fn select_first(&self) -> usize {
        self.with_selection(Selection::first)
    }

    pub fn select_last(&self) -> usize {
        self.with_selection(Selection::last)
    }

    /// Highlighted row of the flattened result list / 当前选中项
    pub fn selected(&self) -> Option<SearchHit> {
        let state = self.shared.state.lock();
        state.results.hit_at(state.selection.index())
    }

    /// The user acted on the current query: remember it and return the highlighted row
    pub async fn commit_search(&self) -> Option<SearchHit> {
        let (query, hit) = {
            let state = self.shared.state.lock();
            (state.query.clone(), state.results.hit_at(state.selection.index()))
        };
        if let Err(e) = self.shared.history.record(&query).await {
            tracing::warn!("Failed to record search history: {}", e);
        }
        hit
    }

    /// End the session; in-flight branches will find their generation stale
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        state.generation += 1;
        if let Some(timer) = state.debounce.take() {
            timer.abort();
        }
        state.pending = PendingBranches::default();
    }
}

impl Drop for QueryOrchestrator {
    fn drop(&mut self) {
        self.close();
    }
}

/// Run `branch` as its own task so a panic inside it stays contained
async fn isolated<T, F>(name: &str, branch: F) -> Option<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(branch).await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("{} branch aborted: {}", name, e);
            None
        }
    }
}

async fn evaluate(shared: Arc<Shared>, generation: u64) {
    let (query, role) = {
        let state = shared.state.lock();
        if state.generation != generation {
            return;
        }
        (state.query.trim().to_string(), state.role.clone())
    };
    let config = &shared.services.config;
    let intent = classify(&query, config.min_content_query_len);

    let registry: Vec<_> = shared.services.catalog
        .search(&query, role.as_deref())
        .into_iter()
        .take(config.limits.registry)
        .collect();

    let committed = shared.commit(generation, |state| {
        state.results = SearchResults {
            dictionary: if intent.dictionary {
                vec![DictionaryResult::Pending { query: query.clone() }]
            } else {
                Vec::new()
            },
            registry,
            ..SearchResults::default()
        };
        state.pending = PendingBranches {
            dictionary: intent.dictionary,
            content: intent.content,
        };
    });
    if !committed {
        return;
    }
    tracing::debug!("evaluate {:?} (generation {}): {:?}", query, generation, intent);

    if intent.dictionary {
        let shared = shared.clone();
        let query = query.clone();
        tokio::spawn(async move {
            let resolver = shared.services.resolver.clone();
            let limit = shared.services.config.limits.dictionary;
            let bucket = isolated("dictionary", dictionary_bucket(resolver, query.clone(), limit))
                .await
                .unwrap_or_else(|| vec![DictionaryResult::NotFound { query }]);
            shared.commit(generation, |state| {
                state.results.dictionary = bucket;
                state.pending.dictionary = false;
            });
        });
    }

    if intent.content {
        let shared = shared.clone();
        tokio::spawn(async move {
            let repo = shared.services.content.clone();
            let levels = shared.services.config.levels.clone();
            let limits = shared.services.config.limits.clone();
            let matches = isolated("content", async move {
                search_content(repo.as_ref(), &query, &levels, &limits).await
            })
            .await
            .unwrap_or_default();
            let ContentMatches { books, chapters, lessons } = matches;
            shared.commit(generation, |state| {
                state.results.books = books;
                state.results.chapters = chapters;
                state.results.lessons = lessons;
                state.pending.content = false;
            });
        });
    }
}

/// Resolved word first, then local prefix suggestions, up to `limit` rows
async fn dictionary_bucket(resolver: Arc<WordResolver>, query: String, limit: usize) -> Vec<DictionaryResult> {
    let mut bucket = Vec::with_capacity(limit);
    let mut seen = Vec::new();

    if let Resolution::Found { word } = resolver.resolve(&query).await {
        seen.push(normalize_headword(&word.headword));
        bucket.push(DictionaryResult::Entry { word });
    }

    for entry in resolver.suggest(&query, limit).await {
        if bucket.len() >= limit {
            break;
        }
        let key = normalize_headword(&entry.headword);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        bucket.push(DictionaryResult::Entry { word: ResolvedWord::from_entry(&entry) });
    }

    if bucket.is_empty() {
        bucket.push(DictionaryResult::NotFound { query });
    }
    bucket.truncate(limit);
    bucket
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryLimits;
    use crate::content::tests::{library, BrokenRepository};
    use crate::dictionary::local::tests::sample;
    use crate::dictionary::{Endpoint, LocalDictionary, RemoteLookup, RemoteSense, WordProvider};
    use crate::error::LookupResult;
    use crate::models::{Reading, WordSource};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Finds every word after a per-word delay
    struct EchoProvider {
        slow_word: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl EchoProvider {
        fn new(slow_word: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self { slow_word, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WordProvider for EchoProvider {
        async fn lookup(&self, word: &str) -> LookupResult<RemoteLookup> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = if self.slow_word == Some(word) { 2_000 } else { 50 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(RemoteLookup {
                found: true,
                readings: vec![Reading { word: Some(word.to_string()), reading: None }],
                senses: vec![RemoteSense {
                    parts_of_speech: Vec::new(),
                    definitions: vec![format!("meaning of {}", word)],
                    tags: Vec::new(),
                }],
                is_common: false,
                levels: Vec::new(),
                raw: serde_json::json!({ "slug": word }),
            })
        }
    }

    fn services_with(
        provider: Arc<EchoProvider>,
        content: Arc<dyn ContentRepository>,
        config: SearchConfig,
    ) -> SearchServices {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let service: Arc<dyn WordProvider> = provider;
        let resolver = WordResolver::new(Arc::new(LocalDictionary::from_entries(sample())), store.clone())
            .with_provider(Endpoint::new("echo", service, Duration::from_secs(10)));
        SearchServices {
            catalog: Catalog::builtin(),
            resolver: Arc::new(resolver),
            content,
            store,
            config,
        }
    }

    fn services(provider: Arc<EchoProvider>) -> SearchServices {
        services_with(provider, Arc::new(library()), SearchConfig::default())
    }

    fn category_rank(hit: &SearchHit) -> usize {
        match hit {
            SearchHit::Dictionary(_) => 0,
            SearchHit::Registry(_) => 1,
            SearchHit::Book(_) => 2,
            SearchHit::Chapter(_) => 3,
            SearchHit::Lesson(_) => 4,
        }
    }

    fn dictionary_headwords(results: &SearchResults) -> Vec<String> {
        results.dictionary.iter()
            .filter_map(|d| match d {
                DictionaryResult::Entry { word } => Some(word.headword.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("taberu", 2), QueryIntent { dictionary: true, content: true });
        assert_eq!(classify("a", 2), QueryIntent { dictionary: true, content: false });
        assert_eq!(classify("cap do", 2), QueryIntent { dictionary: false, content: true });
        assert_eq!(classify("食べ物 ngon", 2), QueryIntent { dictionary: true, content: true });
        assert_eq!(classify("  ", 2), QueryIntent::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_is_discarded() {
        let provider = EchoProvider::new(Some("a"));
        let orchestrator = QueryOrchestrator::new(services(provider.clone()));

        let first = orchestrator.on_query_change("a", None);
        // let the "a" evaluation start its slow lookup
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!orchestrator.snapshot().complete);

        let results = orchestrator.run_incremental_search("ab", None).await;
        assert_eq!(dictionary_headwords(&results), vec!["ab"]);

        // the "a" lookup finishes afterwards and must not leak in
        tokio::time::sleep(Duration::from_secs(5)).await;
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.generation, first + 1);
        assert_eq!(snapshot.query, "ab");
        assert_eq!(dictionary_headwords(&snapshot.results), vec!["ab"]);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_runs_only_last_keystroke() {
        let provider = EchoProvider::new(None);
        let orchestrator = QueryOrchestrator::new(services(provider.clone()));

        orchestrator.on_query_change("k", None);
        orchestrator.on_query_change("ka", None);
        orchestrator.on_query_change("kam", None);
        let results = orchestrator.run_incremental_search("kami", None).await;

        assert_eq!(dictionary_headwords(&results), vec!["kami"]);
        assert_eq!(provider.calls(), 1);
        assert_eq!(orchestrator.generation(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_order_is_fixed() {
        let provider = EchoProvider::new(None);
        let orchestrator = QueryOrchestrator::new(services(provider));

        let results = orchestrator.run_incremental_search("bai", None).await;
        assert_eq!(results.chapters.len(), 2);
        assert_eq!(results.lessons.len(), 3);

        let ranks: Vec<usize> = results.flatten().iter().map(category_rank).collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(ranks.first(), Some(&0));
        assert_eq!(ranks.last(), Some(&4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_caps() {
        let config = SearchConfig {
            limits: CategoryLimits { registry: 2, lessons: 1, ..CategoryLimits::default() },
            ..SearchConfig::default()
        };
        let orchestrator = QueryOrchestrator::new(services_with(
            EchoProvider::new(None),
            Arc::new(library()),
            config,
        ));

        let results = orchestrator.run_incremental_search("e", None).await;
        assert_eq!(results.registry.len(), 2);
        assert!(results.registry[0].score >= results.registry[1].score);

        let results = orchestrator.run_incremental_search("tu vung", None).await;
        assert_eq!(results.lessons.len(), 1);
        assert!(results.dictionary.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dictionary_bucket_fills_with_suggestions() {
        let provider = EchoProvider::new(None);
        let orchestrator = QueryOrchestrator::new(services(provider.clone()));

        let results = orchestrator.run_incremental_search("食べる", None).await;
        assert_eq!(dictionary_headwords(&results), vec!["食べる"]);
        match &results.dictionary[0] {
            DictionaryResult::Entry { word } => assert_eq!(word.source, WordSource::Local),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(provider.calls(), 0);

        // remote word first, then local entries sharing the prefix
        let results = orchestrator.run_incremental_search("食べ", None).await;
        assert_eq!(dictionary_headwords(&results), vec!["食べ", "食べる", "食べ物"]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_placeholder_then_entry() {
        let provider = EchoProvider::new(Some("ねこ"));
        let orchestrator = QueryOrchestrator::new(services(provider));

        let generation = orchestrator.on_query_change("ねこ", None);
        tokio::time::sleep(Duration::from_millis(300)).await;
        let pending = orchestrator.snapshot();
        assert_eq!(pending.results.dictionary, vec![DictionaryResult::Pending { query: "ねこ".to_string() }]);

        let done = orchestrator.wait_for(generation).await;
        assert_eq!(dictionary_headwords(&done.results), vec!["ねこ"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_short_circuits() {
        let provider = EchoProvider::new(None);
        let repo = Arc::new(BrokenRepository { calls: AtomicUsize::new(0) });
        let orchestrator = QueryOrchestrator::new(services_with(provider.clone(), repo.clone(), SearchConfig::default()));

        orchestrator.run_incremental_search("level", None).await;
        assert!(!orchestrator.results().is_empty());

        let results = orchestrator.run_incremental_search("   ", None).await;
        assert!(results.is_empty());
        assert_eq!(orchestrator.snapshot().selected, 0);
        assert_eq!(provider.calls(), 1);
        assert!(orchestrator.selected().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_failure_keeps_other_categories() {
        let repo = Arc::new(BrokenRepository { calls: AtomicUsize::new(0) });
        let orchestrator = QueryOrchestrator::new(services_with(EchoProvider::new(None), repo.clone(), SearchConfig::default()));

        let results = orchestrator.run_incremental_search("level", None).await;
        assert_eq!(dictionary_headwords(&results), vec!["level"]);
        assert_eq!(results.registry[0].item.id, "level-selection");
        assert!(results.books.is_empty() && results.chapters.is_empty() && results.lessons.is_empty());
        assert!(repo.calls.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_and_commit() {
        let orchestrator = QueryOrchestrator::new(services(EchoProvider::new(None)));
        let results = orchestrator.run_incremental_search("bai", None).await;
        let total = results.total();

        assert!(matches!(orchestrator.selected(), Some(SearchHit::Dictionary(_))));
        assert_eq!(orchestrator.select_previous(), 0);
        assert_eq!(orchestrator.select_next(), 1);
        assert_eq!(orchestrator.select_last(), total - 1);
        assert!(matches!(orchestrator.selected(), Some(SearchHit::Lesson(_))));
        assert_eq!(orchestrator.select_next(), total - 1);
        assert_eq!(orchestrator.select_first(), 0);
        assert_eq!(orchestrator.page_down(), 5.min(total - 1));

        let hit = orchestrator.commit_search().await;
        assert_eq!(hit, orchestrator.selected());
        assert_eq!(orchestrator.history().entries().await, vec!["bai"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_evicts_cached_miss() {
        let provider = EchoProvider::new(None);
        let services = services(provider.clone());
        let miss = serde_json::to_string(&Resolution::NotFound).unwrap();
        services.store.set("dict:neko", &miss).await.unwrap();
        let orchestrator = QueryOrchestrator::new(services);

        let results = orchestrator.run_incremental_search("neko", None).await;
        assert_eq!(results.dictionary, vec![DictionaryResult::NotFound { query: "neko".to_string() }]);
        assert_eq!(provider.calls(), 0);

        let generation = orchestrator.retry().await;
        let snapshot = orchestrator.wait_for(generation).await;
        assert_eq!(snapshot.query, "neko");
        assert_eq!(dictionary_headwords(&snapshot.results), vec!["neko"]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_discards_in_flight_results() {
        let provider = EchoProvider::new(Some("neko"));
        let orchestrator = QueryOrchestrator::new(services(provider.clone()));

        orchestrator.on_query_change("neko", None);
        tokio::time::sleep(Duration::from_millis(300)).await;
        orchestrator.close();
        let before = orchestrator.results();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(orchestrator.results(), before);
        assert_eq!(provider.calls(), 1);
    }
}
