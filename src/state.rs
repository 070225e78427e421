use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use kotoba_search::dictionary::WordResolver;
use kotoba_search::orchestrator::{QueryOrchestrator, SearchHistory, SearchServices};

/// Sessions untouched for this long are dropped / 会话空闲超时
const SESSION_IDLE_MINUTES: i64 = 30;

/// Search session held for one client / 搜索会话
pub struct SearchSession {
    pub orchestrator: QueryOrchestrator,
    pub last_used: RwLock<DateTime<Utc>>,
}

impl SearchSession {
    fn new(services: SearchServices) -> Self {
        Self {
            orchestrator: QueryOrchestrator::new(services),
            last_used: RwLock::new(Utc::now()),
        }
    }

    pub fn touch(&self) {
        *self.last_used.write() = Utc::now();
    }
}

pub struct AppState {
    pub services: SearchServices,
    pub resolver: Arc<WordResolver>,
    pub history: SearchHistory,
    pub sessions: RwLock<HashMap<String, Arc<SearchSession>>>,
}

impl AppState {
    pub fn new(services: SearchServices) -> Self {
        let history = SearchHistory::new(services.store.clone(), services.config.history_limit);
        Self {
            resolver: services.resolver.clone(),
            history,
            services,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get or open the session `id`, pruning idle ones / 获取或创建会话
    pub fn session(&self, id: &str) -> Arc<SearchSession> {
        if let Some(session) = self.sessions.read().get(id) {
            session.touch();
            return session.clone();
        }

        let mut sessions = self.sessions.write();
        let cutoff = Utc::now() - Duration::minutes(SESSION_IDLE_MINUTES);
        let before = sessions.len();
        sessions.retain(|_, s| *s.last_used.read() > cutoff);
        if sessions.len() != before {
            tracing::debug!("Dropped {} idle search sessions", before - sessions.len());
        }

        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::debug!("Opened search session {}", id);
                Arc::new(SearchSession::new(self.services.clone()))
            })
            .clone()
    }

    pub fn close_session(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }
}
