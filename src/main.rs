use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use kotoba_search::config;
use kotoba_search::content::{ContentLibrary, ContentRepository};
use kotoba_search::dictionary::WordResolver;
use kotoba_search::registry::Catalog;
use kotoba_search::storage::{KvStore, SqliteStore};
use kotoba_search::SearchServices;
use state::AppState;

/// Registry catalog: operator file if configured, built-in otherwise / 加载注册表
fn load_catalog(path: &str) -> Catalog {
    if path.is_empty() {
        return Catalog::builtin();
    }
    match Catalog::from_json_file(path) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("Failed to load registry catalog {}, using built-in: {}", path, e);
            Catalog::builtin()
        }
    }
}

/// Content library: empty when unconfigured or unreadable / 加载内容库
async fn load_content(path: &str) -> ContentLibrary {
    if path.is_empty() {
        tracing::info!("No content library configured");
        return ContentLibrary::new();
    }
    match ContentLibrary::from_json_file(path).await {
        Ok(library) => library,
        Err(e) => {
            tracing::error!("Failed to load content library {}: {}", path, e);
            ContentLibrary::new()
        }
    }
}

/// HTTP routes / 路由
fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::server::health_check))
        .route("/api/registry/search", get(api::registry::search_registry))
        .route("/api/dictionary/:word", get(api::dictionary::resolve_word))
        .route("/api/cache/dictionary", delete(api::dictionary::clear_cache))
        .route("/api/cache/dictionary/stats", get(api::dictionary::cache_stats))
        .route("/api/search/incremental", post(api::search::incremental_search))
        .route("/api/search/select", post(api::search::select))
        .route("/api/search/retry", post(api::search::retry))
        .route("/api/search/commit", post(api::search::commit))
        .route("/api/search/close", post(api::search::close))
        .route(
            "/api/search/history",
            get(api::search::get_history)
                .post(api::search::record_history)
                .delete(api::search::clear_history),
        )
        .route("/api/search/history/:query", delete(api::search::remove_history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kotoba_search=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("kotoba-search {} (built {})", env!("CARGO_PKG_VERSION"), env!("BUILD_TIME"));

    // Load configuration / 加载配置
    let app_config = config::load_config().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("Server will listen on {}", app_config.get_bind_address());

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| app_config.get_database_url());
    let store: Arc<dyn KvStore> = Arc::new(SqliteStore::connect(&database_url).await?);

    let resolver = Arc::new(WordResolver::from_config(&app_config.dictionary, store.clone()));
    resolver.init().await;

    let catalog = load_catalog(&app_config.catalog.path);
    tracing::info!("Registry catalog: {} items", catalog.len());
    let content: Arc<dyn ContentRepository> = Arc::new(load_content(&app_config.content.path).await);

    let state = Arc::new(AppState::new(SearchServices {
        catalog,
        resolver,
        content,
        store,
        config: app_config.search.clone(),
    }));

    let app = router(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
