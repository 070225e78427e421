use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::state::AppState;
use kotoba_search::dictionary::{CacheStats, ResolverStats};
use kotoba_search::models::Resolution;
use kotoba_search::LookupError;

/// GET /api/dictionary/:word - 查词
pub async fn resolve_word(
    State(state): State<Arc<AppState>>,
    Path(word): Path<String>,
) -> Json<ApiResponse<Resolution>> {
    if word.trim().is_empty() {
        return Json(ApiResponse::error(&LookupError::InvalidQuery.to_string()));
    }
    Json(ApiResponse::success(state.resolver.resolve(&word).await))
}

#[derive(Debug, Serialize)]
pub struct DictionaryStats {
    pub cache: CacheStats,
    pub resolver: ResolverStats,
}

/// GET /api/cache/dictionary/stats - 缓存统计
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<DictionaryStats>> {
    Json(ApiResponse::success(DictionaryStats {
        cache: state.resolver.cache_stats().await,
        resolver: state.resolver.stats(),
    }))
}

/// DELETE /api/cache/dictionary - 清空缓存
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<ApiResponse<usize>> {
    let removed = state.resolver.clear_cache().await;
    tracing::info!("Word cache cleared: {} records", removed);
    Json(ApiResponse::success(removed))
}
