use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::state::AppState;
use kotoba_search::models::RankedRegistryItem;

#[derive(Debug, Deserialize)]
pub struct RegistrySearchParams {
    #[serde(default)]
    pub q: String,
    /// Viewer role; absent means guest / 角色，缺省为访客
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/registry/search?q=&role= - 注册表搜索
pub async fn search_registry(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegistrySearchParams>,
) -> Json<ApiResponse<Vec<RankedRegistryItem>>> {
    let limit = params.limit.unwrap_or(state.services.config.limits.registry);
    let results = state.services.catalog
        .search(&params.q, params.role.as_deref())
        .into_iter()
        .take(limit)
        .collect();
    Json(ApiResponse::success(results))
}
