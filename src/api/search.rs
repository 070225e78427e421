use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::state::AppState;
use kotoba_search::models::SearchHit;
use kotoba_search::orchestrator::SearchSnapshot;
use kotoba_search::LookupError;

fn default_session() -> String {
    "default".to_string()
}

fn default_wait() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct IncrementalSearchRequest {
    /// Client-chosen session id / 客户端会话ID
    #[serde(default = "default_session")]
    pub session_id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Wait for this keystroke's results instead of returning the current view
    #[serde(default = "default_wait")]
    pub wait: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchView {
    #[serde(flatten)]
    pub snapshot: SearchSnapshot,
    pub total: usize,
    pub selected_hit: Option<SearchHit>,
}

fn view(snapshot: SearchSnapshot, selected_hit: Option<SearchHit>) -> SearchView {
    SearchView {
        total: snapshot.results.total(),
        snapshot,
        selected_hit,
    }
}

/// POST /api/search/incremental - 增量搜索
pub async fn incremental_search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IncrementalSearchRequest>,
) -> Json<ApiResponse<SearchView>> {
    let session = state.session(&req.session_id);
    let orchestrator = &session.orchestrator;

    let generation = orchestrator.on_query_change(&req.query, req.role.as_deref());
    let snapshot = if req.wait {
        orchestrator.wait_for(generation).await
    } else {
        orchestrator.snapshot()
    };
    Json(ApiResponse::success(view(snapshot, orchestrator.selected())))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectAction {
    Next,
    Previous,
    PageDown,
    PageUp,
    First,
    Last,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    #[serde(default = "default_session")]
    pub session_id: String,
    pub action: SelectAction,
}

/// POST /api/search/select - 移动选中项
pub async fn select(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectRequest>,
) -> Json<ApiResponse<SearchView>> {
    let session = state.session(&req.session_id);
    let orchestrator = &session.orchestrator;
    match req.action {
        SelectAction::Next => orchestrator.select_next(),
        SelectAction::Previous => orchestrator.select_previous(),
        SelectAction::PageDown => orchestrator.page_down(),
        SelectAction::PageUp => orchestrator.page_up(),
        SelectAction::First => orchestrator.select_first(),
        SelectAction::Last => orchestrator.select_last(),
    };
    Json(ApiResponse::success(view(orchestrator.snapshot(), orchestrator.selected())))
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    #[serde(default = "default_session")]
    pub session_id: String,
}

/// POST /api/search/retry - 重试当前查询（清除否定缓存）
pub async fn retry(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Json<ApiResponse<SearchView>> {
    let session = state.session(&req.session_id);
    let orchestrator = &session.orchestrator;
    let generation = orchestrator.retry().await;
    let snapshot = orchestrator.wait_for(generation).await;
    Json(ApiResponse::success(view(snapshot, orchestrator.selected())))
}

/// POST /api/search/commit - 确认当前查询（写入历史）
pub async fn commit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Json<ApiResponse<Option<SearchHit>>> {
    let session = state.session(&req.session_id);
    Json(ApiResponse::success(session.orchestrator.commit_search().await))
}

/// POST /api/search/close - 关闭会话
pub async fn close(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Json<ApiResponse<bool>> {
    Json(ApiResponse::success(state.close_session(&req.session_id)))
}

// ---- History ----

/// GET /api/search/history - 搜索历史
pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.history.entries().await))
}

#[derive(Debug, Deserialize)]
pub struct RecordHistoryRequest {
    pub query: String,
}

/// POST /api/search/history - 记录查询
pub async fn record_history(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecordHistoryRequest>,
) -> Json<ApiResponse<Vec<String>>> {
    if req.query.trim().is_empty() {
        return Json(ApiResponse::error(&LookupError::InvalidQuery.to_string()));
    }
    match state.history.record(&req.query).await {
        Ok(entries) => Json(ApiResponse::success(entries)),
        Err(e) => Json(ApiResponse::error(&format!("Failed to save history: {}", e))),
    }
}

/// DELETE /api/search/history/:query - 删除单条历史
pub async fn remove_history(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Json<ApiResponse<Vec<String>>> {
    match state.history.remove(&query).await {
        Ok(entries) => Json(ApiResponse::success(entries)),
        Err(e) => Json(ApiResponse::error(&format!("Failed to update history: {}", e))),
    }
}

/// DELETE /api/search/history - 清空历史
pub async fn clear_history(State(state): State<Arc<AppState>>) -> Json<ApiResponse<()>> {
    match state.history.clear().await {
        Ok(()) => Json(ApiResponse::success(())),
        Err(e) => Json(ApiResponse::error(&format!("Failed to clear history: {}", e))),
    }
}
