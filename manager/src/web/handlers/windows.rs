// Maintenance window endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::common::{
    api_error, known_target, maintenance_error, AddOutcome, ApiResponse, ApiResult, WindowRequest,
    WindowView,
};
use crate::host::HostResource;
use crate::target::Target;
use crate::web::AppState;
use crate::window::RecurringWindowSpec;

#[derive(Debug, Clone, Deserialize)]
pub struct RecurringRequest {
    pub cron: String,
    pub duration: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub take_online: bool,
    #[serde(default)]
    pub keep_up_when_active: bool,
    #[serde(default)]
    pub max_wait_time: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteWindowsRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelOutcome {
    pub label: String,
    /// Keys of the agents that got the window
    pub targets: Vec<String>,
}

pub async fn list_windows(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Vec<WindowView>> {
    let target = known_target(&state, &key)?;
    let now = state.store.now();
    let windows = state.store.windows(&target).await.map_err(maintenance_error)?;

    Ok(Json(ApiResponse::success(
        windows
            .iter()
            .map(|w| WindowView::new(w, &state.timezone, now))
            .collect(),
    )))
}

pub async fn add_window(
    Path(key): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<WindowRequest>,
) -> ApiResult<AddOutcome> {
    let target = known_target(&state, &key)?;
    let window = request
        .to_window(&state.timezone)
        .map_err(maintenance_error)?;
    let id = window.id().to_string();

    let added = state
        .store
        .add_window(&target, window)
        .await
        .map_err(maintenance_error)?;
    info!("Window {} for {} requested, added = {}", id, target, added);
    Ok(Json(ApiResponse::success(AddOutcome { added, id })))
}

pub async fn delete_window(
    Path((key, id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<DeleteOutcome> {
    let target = known_target(&state, &key)?;
    let deleted = state
        .store
        .delete_window(&target, &id)
        .await
        .map_err(maintenance_error)?;
    Ok(Json(ApiResponse::success(DeleteOutcome { deleted })))
}

pub async fn delete_windows(
    Path(key): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<DeleteWindowsRequest>,
) -> ApiResult<Vec<String>> {
    let target = known_target(&state, &key)?;
    let deleted = state.store.delete_windows(&target, &request.ids).await;
    Ok(Json(ApiResponse::success(deleted)))
}

pub async fn list_recurring(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Vec<RecurringWindowSpec>> {
    let target = known_target(&state, &key)?;
    let specs = state
        .store
        .recurring_windows(&target)
        .await
        .map_err(maintenance_error)?;
    Ok(Json(ApiResponse::success(specs)))
}

pub async fn add_recurring(
    Path(key): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<RecurringRequest>,
) -> ApiResult<AddOutcome> {
    let target = known_target(&state, &key)?;
    let spec = RecurringWindowSpec::new(
        &request.cron,
        &request.duration,
        request.reason,
        request.take_online,
        request.keep_up_when_active,
        request.max_wait_time.as_deref().unwrap_or("-1"),
        request.created_by.unwrap_or_default(),
        None,
    )
    .map_err(maintenance_error)?;
    let id = spec.id().to_string();

    let added = state
        .store
        .add_recurring(&target, spec)
        .await
        .map_err(maintenance_error)?;
    Ok(Json(ApiResponse::success(AddOutcome { added, id })))
}

pub async fn delete_recurring(
    Path((key, id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<DeleteOutcome> {
    let target = known_target(&state, &key)?;
    let deleted = state
        .store
        .delete_recurring(&target, &id)
        .await
        .map_err(maintenance_error)?;
    Ok(Json(ApiResponse::success(DeleteOutcome { deleted })))
}

/// Add the same window to every agent carrying `label`.
pub async fn add_label_window(
    Path(label): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<WindowRequest>,
) -> ApiResult<LabelOutcome> {
    let agents = state.inventory.agents_with_label(&label);
    if agents.is_empty() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("No agent carries label '{}'", label),
        ));
    }

    let window = request
        .to_window(&state.timezone)
        .map_err(maintenance_error)?;

    let mut targets = Vec::with_capacity(agents.len());
    for agent in agents {
        let target = Target::agent(agent.name());
        match state.store.add_window(&target, window.clone()).await {
            Ok(true) => targets.push(target.key()),
            Ok(false) => {}
            Err(e) => warn!("Failed to add window for label '{}' to {}: {}", label, target, e),
        }
    }

    info!("Window for label '{}' added to {} agents", label, targets.len());
    Ok(Json(ApiResponse::success(LabelOutcome { label, targets })))
}
