// Target listing and status endpoints

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

use super::common::{known_target, maintenance_error, ApiResponse, ApiResult};
use crate::target::Target;
use crate::web::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    pub key: String,
    pub kind: String,
    pub name: String,
    pub windows: usize,
    pub recurring: usize,
    pub active: bool,
}

/// A durable definitions record.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub key: String,
    /// False for records left behind by removed targets
    pub known: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForgetOutcome {
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    /// Targets with a window active now
    pub active: usize,
    /// Targets with any scheduled window
    pub total: usize,
}

pub async fn list_targets(State(state): State<AppState>) -> ApiResult<Vec<TargetSummary>> {
    let now = state.store.now();
    let mut summaries = Vec::new();

    for target in state.inventory.targets() {
        let definitions = state
            .store
            .definitions(&target)
            .await
            .map_err(maintenance_error)?;
        summaries.push(TargetSummary {
            key: target.key(),
            kind: target.kind().to_string(),
            name: target.name().to_string(),
            windows: definitions.scheduled().len(),
            recurring: definitions.recurring().len(),
            active: definitions.active(now).is_some(),
        });
    }

    Ok(Json(ApiResponse::success(summaries)))
}

pub async fn get_overview(State(state): State<AppState>) -> ApiResult<Overview> {
    let mut overview = Overview {
        active: 0,
        total: 0,
    };
    for target in state.inventory.targets() {
        if state.store.has_windows(&target).await {
            overview.total += 1;
        }
        if state.store.has_active_windows(&target).await {
            overview.active += 1;
        }
    }
    Ok(Json(ApiResponse::success(overview)))
}

/// Window id to active flag across every target.
pub async fn get_all_status(
    State(state): State<AppState>,
) -> ApiResult<HashMap<String, bool>> {
    let mut status = HashMap::new();
    for target in state.inventory.targets() {
        status.extend(state.store.status(&target).await.map_err(maintenance_error)?);
    }
    Ok(Json(ApiResponse::success(status)))
}

pub async fn get_target_status(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<HashMap<String, bool>> {
    let target = known_target(&state, &key)?;
    let status = state.store.status(&target).await.map_err(maintenance_error)?;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn list_stored_definitions(
    State(state): State<AppState>,
) -> ApiResult<Vec<StoredRecord>> {
    let keys = state.store.stored_keys().await.map_err(maintenance_error)?;
    let records = keys
        .into_iter()
        .map(|key| StoredRecord {
            known: Target::parse_key(&key).is_ok_and(|t| state.store.target_exists(&t)),
            key,
        })
        .collect();
    Ok(Json(ApiResponse::success(records)))
}

/// Drop the stored definitions of a target, known to the host or not.
pub async fn forget_definitions(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<ForgetOutcome> {
    let target = Target::parse_key(&key).map_err(maintenance_error)?;
    state
        .store
        .forget_target(&target)
        .await
        .map_err(maintenance_error)?;
    Ok(Json(ApiResponse::success(ForgetOutcome { key: target.key() })))
}
