// In-memory agent endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::info;

use super::common::{api_error, ApiResponse, ApiResult};
use crate::host::{HostResource, RetentionPolicy};
use crate::inventory::{AgentSnapshot, DispatchOutcome};
use crate::web::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct BusyReport {
    pub busy: usize,
}

pub async fn list_agents(State(state): State<AppState>) -> ApiResult<Vec<AgentSnapshot>> {
    Ok(Json(ApiResponse::success(
        state
            .inventory
            .agents()
            .iter()
            .map(|agent| agent.snapshot())
            .collect(),
    )))
}

pub async fn report_executors(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(report): Json<BusyReport>,
) -> ApiResult<DispatchOutcome> {
    let outcome = state
        .inventory
        .report_busy(&name, report.busy, &*state.retention)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Agent '{}' not found", name)))?;

    match outcome {
        DispatchOutcome::Refused { reason } => Err(api_error(StatusCode::CONFLICT, reason)),
        accepted => Ok(Json(ApiResponse::success(accepted))),
    }
}

/// Manual launch of an offline agent.
pub async fn connect_agent(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<AgentSnapshot> {
    let agent = state
        .inventory
        .agent(&name)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Agent '{}' not found", name)))?;

    if !state
        .retention
        .is_manual_launch_allowed(&*agent)
        .await
    {
        return Err(api_error(
            StatusCode::CONFLICT,
            format!("Agent '{}' is in maintenance", name),
        ));
    }

    agent.connect().await;
    info!("Agent {} launched manually", name);
    Ok(Json(ApiResponse::success(agent.snapshot())))
}
