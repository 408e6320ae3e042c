// Cloud provisioning checks

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;

use super::common::{known_target, ApiResponse, ApiResult};
use crate::provisioning::ProvisionDecision;
use crate::web::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default)]
    pub label: Option<String>,
}

pub async fn check_target_provisioning(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<ProvisionDecision> {
    let target = known_target(&state, &key)?;
    Ok(Json(ApiResponse::success(
        state.gate.allow_provision(&target).await,
    )))
}

pub async fn check_request_provisioning(
    State(state): State<AppState>,
    Json(request): Json<ProvisionRequest>,
) -> ApiResult<ProvisionDecision> {
    let pools = state.inventory.pools();
    let decision = state
        .gate
        .allow_request(request.label.as_deref(), &pools)
        .await;
    Ok(Json(ApiResponse::success(decision)))
}
