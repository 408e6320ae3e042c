// Common types and utilities for API handlers

use axum::{http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::MaintenanceError;
use crate::target::Target;
use crate::web::AppState;
use crate::window::MaintenanceWindow;

// Helper type for API responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::error(message.into())))
}

/// Map library errors onto HTTP status codes.
pub fn maintenance_error(e: MaintenanceError) -> ApiError {
    let status = match &e {
        _ if e.is_invalid_input() => StatusCode::BAD_REQUEST,
        MaintenanceError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => {
            error!("Maintenance operation failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, e.to_string())
}

/// Resolve a path key to a target known to the inventory.
pub fn known_target(state: &AppState, key: &str) -> Result<Target, ApiError> {
    let target = Target::parse_key(key).map_err(maintenance_error)?;
    if !state.store.target_exists(&target) {
        return Err(maintenance_error(MaintenanceError::target_not_found(key)));
    }
    Ok(target)
}

/// Body of a one-off window as entered by an operator.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowRequest {
    pub start: String,
    pub end: String,
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

impl WindowRequest {
    pub fn to_window(&self, tz: &Tz) -> Result<MaintenanceWindow, MaintenanceError> {
        let mut builder = MaintenanceWindow::parse_input(&self.start, &self.end, tz)?
            .reason(self.reason.clone())
            .take_online(self.take_online)
            .keep_up_when_active(self.keep_up_when_active);
        if let Some(max_wait) = &self.max_wait_time {
            builder = builder.max_wait(max_wait);
        }
        if let Some(created_by) = &self.created_by {
            builder = builder.created_by(created_by.clone());
        }
        Ok(builder.build())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowView {
    pub id: String,
    pub start: String,
    pub end: String,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub reason: String,
    pub take_online: bool,
    pub keep_up_when_active: bool,
    pub max_wait_minutes: i64,
    pub created_by: String,
    pub active: bool,
}

impl WindowView {
    pub fn new(window: &MaintenanceWindow, tz: &Tz, now: DateTime<Utc>) -> Self {
        Self {
            id: window.id().to_string(),
            start: window.display_start(tz),
            end: window.display_end(tz),
            start_utc: window.start(),
            end_utc: window.end(),
            reason: window.reason().to_string(),
            take_online: window.take_online(),
            keep_up_when_active: window.keep_up_when_active(),
            max_wait_minutes: window.max_wait_minutes(),
            created_by: window.created_by().to_string(),
            active: window.is_scheduled_at(now),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddOutcome {
    pub added: bool,
    pub id: String,
}
