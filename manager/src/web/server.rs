// File: manager/src/web/server.rs
use crate::web::{handlers, AppState};
use anyhow::{anyhow, Result};
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub async fn start_web_server(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // === OVERVIEW ROUTES ===
        .route("/api/targets", get(handlers::list_targets))
        .route("/api/overview", get(handlers::get_overview))
        .route("/api/status", get(handlers::get_all_status))
        // === WINDOW ROUTES ===
        .route(
            "/api/targets/{key}/windows",
            get(handlers::list_windows).post(handlers::add_window),
        )
        .route(
            "/api/targets/{key}/windows/delete",
            post(handlers::delete_windows),
        )
        .route(
            "/api/targets/{key}/windows/{id}",
            delete(handlers::delete_window),
        )
        .route(
            "/api/targets/{key}/recurring",
            get(handlers::list_recurring).post(handlers::add_recurring),
        )
        .route(
            "/api/targets/{key}/recurring/{id}",
            delete(handlers::delete_recurring),
        )
        .route(
            "/api/targets/{key}/status",
            get(handlers::get_target_status),
        )
        .route(
            "/api/labels/{label}/windows",
            post(handlers::add_label_window),
        )
        .route(
            "/api/definitions",
            get(handlers::list_stored_definitions),
        )
        .route(
            "/api/definitions/{key}",
            delete(handlers::forget_definitions),
        )
        // === PROVISIONING ROUTES ===
        .route(
            "/api/targets/{key}/provisioning",
            get(handlers::check_target_provisioning),
        )
        .route(
            "/api/provisioning/check",
            post(handlers::check_request_provisioning),
        )
        // === AGENT ROUTES ===
        .route("/api/agents", get(handlers::list_agents))
        .route(
            "/api/agents/{name}/executors",
            post(handlers::report_executors),
        )
        .route("/api/agents/{name}/connect", post(handlers::connect_agent))
        // Add middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
