// ABOUTME: HTTP server assembly: merges all domain routers behind shared state
// ABOUTME: Applies tracing and CORS layers and binds the listening socket
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;
use crate::routes::{
    AuthRoutes, FeedbackRoutes, HealthRoutes, PlanRoutes, RequestRoutes, SmokingRoutes,
    SubscriptionRoutes,
};

/// Build the complete application router
#[must_use]
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let cors = match resources.config.cors_origin.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                tracing::warn!("Invalid CORS_ORIGIN '{origin}'; falling back to permissive CORS");
                CorsLayer::permissive()
            }
        },
        None => CorsLayer::permissive(),
    };

    Router::new()
        .merge(HealthRoutes::routes())
        .merge(AuthRoutes::routes(resources.clone()))
        .merge(RequestRoutes::routes(resources.clone()))
        .merge(PlanRoutes::routes(resources.clone()))
        .merge(FeedbackRoutes::routes(resources.clone()))
        .merge(SubscriptionRoutes::routes(resources.clone()))
        .merge(SmokingRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind and serve the HTTP API until the process is stopped
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or the server loop
/// fails.
pub async fn run_http_server(resources: Arc<ServerResources>) -> AppResult<()> {
    let port = resources.config.http_port;
    let router = build_router(resources);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind port {port}: {e}")))?;

    info!("Quitline server listening on port {port}");

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::internal(format!("HTTP server failed: {e}")))
}
