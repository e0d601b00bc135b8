// ABOUTME: Health check route handlers for monitoring and deployment probes
// ABOUTME: Reports service liveness and the running crate version
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

/// Health check response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the service responds
    pub status: &'static str,
    /// Running crate version
    pub version: &'static str,
}

/// Health routes
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health routes
    pub fn routes() -> Router {
        Router::new().route("/health", get(Self::handle_health))
    }

    async fn handle_health() -> Response {
        let body = HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}
