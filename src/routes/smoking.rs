// ABOUTME: Route handlers for smoking profiles and derived quit-progress numbers
// ABOUTME: Users maintain their own profile and read the savings summary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthResult;
use crate::database::smoking::{SavingsSummary, SmokingProfile, UpsertProfileInput};
use crate::errors::AppError;
use crate::resources::ServerResources;

/// A profile together with its derived savings numbers
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// The stored profile
    pub profile: SmokingProfile,
    /// Derived savings at the time of the request
    pub savings: SavingsSummary,
}

/// Smoking profile routes
pub struct SmokingRoutes;

impl SmokingRoutes {
    /// Create all smoking profile routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/smoking-profile", put(Self::handle_upsert))
            .route("/api/smoking-profile", get(Self::handle_get))
            .with_state(resources)
    }

    /// Extract and authenticate the caller from the authorization header
    fn authenticate(
        headers: &HeaderMap,
        resources: &Arc<ServerResources>,
    ) -> Result<AuthResult, AppError> {
        let auth_value = headers.get("authorization").and_then(|h| h.to_str().ok());
        resources.auth_manager.authenticate_request(auth_value)
    }

    /// Handle PUT /api/smoking-profile - create or replace the caller's profile
    async fn handle_upsert(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<UpsertProfileInput>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let profile = resources
            .database
            .smoking_profiles()
            .upsert(auth.user_id, &body)
            .await?;

        let savings = profile.savings_at(Utc::now().date_naive());
        let response = ProfileResponse { profile, savings };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/smoking-profile - caller's profile and savings
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let profile = resources
            .database
            .smoking_profiles()
            .get(auth.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Smoking profile"))?;

        let savings = profile.savings_at(Utc::now().date_naive());
        let response = ProfileResponse { profile, savings };
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
