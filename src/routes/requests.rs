// ABOUTME: Route handlers for quit-plan requests and their review workflow
// ABOUTME: Gates submission on the subscription tier and transitions on the assigned coach
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthResult;
use crate::database::requests::{CreateRequestInput, QuitRequest};
use crate::errors::{AppError, ErrorCode};
use crate::permissions::UserRole;
use crate::resources::ServerResources;
use crate::routes::auth::UserInfo;

/// Request body for submitting a quit-plan request
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    /// Coach the user wants to work with
    pub coach_id: Uuid,
    /// Short name for the quit attempt
    pub name: String,
    /// Why the user wants to quit
    pub reason: String,
    /// ISO-8601 calendar date the attempt starts
    pub start_date: String,
    /// ISO-8601 calendar date the user aims to be smoke-free
    pub target_quit_date: String,
}

impl From<CreateRequestBody> for CreateRequestInput {
    fn from(body: CreateRequestBody) -> Self {
        Self {
            name: body.name,
            reason: body.reason,
            start_date: body.start_date,
            target_quit_date: body.target_quit_date,
        }
    }
}

/// Request body for creating a plan from an approved request
#[derive(Debug, Deserialize)]
pub struct CreatePlanBody {
    /// Plan name
    pub name: String,
    /// Why the user wants to quit
    pub reason: String,
    /// ISO-8601 calendar date the plan starts
    pub start_date: String,
    /// ISO-8601 calendar date the user aims to be smoke-free
    pub target_quit_date: String,
}

impl From<CreatePlanBody> for CreateRequestInput {
    fn from(body: CreatePlanBody) -> Self {
        Self {
            name: body.name,
            reason: body.reason,
            start_date: body.start_date,
            target_quit_date: body.target_quit_date,
        }
    }
}

/// Response wrapper for request listings
#[derive(Debug, Serialize, Deserialize)]
pub struct ListRequestsResponse {
    /// Matching requests, newest first
    pub requests: Vec<QuitRequest>,
    /// Total count
    pub total: usize,
}

/// Response wrapper for the coach directory
#[derive(Debug, Serialize, Deserialize)]
pub struct ListCoachesResponse {
    /// Available coaches
    pub coaches: Vec<UserInfo>,
}

/// Quit-plan request routes
pub struct RequestRoutes;

impl RequestRoutes {
    /// Create all request routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/requests", post(Self::handle_create))
            .route("/api/requests", get(Self::handle_list))
            .route("/api/requests/:id", get(Self::handle_get))
            .route("/api/requests/:id", delete(Self::handle_delete))
            .route("/api/requests/:id/approve", post(Self::handle_approve))
            .route("/api/requests/:id/reject", post(Self::handle_reject))
            .route("/api/requests/:id/plan", post(Self::handle_create_plan))
            .route("/api/coaches", get(Self::handle_list_coaches))
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

    /// Deny unless the caller passes the subscription access gate
    async fn ensure_coach_access(
        auth: &AuthResult,
        resources: &Arc<ServerResources>,
    ) -> Result<(), AppError> {
        let allowed = resources
            .database
            .subscriptions()
            .can_access_coach(auth.user_id, Utc::now())
            .await;
        if allowed {
            Ok(())
        } else {
            Err(AppError::new(
                ErrorCode::PermissionDenied,
                "An active Plus or Premium subscription is required for coach access",
            ))
        }
    }

    /// Handle POST /api/requests - submit a quit-plan request
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<CreateRequestBody>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        Self::ensure_coach_access(&auth, &resources).await?;

        let coach = resources
            .database
            .users()
            .get(body.coach_id)
            .await?
            .ok_or_else(|| AppError::not_found("Coach"))?;
        if !coach.role.is_coach() {
            return Err(AppError::invalid_input(format!(
                "User {} is not a coach",
                body.coach_id
            )));
        }

        let coach_id = body.coach_id;
        let input: CreateRequestInput = body.into();
        let request = resources
            .database
            .requests()
            .create(auth.user_id, coach_id, &input)
            .await?;

        Ok((StatusCode::CREATED, Json(request)).into_response())
    }

    /// Handle GET /api/requests - list the caller's requests
    ///
    /// Coaches see the requests assigned to them; everyone else sees the
    /// requests they submitted.
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.requests();

        let requests = match auth.role {
            UserRole::Coach => manager.list_for_coach(auth.user_id).await?,
            UserRole::User | UserRole::Admin => manager.list_for_user(auth.user_id).await?,
        };

        let response = ListRequestsResponse {
            total: requests.len(),
            requests,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/requests/:id
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(request_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let request = resources
            .database
            .requests()
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Quit request"))?;

        let participant = request.user_id == auth.user_id || request.coach_id == auth.user_id;
        if !participant && !auth.role.is_admin() {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Not a participant of this request",
            ));
        }

        Ok((StatusCode::OK, Json(request)).into_response())
    }

    /// Handle POST /api/requests/:id/approve - coach accepts the request
    async fn handle_approve(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(request_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let request = resources
            .database
            .requests()
            .approve(request_id, auth.user_id)
            .await?;
        Ok((StatusCode::OK, Json(request)).into_response())
    }

    /// Handle POST /api/requests/:id/reject - coach declines the request
    async fn handle_reject(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(request_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let request = resources
            .database
            .requests()
            .reject(request_id, auth.user_id)
            .await?;
        Ok((StatusCode::OK, Json(request)).into_response())
    }

    /// Handle POST /api/requests/:id/plan - create the plan from an
    /// approved request and advance it to `created`
    async fn handle_create_plan(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(request_id): Path<Uuid>,
        Json(body): Json<CreatePlanBody>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let input: CreateRequestInput = body.into();
        let plan = resources
            .database
            .plans()
            .create_from_request(request_id, auth.user_id, &input)
            .await?;
        Ok((StatusCode::CREATED, Json(plan)).into_response())
    }

    /// Handle DELETE /api/requests/:id - admin-only removal
    ///
    /// Request history is retained for users and coaches; only an admin
    /// may remove a record.
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(request_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        if !auth.role.is_admin() {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Admin role required for this operation",
            ));
        }

        let deleted = resources.database.requests().delete(request_id).await?;
        if !deleted {
            return Err(AppError::not_found("Quit request"));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle GET /api/coaches - browse coaches (access-gated)
    async fn handle_list_coaches(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        Self::ensure_coach_access(&auth, &resources).await?;

        let coaches = resources.database.users().list_coaches().await?;
        let response = ListCoachesResponse {
            coaches: coaches.into_iter().map(Into::into).collect(),
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}
