// ABOUTME: Route handlers for coach feedback: submission, duplicate check, moderation
// ABOUTME: Normalizes coach/plan references that arrive as plain ids or embedded objects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthResult;
use crate::database::feedback::{Feedback, FeedbackStatus};
use crate::errors::{AppError, ErrorCode};
use crate::models::Reference;
use crate::resources::ServerResources;

/// Request body for submitting feedback
///
/// `coach_id` and `plan_id` accept either plain id strings or embedded
/// objects with an `id` field; both are normalized before use.
#[derive(Debug, Deserialize)]
pub struct CreateFeedbackBody {
    /// Rated coach
    pub coach_id: Reference,
    /// Plan the rating refers to, if any
    pub plan_id: Option<Reference>,
    /// Rating in [1, 5], half increments
    pub rating: f64,
    /// Free-text comment
    pub content: String,
}

/// Request body for the duplicate-rating check
#[derive(Debug, Deserialize)]
pub struct CheckFeedbackBody {
    /// Coach to check against
    pub coach_id: Reference,
    /// Plan to check against, if any
    pub plan_id: Option<Reference>,
}

/// Response for the duplicate-rating check
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckFeedbackResponse {
    /// Whether the caller has already rated this coach (and plan)
    pub has_rated: bool,
}

/// Request body for moderation
#[derive(Debug, Deserialize)]
pub struct SetFeedbackStatusBody {
    /// New moderation status
    pub status: FeedbackStatus,
}

/// Response wrapper for feedback listings
#[derive(Debug, Serialize, Deserialize)]
pub struct ListFeedbackResponse {
    /// Matching entries, newest first
    pub feedback: Vec<Feedback>,
    /// Total count
    pub total: usize,
}

/// Feedback routes
pub struct FeedbackRoutes;

impl FeedbackRoutes {
    /// Create all feedback routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/feedback", post(Self::handle_create))
            .route("/api/feedback/check", post(Self::handle_check))
            .route("/api/feedback/:id/status", put(Self::handle_set_status))
            .route("/api/coaches/:id/feedback", get(Self::handle_list_for_coach))
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

    /// Handle POST /api/feedback - submit a rating
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<CreateFeedbackBody>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;

        let coach_id = body.coach_id.id();
        let plan_id = body.plan_id.as_ref().map(Reference::id);

        let feedback = resources
            .database
            .feedback()
            .create(auth.user_id, coach_id, plan_id, body.rating, &body.content)
            .await?;

        Ok((StatusCode::CREATED, Json(feedback)).into_response())
    }

    /// Handle POST /api/feedback/check - has the caller already rated?
    ///
    /// A storage failure defaults to "not yet rated" so the check never
    /// blocks submission UI; the error is logged instead.
    async fn handle_check(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<CheckFeedbackBody>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;

        let coach_id = body.coach_id.id();
        let plan_id = body.plan_id.as_ref().map(Reference::id);

        let has_rated = match resources
            .database
            .feedback()
            .has_rated(auth.user_id, coach_id, plan_id)
            .await
        {
            Ok(rated) => rated,
            Err(e) => {
                tracing::warn!("Feedback check failed for {}; defaulting to not rated: {e}", auth.user_id);
                false
            }
        };

        let response = CheckFeedbackResponse { has_rated };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/coaches/:id/feedback
    ///
    /// End users see only approved entries; the coach themselves and
    /// admins see every status.
    async fn handle_list_for_coach(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(coach_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.feedback();

        let feedback = if auth.user_id == coach_id || auth.role.is_admin() {
            manager.list_all_for_coach(coach_id).await?
        } else {
            manager.list_approved_for_coach(coach_id).await?
        };

        let response = ListFeedbackResponse {
            total: feedback.len(),
            feedback,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle PUT /api/feedback/:id/status - admin moderation
    async fn handle_set_status(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(feedback_id): Path<Uuid>,
        Json(body): Json<SetFeedbackStatusBody>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        if !auth.role.is_admin() {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Admin role required for this operation",
            ));
        }

        resources
            .database
            .feedback()
            .set_status(feedback_id, body.status)
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
