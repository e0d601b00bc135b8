// ABOUTME: Route handlers for subscriptions and the coach access gate
// ABOUTME: Users inspect their own tier; admins grant and revoke packages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthResult;
use crate::database::subscriptions::{Subscription, SubscriptionPackage};
use crate::errors::{AppError, ErrorCode};
use crate::resources::ServerResources;

/// Request body for granting a subscription
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionBody {
    /// User receiving the package
    pub user_id: Uuid,
    /// Package name; parsed case-insensitively
    pub package: String,
    /// Optional expiry
    pub end_date: Option<DateTime<Utc>>,
}

/// A user's subscription together with the gate verdict
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionStatusResponse {
    /// The most recent subscription record, if any
    pub subscription: Option<Subscription>,
    /// Whether coach features are currently accessible
    pub can_access_coach: bool,
}

/// Subscription routes
pub struct SubscriptionRoutes;

impl SubscriptionRoutes {
    /// Create all subscription routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/subscriptions/me", get(Self::handle_me))
            .route("/api/subscriptions", post(Self::handle_create))
            .route(
                "/api/subscriptions/:id/deactivate",
                post(Self::handle_deactivate),
            )
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

    /// Handle GET /api/subscriptions/me - own subscription plus gate verdict
    async fn handle_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let now = Utc::now();

        let subscription = resources
            .database
            .subscriptions()
            .get_for_user(auth.user_id)
            .await?;
        let can_access_coach = Subscription::can_access_coach(subscription.as_ref(), now);

        let response = SubscriptionStatusResponse {
            subscription,
            can_access_coach,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle POST /api/subscriptions - admin grants a package
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(body): Json<CreateSubscriptionBody>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        if !auth.role.is_admin() {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Admin role required for this operation",
            ));
        }

        let package = SubscriptionPackage::parse(&body.package);
        let subscription = resources
            .database
            .subscriptions()
            .create(body.user_id, package, body.end_date)
            .await?;

        Ok((StatusCode::CREATED, Json(subscription)).into_response())
    }

    /// Handle POST /api/subscriptions/:id/deactivate - admin revokes
    async fn handle_deactivate(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(subscription_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        if !auth.role.is_admin() {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Admin role required for this operation",
            ));
        }

        let deactivated = resources
            .database
            .subscriptions()
            .deactivate(subscription_id)
            .await?;
        if !deactivated {
            return Err(AppError::not_found("Subscription"));
        }
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
