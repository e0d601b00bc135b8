// ABOUTME: Route handlers for registration, login, and session introspection
// ABOUTME: Issues bearer JWTs and exposes the admin role-management endpoint
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

use crate::auth::{hash_password, verify_password, AuthResult};
use crate::database::users::User;
use crate::errors::{AppError, ErrorCode};
use crate::permissions::UserRole;
use crate::resources::ServerResources;

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Login email
    pub email: String,
    /// Plaintext password, hashed before storage
    pub password: String,
    /// Optional display name
    pub display_name: Option<String>,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Plaintext password
    pub password: String,
}

/// Response for login and registration
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    /// Authenticated user
    pub user: UserInfo,
}

/// Public view of an account
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    /// User id
    pub id: String,
    /// Login email
    pub email: String,
    /// Display name
    pub display_name: Option<String>,
    /// Actor role
    pub role: UserRole,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            display_name: user.display_name,
            role: user.role,
        }
    }
}

/// Request body for the admin role update
#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    /// New role for the target user
    pub role: UserRole,
}

/// Authentication and account routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all auth routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/register", post(Self::handle_register))
            .route("/api/auth/login", post(Self::handle_login))
            .route("/api/auth/me", get(Self::handle_me))
            .route("/api/admin/users/:id/role", put(Self::handle_set_role))
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

    /// Handle POST /api/auth/register
    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<RegisterRequest>,
    ) -> Result<Response, AppError> {
        if body.email.trim().is_empty() {
            return Err(AppError::new(
                ErrorCode::MissingRequiredField,
                "Field 'email' is required",
            ));
        }
        if body.password.len() < 8 {
            return Err(AppError::invalid_input(
                "Password must be at least 8 characters",
            ));
        }

        let password_hash = hash_password(&body.password)?;
        let user = User::new(
            body.email.trim().to_lowercase(),
            password_hash,
            body.display_name,
        );

        resources.database.users().create(&user).await?;
        let token = resources.auth_manager.generate_token(&user)?;

        let response = LoginResponse {
            token,
            user: user.into(),
        };
        Ok((StatusCode::CREATED, Json(response)).into_response())
    }

    /// Handle POST /api/auth/login
    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<LoginRequest>,
    ) -> Result<Response, AppError> {
        let users = resources.database.users();
        let user = users
            .get_by_email(&body.email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::auth_invalid("Invalid email or password"))?;

        if !verify_password(&body.password, &user.password_hash)? {
            return Err(AppError::auth_invalid("Invalid email or password"));
        }

        users.touch_last_active(user.id).await?;
        let token = resources.auth_manager.generate_token(&user)?;

        let response = LoginResponse {
            token,
            user: user.into(),
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/auth/me
    async fn handle_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;

        let user = resources
            .database
            .users()
            .get(auth.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        Ok((StatusCode::OK, Json(UserInfo::from(user))).into_response())
    }

    /// Handle PUT /api/admin/users/:id/role - promote or demote an account
    async fn handle_set_role(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(user_id): Path<Uuid>,
        Json(body): Json<SetRoleRequest>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        if !auth.role.is_admin() {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Admin role required for this operation",
            ));
        }

        let updated = resources
            .database
            .users()
            .set_role(user_id, body.role)
            .await?;
        if !updated {
            return Err(AppError::not_found("User"));
        }

        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
