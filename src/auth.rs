// ABOUTME: Authentication and session management via bearer JWTs
// ABOUTME: Issues and validates HS256 tokens carrying the user id and role
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::users::User;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::permissions::UserRole;

/// JWT claims carried by every session token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id
    pub sub: String,
    /// Email at issue time (informational)
    pub email: String,
    /// Actor role at issue time
    pub role: UserRole,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

/// Outcome of a successful authentication
#[derive(Debug, Clone, Copy)]
pub struct AuthResult {
    /// Authenticated user id
    pub user_id: Uuid,
    /// Role carried in the validated token
    pub role: UserRole,
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl AuthManager {
    /// Create a manager signing with `secret`, issuing tokens valid for
    /// `expiry_hours`
    #[must_use]
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Generate a session token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if token encoding fails
    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))
    }

    /// Validate a raw token string and return the authenticated identity
    ///
    /// # Errors
    ///
    /// Returns `AuthExpired` for expired tokens and `AuthInvalid` for
    /// anything else that fails validation.
    pub fn validate_token(&self, token: &str) -> AppResult<AuthResult> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default()).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::new(ErrorCode::AuthExpired, "Token has expired")
                }
                _ => AppError::auth_invalid(format!("Invalid token: {e}")),
            },
        )?;

        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|e| AppError::auth_invalid(format!("Invalid token subject: {e}")))?;

        Ok(AuthResult {
            user_id,
            role: data.claims.role,
        })
    }

    /// Authenticate a request from its `Authorization` header value
    ///
    /// Accepts `Bearer <token>`; anything else is rejected.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` when no header is supplied, `AuthInvalid`
    /// or `AuthExpired` when validation fails.
    pub fn authenticate_request(&self, auth_header: Option<&str>) -> AppResult<AuthResult> {
        let header = auth_header.ok_or_else(|| {
            AppError::new(ErrorCode::AuthRequired, "Missing authorization header")
        })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::auth_invalid("Authorization header must use the Bearer scheme")
        })?;

        self.validate_token(token)
    }
}

/// Hash a password for storage
///
/// # Errors
///
/// Returns an error if bcrypt hashing fails
pub fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
}

/// Verify a candidate password against a stored hash
///
/// # Errors
///
/// Returns an error if the hash is malformed
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    bcrypt::verify(password, hash)
        .map_err(|e| AppError::internal(format!("Failed to verify password: {e}")))
}
