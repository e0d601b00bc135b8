// ABOUTME: Environment-based server configuration with sane defaults
// ABOUTME: Reads HTTP port, database URL, JWT settings, and CORS origin from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use std::env;

use crate::errors::{AppError, AppResult};

/// Default HTTP port when `HTTP_PORT` is unset
const DEFAULT_HTTP_PORT: u16 = 8081;

/// Default database URL when `DATABASE_URL` is unset
const DEFAULT_DATABASE_URL: &str = "sqlite:data/quitline.db";

/// Default JWT expiry in hours when `JWT_EXPIRY_HOURS` is unset
const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;

/// Server configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP server binds to
    pub http_port: u16,
    /// Database connection URL (SQLite)
    pub database_url: String,
    /// Secret used to sign and verify JWTs
    pub jwt_secret: String,
    /// Token lifetime in hours
    pub jwt_expiry_hours: i64,
    /// Allowed CORS origin; `None` permits any origin (development)
    pub cors_origin: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but unparseable
    /// (`HTTP_PORT`, `JWT_EXPIRY_HOURS`).
    pub fn from_env() -> AppResult<Self> {
        let http_port = match env::var("HTTP_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::config(format!("Invalid HTTP_PORT '{raw}': {e}")))?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using a development-only secret");
            "quitline-dev-secret".to_owned()
        });

        let jwt_expiry_hours = match env::var("JWT_EXPIRY_HOURS") {
            Ok(raw) => raw
                .parse::<i64>()
                .map_err(|e| AppError::config(format!("Invalid JWT_EXPIRY_HOURS '{raw}': {e}")))?,
            Err(_) => DEFAULT_JWT_EXPIRY_HOURS,
        };

        let cors_origin = env::var("CORS_ORIGIN").ok();

        Ok(Self {
            http_port,
            database_url,
            jwt_secret,
            jwt_expiry_hours,
            cors_origin,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            jwt_secret: "quitline-dev-secret".to_owned(),
            jwt_expiry_hours: DEFAULT_JWT_EXPIRY_HOURS,
            cors_origin: None,
        }
    }
}
