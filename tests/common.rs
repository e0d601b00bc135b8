// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides common database, auth, and user creation helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(dead_code, clippy::wildcard_in_or_patterns)]

//! Shared test utilities for `quitline_server`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use std::env;
use std::sync::{Arc, Once};

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use quitline_server::auth::{hash_password, AuthManager};
use quitline_server::config::ServerConfig;
use quitline_server::database::users::User;
use quitline_server::database::{Database, SubscriptionPackage};
use quitline_server::permissions::UserRole;
use quitline_server::resources::ServerResources;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        // TEST_LOG environment variable controls test logging level
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN, // Default to WARN for quiet tests
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test database setup (in-memory, migrated)
pub async fn create_test_database() -> Result<Database> {
    init_test_logging();
    let database = Database::new("sqlite::memory:").await?;
    Ok(database)
}

/// Create test authentication manager
pub fn create_test_auth_manager() -> AuthManager {
    AuthManager::new("test-jwt-secret", 24)
}

/// Standard server resources setup for route tests
pub async fn create_test_server_resources() -> Result<Arc<ServerResources>> {
    let database = create_test_database().await?;
    let auth_manager = create_test_auth_manager();
    let config = ServerConfig::default();
    Ok(Arc::new(ServerResources::new(
        database,
        auth_manager,
        config,
    )))
}

async fn create_user_with_role(database: &Database, role: UserRole) -> Result<User> {
    let password_hash = hash_password("password123")?;
    let mut user = User::new(
        format!("{}-{}@example.com", role.as_str(), Uuid::new_v4()),
        password_hash,
        Some(format!("Test {}", role.as_str())),
    );
    user.role = role;

    database.users().create(&user).await?;
    Ok(user)
}

/// Create a standard test user
pub async fn create_test_user(database: &Database) -> Result<User> {
    create_user_with_role(database, UserRole::User).await
}

/// Create a test coach
pub async fn create_test_coach(database: &Database) -> Result<User> {
    create_user_with_role(database, UserRole::Coach).await
}

/// Create a test admin
pub async fn create_test_admin(database: &Database) -> Result<User> {
    create_user_with_role(database, UserRole::Admin).await
}

/// Grant a user an active Plus subscription so the access gate passes
pub async fn grant_plus_subscription(database: &Database, user_id: Uuid) -> Result<()> {
    database
        .subscriptions()
        .create(user_id, SubscriptionPackage::Plus, None)
        .await?;
    Ok(())
}

/// Grant a subscription with explicit package and expiry
pub async fn grant_subscription(
    database: &Database,
    user_id: Uuid,
    package: SubscriptionPackage,
    end_date: Option<DateTime<Utc>>,
) -> Result<()> {
    database
        .subscriptions()
        .create(user_id, package, end_date)
        .await?;
    Ok(())
}

/// Bearer header value for a user
pub fn bearer_token(resources: &ServerResources, user: &User) -> String {
    let token = resources.auth_manager.generate_token(user).unwrap();
    format!("Bearer {token}")
}
