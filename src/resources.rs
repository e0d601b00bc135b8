// ABOUTME: Shared server state handed to every route handler
// ABOUTME: Bundles the database, auth manager, and configuration behind one Arc
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database::Database;

/// Dependencies shared by all route handlers
///
/// Constructed once at startup and cloned into each router as
/// `Arc<ServerResources>`.
pub struct ServerResources {
    /// Database connection pool and managers
    pub database: Database,
    /// Session token issuing and validation
    pub auth_manager: AuthManager,
    /// Loaded server configuration
    pub config: ServerConfig,
}

impl ServerResources {
    /// Bundle the shared server dependencies
    #[must_use]
    pub fn new(database: Database, auth_manager: AuthManager, config: ServerConfig) -> Self {
        Self {
            database,
            auth_manager,
            config,
        }
    }
}
