// ABOUTME: Core database management with an embedded migration system for SQLite
// ABOUTME: Exposes per-aggregate managers for users, requests, plans, feedback, and subscriptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

/// Feedback storage and the duplicate-rating gate
pub mod feedback;
/// Plan storage derived from approved quit requests
pub mod plans;
/// Quit request storage and the status transition engine
pub mod requests;
/// Smoking profile storage and savings arithmetic
pub mod smoking;
/// Stage storage within plans
pub mod stages;
/// Subscription storage and the coach access gate
pub mod subscriptions;
/// Task storage within stages
pub mod tasks;
/// User account management
pub mod users;

pub use feedback::{Feedback, FeedbackManager, FeedbackStatus};
pub use plans::{Plan, PlanManager, PlanStatus};
pub use requests::{CreateRequestInput, QuitRequest, QuitRequestManager, RequestStatus};
pub use smoking::{SavingsSummary, SmokingProfile, SmokingProfileManager};
pub use stages::{Stage, StageManager};
pub use subscriptions::{Subscription, SubscriptionManager, SubscriptionPackage};
pub use tasks::{Task, TaskManager};
pub use users::{User, UserManager};

use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::info;

use crate::errors::{AppError, AppResult};

/// Database connection pool with embedded migrations
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Database URL is invalid or malformed
    /// - Database connection fails
    /// - `SQLite` file creation fails
    /// - Migration process fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:") {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        let pool = SqlitePool::connect(&connection_options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Run all database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any migration fails or the connection is lost
    pub async fn migrate(&self) -> AppResult<()> {
        info!("Running database migrations...");

        // Migrations are embedded at compile time from ./migrations so they
        // are available regardless of working directory
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Get the user account manager
    #[must_use]
    pub fn users(&self) -> UserManager {
        UserManager::new(self.pool.clone())
    }

    /// Get the quit request manager
    #[must_use]
    pub fn requests(&self) -> QuitRequestManager {
        QuitRequestManager::new(self.pool.clone())
    }

    /// Get the plan manager
    #[must_use]
    pub fn plans(&self) -> PlanManager {
        PlanManager::new(self.pool.clone())
    }

    /// Get the stage manager
    #[must_use]
    pub fn stages(&self) -> StageManager {
        StageManager::new(self.pool.clone())
    }

    /// Get the task manager
    #[must_use]
    pub fn tasks(&self) -> TaskManager {
        TaskManager::new(self.pool.clone())
    }

    /// Get the feedback manager
    #[must_use]
    pub fn feedback(&self) -> FeedbackManager {
        FeedbackManager::new(self.pool.clone())
    }

    /// Get the subscription manager
    #[must_use]
    pub fn subscriptions(&self) -> SubscriptionManager {
        SubscriptionManager::new(self.pool.clone())
    }

    /// Get the smoking profile manager
    #[must_use]
    pub fn smoking_profiles(&self) -> SmokingProfileManager {
        SmokingProfileManager::new(self.pool.clone())
    }
}
