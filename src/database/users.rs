// ABOUTME: Database operations for user accounts
// ABOUTME: Handles creation, lookup by email, and role persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::permissions::UserRole;

/// A registered account: member, coach, or admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Login email (unique)
    pub email: String,
    /// bcrypt password hash
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name shown to other members
    pub display_name: Option<String>,
    /// Actor role
    pub role: UserRole,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp
    pub last_active: DateTime<Utc>,
}

impl User {
    /// Create a new account record with the default `user` role
    #[must_use]
    pub fn new(email: String, password_hash: String, display_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            display_name,
            role: UserRole::User,
            created_at: now,
            last_active: now,
        }
    }
}

fn row_to_user(row: &SqliteRow) -> AppResult<User> {
    let id: String = row
        .try_get("id")
        .map_err(|e| AppError::database(format!("Failed to get id: {e}")))?;
    let role: String = row
        .try_get("role")
        .map_err(|e| AppError::database(format!("Failed to get role: {e}")))?;

    Ok(User {
        id: Uuid::parse_str(&id)?,
        email: row
            .try_get("email")
            .map_err(|e| AppError::database(format!("Failed to get email: {e}")))?,
        password_hash: row
            .try_get("password_hash")
            .map_err(|e| AppError::database(format!("Failed to get password_hash: {e}")))?,
        display_name: row
            .try_get("display_name")
            .map_err(|e| AppError::database(format!("Failed to get display_name: {e}")))?,
        role: UserRole::parse(&role),
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::database(format!("Failed to get created_at: {e}")))?,
        last_active: row
            .try_get("last_active")
            .map_err(|e| AppError::database(format!("Failed to get last_active: {e}")))?,
    })
}

/// User account database operations manager
pub struct UserManager {
    pool: SqlitePool,
}

impl UserManager {
    /// Create a new user manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new user
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the email is already registered, or a
    /// database error for other failures.
    pub async fn create(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r"
            INSERT INTO users (id, email, password_hash, display_name, role, created_at, last_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.last_active)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                AppError::invalid_state(format!("Email {} is already registered", user.email)),
            ),
            Err(e) => Err(AppError::database(format!("Failed to create user: {e}"))),
        }
    }

    /// Get a user by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, email, password_hash, display_name, role, created_at, last_active
            FROM users
            WHERE id = $1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Get a user by login email
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, email, password_hash, display_name, role, created_at, last_active
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Set a user's role
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn set_role(&self, user_id: Uuid, role: UserRole) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
            .bind(role.as_str())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to set role: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Record account activity
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn touch_last_active(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_active = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update last_active: {e}")))?;

        Ok(())
    }

    /// List all users with the coach role
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_coaches(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            r"
            SELECT id, email, password_hash, display_name, role, created_at, last_active
            FROM users
            WHERE role = 'coach'
            ORDER BY created_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(row_to_user).collect()
    }
}
