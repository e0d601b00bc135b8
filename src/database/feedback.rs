// ABOUTME: Database operations for user-to-coach feedback with moderation statuses
// ABOUTME: Enforces one rating per (user, coach, plan) tuple at the store level
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};

/// Feedback type recorded on every user-to-coach rating
pub const FEEDBACK_TYPE_USER_TO_COACH: &str = "user_to_coach";

/// Moderation status of a feedback entry
///
/// End users see only `approved` entries; a coach sees every status of
/// feedback addressed to them; admins moderate all of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    /// Submitted and waiting for moderation
    #[default]
    Pending,
    /// Approved and publicly visible
    Approved,
    /// Hidden by an admin
    Hidden,
}

impl FeedbackStatus {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Hidden => "hidden",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => Self::Approved,
            "hidden" => Self::Hidden,
            _ => Self::Pending,
        }
    }
}

/// A user's rating of a coach, optionally tied to a completed plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    /// Unique identifier
    pub id: Uuid,
    /// Rating author
    pub user_id: Uuid,
    /// Rated coach
    pub coach_id: Uuid,
    /// Plan the rating refers to, if any
    pub plan_id: Option<Uuid>,
    /// Feedback direction; currently always `user_to_coach`
    pub feedback_type: String,
    /// Rating in [1.0, 5.0], half increments
    pub rating: f64,
    /// Free-text comment
    pub content: String,
    /// Moderation status
    pub status: FeedbackStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Validate a rating value: within [1, 5] in half increments
fn validate_rating(rating: f64) -> AppResult<()> {
    if !(1.0..=5.0).contains(&rating) {
        return Err(AppError::invalid_input(
            "Rating must be between 1 and 5",
        ));
    }
    let doubled = rating * 2.0;
    if (doubled - doubled.round()).abs() > f64::EPSILON {
        return Err(AppError::invalid_input(
            "Rating must use half-star increments",
        ));
    }
    Ok(())
}

fn row_to_feedback(row: &SqliteRow) -> AppResult<Feedback> {
    let id: String = row
        .try_get("id")
        .map_err(|e| AppError::database(format!("Failed to get id: {e}")))?;
    let user_id: String = row
        .try_get("user_id")
        .map_err(|e| AppError::database(format!("Failed to get user_id: {e}")))?;
    let coach_id: String = row
        .try_get("coach_id")
        .map_err(|e| AppError::database(format!("Failed to get coach_id: {e}")))?;
    let plan_id: Option<String> = row
        .try_get("plan_id")
        .map_err(|e| AppError::database(format!("Failed to get plan_id: {e}")))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| AppError::database(format!("Failed to get status: {e}")))?;

    Ok(Feedback {
        id: Uuid::parse_str(&id)?,
        user_id: Uuid::parse_str(&user_id)?,
        coach_id: Uuid::parse_str(&coach_id)?,
        plan_id: plan_id.map(|p| Uuid::parse_str(&p)).transpose()?,
        feedback_type: row
            .try_get("feedback_type")
            .map_err(|e| AppError::database(format!("Failed to get feedback_type: {e}")))?,
        rating: row
            .try_get("rating")
            .map_err(|e| AppError::database(format!("Failed to get rating: {e}")))?,
        content: row
            .try_get("content")
            .map_err(|e| AppError::database(format!("Failed to get content: {e}")))?,
        status: FeedbackStatus::parse(&status),
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::database(format!("Failed to get created_at: {e}")))?,
    })
}

const FEEDBACK_COLUMNS: &str =
    "id, user_id, coach_id, plan_id, feedback_type, rating, content, status, created_at";

/// Feedback database operations manager
pub struct FeedbackManager {
    pool: SqlitePool,
}

impl FeedbackManager {
    /// Create a new feedback manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether the user has already rated this coach (and plan, when one
    /// is supplied)
    ///
    /// With no plan supplied the check is coach-level: any existing
    /// `user_to_coach` entry for the coach counts. With a plan supplied
    /// the entry's plan must match it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn has_rated(
        &self,
        user_id: Uuid,
        coach_id: Uuid,
        plan_id: Option<Uuid>,
    ) -> AppResult<bool> {
        let row = match plan_id {
            Some(plan_id) => {
                sqlx::query(
                    r"
                    SELECT COUNT(*) AS count FROM feedback
                    WHERE user_id = $1 AND coach_id = $2 AND feedback_type = $3
                      AND plan_id = $4
                    ",
                )
                .bind(user_id.to_string())
                .bind(coach_id.to_string())
                .bind(FEEDBACK_TYPE_USER_TO_COACH)
                .bind(plan_id.to_string())
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r"
                    SELECT COUNT(*) AS count FROM feedback
                    WHERE user_id = $1 AND coach_id = $2 AND feedback_type = $3
                    ",
                )
                .bind(user_id.to_string())
                .bind(coach_id.to_string())
                .bind(FEEDBACK_TYPE_USER_TO_COACH)
                .fetch_one(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| AppError::database(format!("Failed to get count: {e}")))?;
        Ok(count > 0)
    }

    /// Submit a new rating
    ///
    /// Validation (rating range, non-empty content) and the duplicate
    /// check both run before the insert; a duplicate is a conflict, not a
    /// silent overwrite.
    ///
    /// # Errors
    ///
    /// `InvalidInput`/`MissingRequiredField` for bad values,
    /// `InvalidState` for duplicates, database errors otherwise.
    pub async fn create(
        &self,
        user_id: Uuid,
        coach_id: Uuid,
        plan_id: Option<Uuid>,
        rating: f64,
        content: &str,
    ) -> AppResult<Feedback> {
        validate_rating(rating)?;
        if content.trim().is_empty() {
            return Err(AppError::new(
                ErrorCode::MissingRequiredField,
                "Field 'content' is required",
            ));
        }

        if self.has_rated(user_id, coach_id, plan_id).await? {
            return Err(AppError::invalid_state(
                "Feedback already submitted for this coach and plan",
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO feedback
                (id, user_id, coach_id, plan_id, feedback_type, rating, content, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8)
            ",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(coach_id.to_string())
        .bind(plan_id.map(|p| p.to_string()))
        .bind(FEEDBACK_TYPE_USER_TO_COACH)
        .bind(rating)
        .bind(content.trim())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create feedback: {e}")))?;

        Ok(Feedback {
            id,
            user_id,
            coach_id,
            plan_id,
            feedback_type: FEEDBACK_TYPE_USER_TO_COACH.to_owned(),
            rating,
            content: content.trim().to_owned(),
            status: FeedbackStatus::Pending,
            created_at: now,
        })
    }

    /// List a coach's approved feedback (the end-user view)
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_approved_for_coach(&self, coach_id: Uuid) -> AppResult<Vec<Feedback>> {
        let rows = sqlx::query(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback \
             WHERE coach_id = $1 AND status = 'approved' \
             ORDER BY created_at DESC"
        ))
        .bind(coach_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(row_to_feedback).collect()
    }

    /// List every status of a coach's feedback (coach/admin view)
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_all_for_coach(&self, coach_id: Uuid) -> AppResult<Vec<Feedback>> {
        let rows = sqlx::query(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback \
             WHERE coach_id = $1 ORDER BY created_at DESC"
        ))
        .bind(coach_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(row_to_feedback).collect()
    }

    /// Set the moderation status of an entry (admin operation)
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` when the entry does not exist
    pub async fn set_status(&self, feedback_id: Uuid, status: FeedbackStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE feedback SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(feedback_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update feedback status: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Feedback"));
        }
        Ok(())
    }
}
