// ABOUTME: Database operations for quit-plan requests and their status transitions
// ABOUTME: Enforces the pending/approved/rejected/created state machine with coach-gated moves
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};

/// Lifecycle status of a quit-plan request
///
/// Transitions are monotonic along `pending → approved → created`;
/// `rejected` is reachable only from `pending`. `rejected` and `created`
/// are terminal for the request — the plan lifecycle continues separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Submitted by the user, awaiting coach review
    #[default]
    Pending,
    /// Accepted by the assigned coach, awaiting plan creation
    Approved,
    /// Declined by the assigned coach (terminal)
    Rejected,
    /// A plan has been created from this request (terminal)
    Created,
}

impl RequestStatus {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Created => "created",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "created" => Self::Created,
            _ => Self::Pending,
        }
    }

    /// Whether moving from this status to `next` is a legal transition
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected) | (Self::Approved, Self::Created)
        )
    }

    /// Whether no further transitions are possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Created)
    }
}

/// A user's request for a coach-guided quit plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuitRequest {
    /// Unique identifier
    pub id: Uuid,
    /// Requesting user
    pub user_id: Uuid,
    /// Assigned coach; the only actor allowed to move the status
    pub coach_id: Uuid,
    /// Short name for the quit attempt
    pub name: String,
    /// Why the user wants to quit
    pub reason: String,
    /// When the attempt starts
    pub start_date: NaiveDate,
    /// Target date to be smoke-free
    pub target_quit_date: NaiveDate,
    /// Lifecycle status
    pub status: RequestStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a request (and when creating a plan from
/// an approved one — the same validation applies to both)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestInput {
    /// Short name for the quit attempt
    pub name: String,
    /// Why the user wants to quit
    pub reason: String,
    /// ISO-8601 calendar date the attempt starts
    pub start_date: String,
    /// ISO-8601 calendar date the user aims to be smoke-free
    pub target_quit_date: String,
}

impl CreateRequestInput {
    /// Validate all required fields before any write
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` for empty fields and `InvalidFormat`
    /// for unparseable dates; `InvalidInput` when the target precedes the
    /// start.
    pub fn validate(&self) -> AppResult<(NaiveDate, NaiveDate)> {
        for (field, value) in [
            ("name", &self.name),
            ("reason", &self.reason),
            ("start_date", &self.start_date),
            ("target_quit_date", &self.target_quit_date),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::new(
                    ErrorCode::MissingRequiredField,
                    format!("Field '{field}' is required"),
                ));
            }
        }

        let start = parse_date("start_date", &self.start_date)?;
        let target = parse_date("target_quit_date", &self.target_quit_date)?;

        if target < start {
            return Err(AppError::invalid_input(
                "target_quit_date must not precede start_date",
            ));
        }

        Ok((start, target))
    }
}

fn parse_date(field: &str, value: &str) -> AppResult<NaiveDate> {
    value.parse::<NaiveDate>().map_err(|e| {
        AppError::new(
            ErrorCode::InvalidFormat,
            format!("Field '{field}' is not a valid ISO-8601 date: {e}"),
        )
    })
}

fn row_to_request(row: &SqliteRow) -> AppResult<QuitRequest> {
    let id: String = row
        .try_get("id")
        .map_err(|e| AppError::database(format!("Failed to get id: {e}")))?;
    let user_id: String = row
        .try_get("user_id")
        .map_err(|e| AppError::database(format!("Failed to get user_id: {e}")))?;
    let coach_id: String = row
        .try_get("coach_id")
        .map_err(|e| AppError::database(format!("Failed to get coach_id: {e}")))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| AppError::database(format!("Failed to get status: {e}")))?;

    Ok(QuitRequest {
        id: Uuid::parse_str(&id)?,
        user_id: Uuid::parse_str(&user_id)?,
        coach_id: Uuid::parse_str(&coach_id)?,
        name: row
            .try_get("name")
            .map_err(|e| AppError::database(format!("Failed to get name: {e}")))?,
        reason: row
            .try_get("reason")
            .map_err(|e| AppError::database(format!("Failed to get reason: {e}")))?,
        start_date: row
            .try_get("start_date")
            .map_err(|e| AppError::database(format!("Failed to get start_date: {e}")))?,
        target_quit_date: row
            .try_get("target_quit_date")
            .map_err(|e| AppError::database(format!("Failed to get target_quit_date: {e}")))?,
        status: RequestStatus::parse(&status),
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::database(format!("Failed to get created_at: {e}")))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| AppError::database(format!("Failed to get updated_at: {e}")))?,
    })
}

const REQUEST_COLUMNS: &str = "id, user_id, coach_id, name, reason, start_date, \
                               target_quit_date, status, created_at, updated_at";

/// Quit request database operations manager
pub struct QuitRequestManager {
    pool: SqlitePool,
}

impl QuitRequestManager {
    /// Create a new quit request manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new request in `pending` status
    ///
    /// The caller is responsible for the subscription access gate; this
    /// method only persists.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any write if required fields are
    /// missing or malformed, or a database error on failure.
    pub async fn create(
        &self,
        user_id: Uuid,
        coach_id: Uuid,
        input: &CreateRequestInput,
    ) -> AppResult<QuitRequest> {
        let (start, target) = input.validate()?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO quit_requests
                (id, user_id, coach_id, name, reason, start_date, target_quit_date,
                 status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $8)
            ",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(coach_id.to_string())
        .bind(input.name.trim())
        .bind(input.reason.trim())
        .bind(start)
        .bind(target)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create quit request: {e}")))?;

        Ok(QuitRequest {
            id,
            user_id,
            coach_id,
            name: input.name.trim().to_owned(),
            reason: input.reason.trim().to_owned(),
            start_date: start,
            target_quit_date: target,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a request by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get(&self, request_id: Uuid) -> AppResult<Option<QuitRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM quit_requests WHERE id = $1"
        ))
        .bind(request_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        row.as_ref().map(row_to_request).transpose()
    }

    /// List a user's own requests, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<QuitRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM quit_requests WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(row_to_request).collect()
    }

    /// List requests assigned to a coach, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_for_coach(&self, coach_id: Uuid) -> AppResult<Vec<QuitRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM quit_requests WHERE coach_id = $1 ORDER BY created_at DESC"
        ))
        .bind(coach_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(row_to_request).collect()
    }

    /// Approve a pending request
    ///
    /// Valid only from `pending` and only for the assigned coach.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` for unknown ids, `PermissionDenied` for any
    /// actor other than the assigned coach, `InvalidState` when the
    /// request is not pending.
    pub async fn approve(&self, request_id: Uuid, actor: Uuid) -> AppResult<QuitRequest> {
        self.transition(request_id, actor, RequestStatus::Approved)
            .await
    }

    /// Reject a pending request (terminal)
    ///
    /// # Errors
    ///
    /// Same error surface as [`Self::approve`].
    pub async fn reject(&self, request_id: Uuid, actor: Uuid) -> AppResult<QuitRequest> {
        self.transition(request_id, actor, RequestStatus::Rejected)
            .await
    }

    /// Apply a coach-gated status transition
    ///
    /// The UPDATE is conditioned on the current status so that a
    /// concurrent transition loses cleanly with a conflict instead of
    /// silently overwriting.
    async fn transition(
        &self,
        request_id: Uuid,
        actor: Uuid,
        next: RequestStatus,
    ) -> AppResult<QuitRequest> {
        let mut request = self
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Quit request"))?;

        if request.coach_id != actor {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Only the assigned coach may update this request",
            ));
        }

        if !request.status.can_transition_to(next) {
            return Err(AppError::invalid_state(format!(
                "Cannot move request from '{}' to '{}'",
                request.status.as_str(),
                next.as_str()
            )));
        }

        let now = Utc::now();
        let result = sqlx::query(
            r"
            UPDATE quit_requests
            SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4
            ",
        )
        .bind(next.as_str())
        .bind(now)
        .bind(request_id.to_string())
        .bind(request.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update request status: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::invalid_state(
                "Request status changed concurrently; refetch and retry",
            ));
        }

        request.status = next;
        request.updated_at = now;
        Ok(request)
    }

    /// Delete a request (admin operation; history is otherwise retained)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn delete(&self, request_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM quit_requests WHERE id = $1")
            .bind(request_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete request: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
