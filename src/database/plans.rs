// ABOUTME: Database operations for coaching plans derived from approved quit requests
// ABOUTME: Creates plans atomically with the request's approved-to-created transition
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::database::requests::{CreateRequestInput, RequestStatus};
use crate::errors::{AppError, AppResult, ErrorCode};

/// Lifecycle status of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Created but not yet started
    #[default]
    Draft,
    /// In progress
    Active,
    /// Finished; feedback may be submitted
    Completed,
}

impl PlanStatus {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "completed" => Self::Completed,
            _ => Self::Draft,
        }
    }
}

/// A coaching plan created from an approved quit request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique identifier
    pub id: Uuid,
    /// Originating request (one plan per request)
    pub request_id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Owning coach; the only actor allowed to author stages and tasks
    pub coach_id: Uuid,
    /// Plan name
    pub name: String,
    /// Why the user wants to quit
    pub reason: String,
    /// When the plan starts
    pub start_date: NaiveDate,
    /// Target date to be smoke-free
    pub target_quit_date: NaiveDate,
    /// Lifecycle status
    pub status: PlanStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Task completion counts for one stage of a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageProgress {
    /// Stage identifier
    pub stage_id: Uuid,
    /// Stage title
    pub title: String,
    /// Tasks marked complete
    pub completed_tasks: u32,
    /// All tasks in the stage
    pub total_tasks: u32,
}

/// Overall progress of a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanProgress {
    /// Plan identifier
    pub plan_id: Uuid,
    /// Tasks marked complete across all stages
    pub completed_tasks: u32,
    /// All tasks across all stages
    pub total_tasks: u32,
    /// Per-stage breakdown, in stage order
    pub stages: Vec<StageProgress>,
}

fn row_to_plan(row: &SqliteRow) -> AppResult<Plan> {
    let id: String = row
        .try_get("id")
        .map_err(|e| AppError::database(format!("Failed to get id: {e}")))?;
    let request_id: String = row
        .try_get("request_id")
        .map_err(|e| AppError::database(format!("Failed to get request_id: {e}")))?;
    let user_id: String = row
        .try_get("user_id")
        .map_err(|e| AppError::database(format!("Failed to get user_id: {e}")))?;
    let coach_id: String = row
        .try_get("coach_id")
        .map_err(|e| AppError::database(format!("Failed to get coach_id: {e}")))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| AppError::database(format!("Failed to get status: {e}")))?;

    Ok(Plan {
        id: Uuid::parse_str(&id)?,
        request_id: Uuid::parse_str(&request_id)?,
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
        status: PlanStatus::parse(&status),
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::database(format!("Failed to get created_at: {e}")))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| AppError::database(format!("Failed to get updated_at: {e}")))?,
    })
}

const PLAN_COLUMNS: &str = "id, request_id, user_id, coach_id, name, reason, start_date, \
                            target_quit_date, status, created_at, updated_at";

/// Plan database operations manager
pub struct PlanManager {
    pool: SqlitePool,
}

impl PlanManager {
    /// Create a new plan manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a plan from an approved request
    ///
    /// Inserts the plan and advances the request to `created` in a single
    /// transaction: either both happen or neither does. Field validation
    /// runs before any write.
    ///
    /// # Errors
    ///
    /// Validation errors for missing/malformed fields, `ResourceNotFound`
    /// for unknown requests, `PermissionDenied` for actors other than the
    /// assigned coach, `InvalidState` when the request is not `approved`.
    pub async fn create_from_request(
        &self,
        request_id: Uuid,
        actor: Uuid,
        input: &CreateRequestInput,
    ) -> AppResult<Plan> {
        let (start, target) = input.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let row = sqlx::query("SELECT user_id, coach_id, status FROM quit_requests WHERE id = $1")
            .bind(request_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Database query failed: {e}")))?
            .ok_or_else(|| AppError::not_found("Quit request"))?;

        let user_id: String = row
            .try_get("user_id")
            .map_err(|e| AppError::database(format!("Failed to get user_id: {e}")))?;
        let coach_id: String = row
            .try_get("coach_id")
            .map_err(|e| AppError::database(format!("Failed to get coach_id: {e}")))?;
        let status: String = row
            .try_get("status")
            .map_err(|e| AppError::database(format!("Failed to get status: {e}")))?;

        let coach_id = Uuid::parse_str(&coach_id)?;
        if coach_id != actor {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Only the assigned coach may create a plan from this request",
            ));
        }

        let current = RequestStatus::parse(&status);
        if !current.can_transition_to(RequestStatus::Created) {
            return Err(AppError::invalid_state(format!(
                "Cannot create a plan from a request in status '{}'",
                current.as_str()
            )));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO plans
                (id, request_id, user_id, coach_id, name, reason, start_date,
                 target_quit_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'draft', $9, $9)
            ",
        )
        .bind(id.to_string())
        .bind(request_id.to_string())
        .bind(&user_id)
        .bind(coach_id.to_string())
        .bind(input.name.trim())
        .bind(input.reason.trim())
        .bind(start)
        .bind(target)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to create plan: {e}")))?;

        // Condition on the status read above; a concurrent transition
        // rolls the whole operation back instead of leaving a stray plan.
        let result = sqlx::query(
            r"
            UPDATE quit_requests
            SET status = 'created', updated_at = $1
            WHERE id = $2 AND status = 'approved'
            ",
        )
        .bind(now)
        .bind(request_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to update request status: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::invalid_state(
                "Request status changed concurrently; refetch and retry",
            ));
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {e}")))?;

        Ok(Plan {
            id,
            request_id,
            user_id: Uuid::parse_str(&user_id)?,
            coach_id,
            name: input.name.trim().to_owned(),
            reason: input.reason.trim().to_owned(),
            start_date: start,
            target_quit_date: target,
            status: PlanStatus::Draft,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a plan by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get(&self, plan_id: Uuid) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"))
            .bind(plan_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        row.as_ref().map(row_to_plan).transpose()
    }

    /// Get the plan created from a request, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_by_request(&self, request_id: Uuid) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE request_id = $1"
        ))
        .bind(request_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        row.as_ref().map(row_to_plan).transpose()
    }

    /// List a user's plans, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(row_to_plan).collect()
    }

    /// List plans owned by a coach, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_for_coach(&self, coach_id: Uuid) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE coach_id = $1 ORDER BY created_at DESC"
        ))
        .bind(coach_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(row_to_plan).collect()
    }

    /// Set a plan's lifecycle status (owning coach only)
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` for unknown plans, `PermissionDenied` for actors
    /// other than the owning coach.
    pub async fn set_status(
        &self,
        plan_id: Uuid,
        actor: Uuid,
        status: PlanStatus,
    ) -> AppResult<Plan> {
        let mut plan = self
            .get(plan_id)
            .await?
            .ok_or_else(|| AppError::not_found("Plan"))?;

        if plan.coach_id != actor {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Only the owning coach may update this plan",
            ));
        }

        let now = Utc::now();
        sqlx::query("UPDATE plans SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(now)
            .bind(plan_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update plan status: {e}")))?;

        plan.status = status;
        plan.updated_at = now;
        Ok(plan)
    }

    /// Task completion counts for a plan, overall and per stage
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn progress(&self, plan_id: Uuid) -> AppResult<PlanProgress> {
        let rows = sqlx::query(
            r"
            SELECT s.id AS stage_id, s.title,
                   COUNT(t.id) AS total_tasks,
                   COALESCE(SUM(t.is_completed), 0) AS completed_tasks
            FROM stages s
            LEFT JOIN tasks t ON t.stage_id = s.id
            WHERE s.plan_id = $1
            GROUP BY s.id
            ORDER BY s.order_index ASC, s.created_at ASC
            ",
        )
        .bind(plan_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        let mut stages = Vec::with_capacity(rows.len());
        let mut completed: u32 = 0;
        let mut total: u32 = 0;

        for row in rows {
            let stage_id: String = row
                .try_get("stage_id")
                .map_err(|e| AppError::database(format!("Failed to get stage_id: {e}")))?;
            let stage_total: i64 = row
                .try_get("total_tasks")
                .map_err(|e| AppError::database(format!("Failed to get total_tasks: {e}")))?;
            let stage_completed: i64 = row
                .try_get("completed_tasks")
                .map_err(|e| AppError::database(format!("Failed to get completed_tasks: {e}")))?;

            let stage_total = u32::try_from(stage_total).unwrap_or(0);
            let stage_completed = u32::try_from(stage_completed).unwrap_or(0);
            completed += stage_completed;
            total += stage_total;

            stages.push(StageProgress {
                stage_id: Uuid::parse_str(&stage_id)?,
                title: row
                    .try_get("title")
                    .map_err(|e| AppError::database(format!("Failed to get title: {e}")))?,
                completed_tasks: stage_completed,
                total_tasks: stage_total,
            });
        }

        Ok(PlanProgress {
            plan_id,
            completed_tasks: completed,
            total_tasks: total,
            stages,
        })
    }
}
