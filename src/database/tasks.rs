// ABOUTME: Database operations for tasks within plan stages
// ABOUTME: Completion is user-gated, authoring is coach-gated, and denied deletes fail loudly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};

/// A unit of user-actionable work within a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: Uuid,
    /// Owning stage
    pub stage_id: Uuid,
    /// What the user should do
    pub description: String,
    /// Whether the owning user has completed the task
    pub is_completed: bool,
    /// Optional due date
    pub due_date: Option<NaiveDate>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a task
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskInput {
    /// What the user should do
    pub description: String,
    /// Optional due date
    pub due_date: Option<NaiveDate>,
}

/// Fields supplied when updating a task; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskInput {
    /// New description
    pub description: Option<String>,
    /// New due date
    pub due_date: Option<NaiveDate>,
}

/// Who owns a task through its stage's plan
struct TaskOwnership {
    user_id: Uuid,
    coach_id: Uuid,
}

fn row_to_task(row: &SqliteRow) -> AppResult<Task> {
    let id: String = row
        .try_get("id")
        .map_err(|e| AppError::database(format!("Failed to get id: {e}")))?;
    let stage_id: String = row
        .try_get("stage_id")
        .map_err(|e| AppError::database(format!("Failed to get stage_id: {e}")))?;

    Ok(Task {
        id: Uuid::parse_str(&id)?,
        stage_id: Uuid::parse_str(&stage_id)?,
        description: row
            .try_get("description")
            .map_err(|e| AppError::database(format!("Failed to get description: {e}")))?,
        is_completed: row
            .try_get("is_completed")
            .map_err(|e| AppError::database(format!("Failed to get is_completed: {e}")))?,
        due_date: row
            .try_get("due_date")
            .map_err(|e| AppError::database(format!("Failed to get due_date: {e}")))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::database(format!("Failed to get created_at: {e}")))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| AppError::database(format!("Failed to get updated_at: {e}")))?,
    })
}

const TASK_COLUMNS: &str =
    "id, stage_id, description, is_completed, due_date, created_at, updated_at";

/// Task database operations manager
pub struct TaskManager {
    pool: SqlitePool,
}

impl TaskManager {
    /// Create a new task manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve the user and coach owning a stage through its plan
    async fn stage_ownership(&self, stage_id: Uuid) -> AppResult<TaskOwnership> {
        let row = sqlx::query(
            r"
            SELECT p.user_id, p.coach_id
            FROM stages s
            JOIN plans p ON s.plan_id = p.id
            WHERE s.id = $1
            ",
        )
        .bind(stage_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?
        .ok_or_else(|| AppError::not_found("Stage"))?;

        let user_id: String = row
            .try_get("user_id")
            .map_err(|e| AppError::database(format!("Failed to get user_id: {e}")))?;
        let coach_id: String = row
            .try_get("coach_id")
            .map_err(|e| AppError::database(format!("Failed to get coach_id: {e}")))?;

        Ok(TaskOwnership {
            user_id: Uuid::parse_str(&user_id)?,
            coach_id: Uuid::parse_str(&coach_id)?,
        })
    }

    /// Create a task in a stage (owning coach only)
    ///
    /// # Errors
    ///
    /// `MissingRequiredField` for an empty description, `ResourceNotFound`
    /// for unknown stages, `PermissionDenied` for actors other than the
    /// owning coach.
    pub async fn create(
        &self,
        stage_id: Uuid,
        actor: Uuid,
        input: &CreateTaskInput,
    ) -> AppResult<Task> {
        if input.description.trim().is_empty() {
            return Err(AppError::new(
                ErrorCode::MissingRequiredField,
                "Field 'description' is required",
            ));
        }

        if self.stage_ownership(stage_id).await?.coach_id != actor {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Only the owning coach may add tasks to this stage",
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO tasks (id, stage_id, description, is_completed, due_date, created_at, updated_at)
            VALUES ($1, $2, $3, 0, $4, $5, $5)
            ",
        )
        .bind(id.to_string())
        .bind(stage_id.to_string())
        .bind(input.description.trim())
        .bind(input.due_date)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create task: {e}")))?;

        Ok(Task {
            id,
            stage_id,
            description: input.description.trim().to_owned(),
            is_completed: false,
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a task by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get(&self, task_id: Uuid) -> AppResult<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(task_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        row.as_ref().map(row_to_task).transpose()
    }

    /// List the tasks of a stage from the store
    ///
    /// The pure counterpart [`Self::filter_by_stage`] must return the same
    /// identifiers for the same stage over an already-fetched collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_by_stage(&self, stage_id: Uuid) -> AppResult<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE stage_id = $1 ORDER BY created_at ASC"
        ))
        .bind(stage_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(row_to_task).collect()
    }

    /// List all tasks of a plan, stage order then creation order
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_by_plan(&self, plan_id: Uuid) -> AppResult<Vec<Task>> {
        let rows = sqlx::query(
            r"
            SELECT t.id, t.stage_id, t.description, t.is_completed, t.due_date,
                   t.created_at, t.updated_at
            FROM tasks t
            JOIN stages s ON t.stage_id = s.id
            WHERE s.plan_id = $1
            ORDER BY s.order_index ASC, t.created_at ASC
            ",
        )
        .bind(plan_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(row_to_task).collect()
    }

    /// Filter an already-fetched task collection down to one stage
    ///
    /// Pure in-memory counterpart of [`Self::list_by_stage`].
    #[must_use]
    pub fn filter_by_stage(tasks: &[Task], stage_id: Uuid) -> Vec<Task> {
        tasks
            .iter()
            .filter(|t| t.stage_id == stage_id)
            .cloned()
            .collect()
    }

    /// Update a task's content (owning coach only)
    ///
    /// # Errors
    ///
    /// Same permission surface as [`Self::create`].
    pub async fn update(
        &self,
        task_id: Uuid,
        actor: Uuid,
        input: &UpdateTaskInput,
    ) -> AppResult<Task> {
        let task = self
            .get(task_id)
            .await?
            .ok_or_else(|| AppError::not_found("Task"))?;

        if self.stage_ownership(task.stage_id).await?.coach_id != actor {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Only the owning coach may edit this task",
            ));
        }

        if let Some(description) = &input.description {
            if description.trim().is_empty() {
                return Err(AppError::new(
                    ErrorCode::MissingRequiredField,
                    "Field 'description' is required",
                ));
            }
        }

        let now = Utc::now();
        sqlx::query(
            r"
            UPDATE tasks
            SET description = COALESCE($1, description),
                due_date = COALESCE($2, due_date),
                updated_at = $3
            WHERE id = $4
            ",
        )
        .bind(input.description.as_ref().map(|d| d.trim().to_owned()))
        .bind(input.due_date)
        .bind(now)
        .bind(task_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update task: {e}")))?;

        self.get(task_id)
            .await?
            .ok_or_else(|| AppError::not_found("Task"))
    }

    /// Toggle a task's completion flag (owning user only)
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` for unknown tasks, `PermissionDenied` for actors
    /// other than the owning user.
    pub async fn set_completed(
        &self,
        task_id: Uuid,
        actor: Uuid,
        completed: bool,
    ) -> AppResult<Task> {
        let task = self
            .get(task_id)
            .await?
            .ok_or_else(|| AppError::not_found("Task"))?;

        if self.stage_ownership(task.stage_id).await?.user_id != actor {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Only the owning user may complete this task",
            ));
        }

        let now = Utc::now();
        sqlx::query("UPDATE tasks SET is_completed = $1, updated_at = $2 WHERE id = $3")
            .bind(completed)
            .bind(now)
            .bind(task_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update task completion: {e}")))?;

        Ok(Task {
            is_completed: completed,
            updated_at: now,
            ..task
        })
    }

    /// Delete a task (owning coach only)
    ///
    /// A permission-denied delete is a failure: the row is left intact and
    /// the caller receives a 403, never a success.
    ///
    /// # Errors
    ///
    /// Same permission surface as [`Self::create`].
    pub async fn delete(&self, task_id: Uuid, actor: Uuid) -> AppResult<()> {
        let task = self
            .get(task_id)
            .await?
            .ok_or_else(|| AppError::not_found("Task"))?;

        if self.stage_ownership(task.stage_id).await?.coach_id != actor {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Only the owning coach may delete this task",
            ));
        }

        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete task: {e}")))?;

        Ok(())
    }
}
