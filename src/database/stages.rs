// ABOUTME: Database operations for stages within coaching plans
// ABOUTME: Stage authoring is restricted to the coach owning the parent plan
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};

/// A named phase within a plan, coach-authored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Unique identifier
    pub id: Uuid,
    /// Owning plan
    pub plan_id: Uuid,
    /// Position within the plan
    pub order_index: i64,
    /// Stage title
    pub title: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Optional date the stage begins
    pub start_date: Option<NaiveDate>,
    /// Optional date the stage ends
    pub end_date: Option<NaiveDate>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a stage
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStageInput {
    /// Stage title
    pub title: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Position within the plan
    #[serde(default)]
    pub order_index: i64,
    /// Optional date the stage begins
    pub start_date: Option<NaiveDate>,
    /// Optional date the stage ends
    pub end_date: Option<NaiveDate>,
}

/// Fields supplied when updating a stage; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStageInput {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New position
    pub order_index: Option<i64>,
    /// New start date
    pub start_date: Option<NaiveDate>,
    /// New end date
    pub end_date: Option<NaiveDate>,
}

fn row_to_stage(row: &SqliteRow) -> AppResult<Stage> {
    let id: String = row
        .try_get("id")
        .map_err(|e| AppError::database(format!("Failed to get id: {e}")))?;
    let plan_id: String = row
        .try_get("plan_id")
        .map_err(|e| AppError::database(format!("Failed to get plan_id: {e}")))?;

    Ok(Stage {
        id: Uuid::parse_str(&id)?,
        plan_id: Uuid::parse_str(&plan_id)?,
        order_index: row
            .try_get("order_index")
            .map_err(|e| AppError::database(format!("Failed to get order_index: {e}")))?,
        title: row
            .try_get("title")
            .map_err(|e| AppError::database(format!("Failed to get title: {e}")))?,
        description: row
            .try_get("description")
            .map_err(|e| AppError::database(format!("Failed to get description: {e}")))?,
        start_date: row
            .try_get("start_date")
            .map_err(|e| AppError::database(format!("Failed to get start_date: {e}")))?,
        end_date: row
            .try_get("end_date")
            .map_err(|e| AppError::database(format!("Failed to get end_date: {e}")))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::database(format!("Failed to get created_at: {e}")))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| AppError::database(format!("Failed to get updated_at: {e}")))?,
    })
}

const STAGE_COLUMNS: &str =
    "id, plan_id, order_index, title, description, start_date, end_date, created_at, updated_at";

/// Stage database operations manager
pub struct StageManager {
    pool: SqlitePool,
}

impl StageManager {
    /// Create a new stage manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve the coach owning a plan, failing when the plan is unknown
    async fn plan_coach(&self, plan_id: Uuid) -> AppResult<Uuid> {
        let row = sqlx::query("SELECT coach_id FROM plans WHERE id = $1")
            .bind(plan_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database query failed: {e}")))?
            .ok_or_else(|| AppError::not_found("Plan"))?;

        let coach_id: String = row
            .try_get("coach_id")
            .map_err(|e| AppError::database(format!("Failed to get coach_id: {e}")))?;
        Ok(Uuid::parse_str(&coach_id)?)
    }

    /// Create a stage in a plan (owning coach only)
    ///
    /// # Errors
    ///
    /// `MissingRequiredField` for an empty title, `ResourceNotFound` for
    /// unknown plans, `PermissionDenied` for actors other than the owning
    /// coach.
    pub async fn create(
        &self,
        plan_id: Uuid,
        actor: Uuid,
        input: &CreateStageInput,
    ) -> AppResult<Stage> {
        if input.title.trim().is_empty() {
            return Err(AppError::new(
                ErrorCode::MissingRequiredField,
                "Field 'title' is required",
            ));
        }

        if self.plan_coach(plan_id).await? != actor {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Only the owning coach may add stages to this plan",
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO stages
                (id, plan_id, order_index, title, description, start_date, end_date,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ",
        )
        .bind(id.to_string())
        .bind(plan_id.to_string())
        .bind(input.order_index)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create stage: {e}")))?;

        Ok(Stage {
            id,
            plan_id,
            order_index: input.order_index,
            title: input.title.trim().to_owned(),
            description: input.description.clone(),
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a stage by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get(&self, stage_id: Uuid) -> AppResult<Option<Stage>> {
        let row = sqlx::query(&format!("SELECT {STAGE_COLUMNS} FROM stages WHERE id = $1"))
            .bind(stage_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        row.as_ref().map(row_to_stage).transpose()
    }

    /// List the stages of a plan in order
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_by_plan(&self, plan_id: Uuid) -> AppResult<Vec<Stage>> {
        let rows = sqlx::query(&format!(
            "SELECT {STAGE_COLUMNS} FROM stages WHERE plan_id = $1 \
             ORDER BY order_index ASC, created_at ASC"
        ))
        .bind(plan_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        rows.iter().map(row_to_stage).collect()
    }

    /// Update a stage (owning coach only)
    ///
    /// # Errors
    ///
    /// Same permission surface as [`Self::create`].
    pub async fn update(
        &self,
        stage_id: Uuid,
        actor: Uuid,
        input: &UpdateStageInput,
    ) -> AppResult<Stage> {
        let stage = self
            .get(stage_id)
            .await?
            .ok_or_else(|| AppError::not_found("Stage"))?;

        if self.plan_coach(stage.plan_id).await? != actor {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Only the owning coach may edit this stage",
            ));
        }

        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                return Err(AppError::new(
                    ErrorCode::MissingRequiredField,
                    "Field 'title' is required",
                ));
            }
        }

        let now = Utc::now();
        sqlx::query(
            r"
            UPDATE stages
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                order_index = COALESCE($3, order_index),
                start_date = COALESCE($4, start_date),
                end_date = COALESCE($5, end_date),
                updated_at = $6
            WHERE id = $7
            ",
        )
        .bind(input.title.as_ref().map(|t| t.trim().to_owned()))
        .bind(&input.description)
        .bind(input.order_index)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(now)
        .bind(stage_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update stage: {e}")))?;

        self.get(stage_id)
            .await?
            .ok_or_else(|| AppError::not_found("Stage"))
    }

    /// Delete a stage and its tasks (owning coach only)
    ///
    /// # Errors
    ///
    /// Same permission surface as [`Self::create`].
    pub async fn delete(&self, stage_id: Uuid, actor: Uuid) -> AppResult<()> {
        let stage = self
            .get(stage_id)
            .await?
            .ok_or_else(|| AppError::not_found("Stage"))?;

        if self.plan_coach(stage.plan_id).await? != actor {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Only the owning coach may delete this stage",
            ));
        }

        sqlx::query("DELETE FROM stages WHERE id = $1")
            .bind(stage_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete stage: {e}")))?;

        Ok(())
    }
}
