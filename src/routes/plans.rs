// ABOUTME: Route handlers for plans and their stage/task hierarchy
// ABOUTME: Stage and task authoring is coach-gated; completion belongs to the owning user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthResult;
use crate::database::plans::{Plan, PlanStatus};
use crate::database::stages::{CreateStageInput, Stage, UpdateStageInput};
use crate::database::tasks::{CreateTaskInput, Task, UpdateTaskInput};
use crate::errors::{AppError, ErrorCode};
use crate::permissions::UserRole;
use crate::resources::ServerResources;

/// Request body for setting a plan's status
#[derive(Debug, Deserialize)]
pub struct SetPlanStatusBody {
    /// New lifecycle status
    pub status: PlanStatus,
}

/// Request body for toggling task completion
#[derive(Debug, Deserialize)]
pub struct SetCompletedBody {
    /// New completion state
    pub completed: bool,
}

/// Response wrapper for plan listings
#[derive(Debug, Serialize, Deserialize)]
pub struct ListPlansResponse {
    /// Matching plans, newest first
    pub plans: Vec<Plan>,
    /// Total count
    pub total: usize,
}

/// A plan together with its authored hierarchy
#[derive(Debug, Serialize, Deserialize)]
pub struct PlanDetailResponse {
    /// The plan itself
    pub plan: Plan,
    /// Stages in order
    pub stages: Vec<Stage>,
    /// All tasks of the plan, stage order then creation order
    pub tasks: Vec<Task>,
}

/// Plan, stage, and task routes
pub struct PlanRoutes;

impl PlanRoutes {
    /// Create all plan routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/plans", get(Self::handle_list))
            .route("/api/plans/:id", get(Self::handle_get))
            .route("/api/plans/:id/status", put(Self::handle_set_status))
            .route("/api/plans/:id/progress", get(Self::handle_progress))
            .route("/api/plans/:id/stages", post(Self::handle_create_stage))
            .route("/api/plans/:id/stages", get(Self::handle_list_stages))
            .route("/api/stages/:id", put(Self::handle_update_stage))
            .route("/api/stages/:id", delete(Self::handle_delete_stage))
            .route("/api/stages/:id/tasks", post(Self::handle_create_task))
            .route("/api/stages/:id/tasks", get(Self::handle_list_tasks))
            .route("/api/tasks/:id", put(Self::handle_update_task))
            .route("/api/tasks/:id", delete(Self::handle_delete_task))
            .route("/api/tasks/:id/complete", post(Self::handle_set_completed))
            .with_state(resources)
    }

    /// Extract and authenticate the caller from the authorization header
    fn authenticate(
        headers: &HeaderMap,
        resources: &Arc<ServerResources>,
    ) -> Result<AuthResult, AppError> {
        let auth_value = headers.get("authorization").and_then(|h| h.to_str().ok());
        resources.auth_manager.authenticate_request(auth_value)
    }

    /// Fetch a plan and deny callers who are neither participant nor admin
    async fn get_plan_as_participant(
        plan_id: Uuid,
        auth: &AuthResult,
        resources: &Arc<ServerResources>,
    ) -> Result<Plan, AppError> {
        let plan = resources
            .database
            .plans()
            .get(plan_id)
            .await?
            .ok_or_else(|| AppError::not_found("Plan"))?;

        let participant = plan.user_id == auth.user_id || plan.coach_id == auth.user_id;
        if !participant && !auth.role.is_admin() {
            return Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Not a participant of this plan",
            ));
        }
        Ok(plan)
    }

    /// Resolve a stage and check the caller against its plan the same way
    async fn ensure_stage_participant(
        stage_id: Uuid,
        auth: &AuthResult,
        resources: &Arc<ServerResources>,
    ) -> Result<Stage, AppError> {
        let stage = resources
            .database
            .stages()
            .get(stage_id)
            .await?
            .ok_or_else(|| AppError::not_found("Stage"))?;
        Self::get_plan_as_participant(stage.plan_id, auth, resources).await?;
        Ok(stage)
    }

    /// Handle GET /api/plans - list the caller's plans
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let manager = resources.database.plans();

        let plans = match auth.role {
            UserRole::Coach => manager.list_for_coach(auth.user_id).await?,
            UserRole::User | UserRole::Admin => manager.list_for_user(auth.user_id).await?,
        };

        let response = ListPlansResponse {
            total: plans.len(),
            plans,
        };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle GET /api/plans/:id - plan with its stages and tasks
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(plan_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let plan = Self::get_plan_as_participant(plan_id, &auth, &resources).await?;

        let stages = resources.database.stages().list_by_plan(plan_id).await?;
        let tasks = resources.database.tasks().list_by_plan(plan_id).await?;

        let response = PlanDetailResponse { plan, stages, tasks };
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    /// Handle PUT /api/plans/:id/status - owning coach moves the lifecycle
    async fn handle_set_status(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(plan_id): Path<Uuid>,
        Json(body): Json<SetPlanStatusBody>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let plan = resources
            .database
            .plans()
            .set_status(plan_id, auth.user_id, body.status)
            .await?;
        Ok((StatusCode::OK, Json(plan)).into_response())
    }

    /// Handle GET /api/plans/:id/progress - completion counts per stage
    async fn handle_progress(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(plan_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        Self::get_plan_as_participant(plan_id, &auth, &resources).await?;

        let progress = resources.database.plans().progress(plan_id).await?;
        Ok((StatusCode::OK, Json(progress)).into_response())
    }

    /// Handle POST /api/plans/:id/stages - coach adds a stage
    async fn handle_create_stage(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(plan_id): Path<Uuid>,
        Json(body): Json<CreateStageInput>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let stage = resources
            .database
            .stages()
            .create(plan_id, auth.user_id, &body)
            .await?;
        Ok((StatusCode::CREATED, Json(stage)).into_response())
    }

    /// Handle GET /api/plans/:id/stages
    async fn handle_list_stages(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(plan_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        Self::get_plan_as_participant(plan_id, &auth, &resources).await?;

        let stages = resources.database.stages().list_by_plan(plan_id).await?;
        Ok((StatusCode::OK, Json(stages)).into_response())
    }

    /// Handle PUT /api/stages/:id - coach edits a stage
    async fn handle_update_stage(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(stage_id): Path<Uuid>,
        Json(body): Json<UpdateStageInput>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let stage = resources
            .database
            .stages()
            .update(stage_id, auth.user_id, &body)
            .await?;
        Ok((StatusCode::OK, Json(stage)).into_response())
    }

    /// Handle DELETE /api/stages/:id - coach removes a stage and its tasks
    async fn handle_delete_stage(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(stage_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        resources
            .database
            .stages()
            .delete(stage_id, auth.user_id)
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle POST /api/stages/:id/tasks - coach adds a task
    async fn handle_create_task(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(stage_id): Path<Uuid>,
        Json(body): Json<CreateTaskInput>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let task = resources
            .database
            .tasks()
            .create(stage_id, auth.user_id, &body)
            .await?;
        Ok((StatusCode::CREATED, Json(task)).into_response())
    }

    /// Handle GET /api/stages/:id/tasks - tasks of one stage from the store
    async fn handle_list_tasks(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(stage_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        Self::ensure_stage_participant(stage_id, &auth, &resources).await?;

        let tasks = resources.database.tasks().list_by_stage(stage_id).await?;
        Ok((StatusCode::OK, Json(tasks)).into_response())
    }

    /// Handle PUT /api/tasks/:id - coach edits a task
    async fn handle_update_task(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(task_id): Path<Uuid>,
        Json(body): Json<UpdateTaskInput>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let task = resources
            .database
            .tasks()
            .update(task_id, auth.user_id, &body)
            .await?;
        Ok((StatusCode::OK, Json(task)).into_response())
    }

    /// Handle DELETE /api/tasks/:id - coach removes a task
    ///
    /// A permission-denied delete fails with a 403 and leaves the task in
    /// place; it is never reported as success.
    async fn handle_delete_task(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(task_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        resources
            .database
            .tasks()
            .delete(task_id, auth.user_id)
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    /// Handle POST /api/tasks/:id/complete - owning user toggles completion
    async fn handle_set_completed(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(task_id): Path<Uuid>,
        Json(body): Json<SetCompletedBody>,
    ) -> Result<Response, AppError> {
        let auth = Self::authenticate(&headers, &resources)?;
        let task = resources
            .database
            .tasks()
            .set_completed(task_id, auth.user_id, body.completed)
            .await?;
        Ok((StatusCode::OK, Json(task)).into_response())
    }
}
