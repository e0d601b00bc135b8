// ABOUTME: Unit tests for the plan/stage/task hierarchy managers
// ABOUTME: Covers coach-gated authoring, user-gated completion, and the stage filter equivalence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{create_test_coach, create_test_database, create_test_user};
use quitline_server::database::requests::CreateRequestInput;
use quitline_server::database::stages::{CreateStageInput, UpdateStageInput};
use quitline_server::database::tasks::{CreateTaskInput, UpdateTaskInput};
use quitline_server::database::{Database, Plan, TaskManager};
use quitline_server::errors::ErrorCode;
use uuid::Uuid;

async fn create_plan(database: &Database) -> (Plan, Uuid, Uuid) {
    let user = create_test_user(database).await.unwrap();
    let coach = create_test_coach(database).await.unwrap();

    let input = CreateRequestInput {
        name: "Fresh start".to_owned(),
        reason: "Running out of breath".to_owned(),
        start_date: "2025-02-01".to_owned(),
        target_quit_date: "2025-05-01".to_owned(),
    };

    let request = database
        .requests()
        .create(user.id, coach.id, &input)
        .await
        .unwrap();
    database
        .requests()
        .approve(request.id, coach.id)
        .await
        .unwrap();
    let plan = database
        .plans()
        .create_from_request(request.id, coach.id, &input)
        .await
        .unwrap();

    (plan, user.id, coach.id)
}

fn stage_input(title: &str, order_index: i64) -> CreateStageInput {
    CreateStageInput {
        title: title.to_owned(),
        description: Some("Cut down gradually".to_owned()),
        order_index,
        start_date: None,
        end_date: None,
    }
}

fn task_input(description: &str) -> CreateTaskInput {
    CreateTaskInput {
        description: description.to_owned(),
        due_date: None,
    }
}

// ============================================================================
// Stage authoring
// ============================================================================

#[tokio::test]
async fn test_coach_creates_and_orders_stages() {
    let database = create_test_database().await.unwrap();
    let (plan, _, coach_id) = create_plan(&database).await;

    database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week two", 1))
        .await
        .unwrap();
    database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week one", 0))
        .await
        .unwrap();

    let stages = database.stages().list_by_plan(plan.id).await.unwrap();
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0].title, "Week one");
    assert_eq!(stages[1].title, "Week two");
}

#[tokio::test]
async fn test_stage_authoring_denied_for_non_owning_actors() {
    let database = create_test_database().await.unwrap();
    let (plan, user_id, coach_id) = create_plan(&database).await;
    let other_coach = create_test_coach(&database).await.unwrap();

    for actor in [user_id, other_coach.id] {
        let err = database
            .stages()
            .create(plan.id, actor, &stage_input("Week one", 0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    let stage = database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week one", 0))
        .await
        .unwrap();

    let err = database
        .stages()
        .update(
            stage.id,
            other_coach.id,
            &UpdateStageInput {
                title: Some("Hijacked".to_owned()),
                ..UpdateStageInput::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);

    let err = database
        .stages()
        .delete(stage.id, user_id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    assert!(database.stages().get(stage.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_stage_update_changes_fields() {
    let database = create_test_database().await.unwrap();
    let (plan, _, coach_id) = create_plan(&database).await;

    let stage = database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week one", 0))
        .await
        .unwrap();

    let updated = database
        .stages()
        .update(
            stage.id,
            coach_id,
            &UpdateStageInput {
                title: Some("Week one: preparation".to_owned()),
                order_index: Some(3),
                ..UpdateStageInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Week one: preparation");
    assert_eq!(updated.order_index, 3);
    // Untouched fields keep their values
    assert_eq!(updated.description, stage.description);
}

// ============================================================================
// Task authoring and completion
// ============================================================================

#[tokio::test]
async fn test_task_completion_is_user_gated() {
    let database = create_test_database().await.unwrap();
    let (plan, user_id, coach_id) = create_plan(&database).await;

    let stage = database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week one", 0))
        .await
        .unwrap();
    let task = database
        .tasks()
        .create(stage.id, coach_id, &task_input("Skip the morning cigarette"))
        .await
        .unwrap();
    assert!(!task.is_completed);

    // The coach cannot complete on the user's behalf
    let err = database
        .tasks()
        .set_completed(task.id, coach_id, true)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);

    let completed = database
        .tasks()
        .set_completed(task.id, user_id, true)
        .await
        .unwrap();
    assert!(completed.is_completed);

    // And back again
    let reopened = database
        .tasks()
        .set_completed(task.id, user_id, false)
        .await
        .unwrap();
    assert!(!reopened.is_completed);
}

#[tokio::test]
async fn test_task_edit_is_coach_gated() {
    let database = create_test_database().await.unwrap();
    let (plan, user_id, coach_id) = create_plan(&database).await;

    let stage = database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week one", 0))
        .await
        .unwrap();
    let task = database
        .tasks()
        .create(stage.id, coach_id, &task_input("Go for a walk"))
        .await
        .unwrap();

    let err = database
        .tasks()
        .update(
            task.id,
            user_id,
            &UpdateTaskInput {
                description: Some("Changed by user".to_owned()),
                ..UpdateTaskInput::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);

    let updated = database
        .tasks()
        .update(
            task.id,
            coach_id,
            &UpdateTaskInput {
                description: Some("Go for a 20 minute walk".to_owned()),
                ..UpdateTaskInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description, "Go for a 20 minute walk");
}

#[tokio::test]
async fn test_denied_task_delete_fails_and_leaves_row_intact() {
    let database = create_test_database().await.unwrap();
    let (plan, user_id, coach_id) = create_plan(&database).await;
    let other_coach = create_test_coach(&database).await.unwrap();

    let stage = database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week one", 0))
        .await
        .unwrap();
    let task = database
        .tasks()
        .create(stage.id, coach_id, &task_input("Throw away the ashtray"))
        .await
        .unwrap();

    // A denied delete must surface as a failure, never as success
    for actor in [user_id, other_coach.id] {
        let err = database.tasks().delete(task.id, actor).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert!(database.tasks().get(task.id).await.unwrap().is_some());
    }

    database.tasks().delete(task.id, coach_id).await.unwrap();
    assert!(database.tasks().get(task.id).await.unwrap().is_none());
}

// ============================================================================
// Stage filter equivalence and progress
// ============================================================================

#[tokio::test]
async fn test_filter_by_stage_matches_list_by_stage() {
    let database = create_test_database().await.unwrap();
    let (plan, _, coach_id) = create_plan(&database).await;

    let stage_a = database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week one", 0))
        .await
        .unwrap();
    let stage_b = database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week two", 1))
        .await
        .unwrap();

    for i in 0..3 {
        database
            .tasks()
            .create(stage_a.id, coach_id, &task_input(&format!("A task {i}")))
            .await
            .unwrap();
    }
    for i in 0..2 {
        database
            .tasks()
            .create(stage_b.id, coach_id, &task_input(&format!("B task {i}")))
            .await
            .unwrap();
    }

    let all_tasks = database.tasks().list_by_plan(plan.id).await.unwrap();
    assert_eq!(all_tasks.len(), 5);

    // The in-memory filter and the store query must agree for every stage
    for stage_id in [stage_a.id, stage_b.id] {
        let fetched: Vec<Uuid> = database
            .tasks()
            .list_by_stage(stage_id)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        let filtered: Vec<Uuid> = TaskManager::filter_by_stage(&all_tasks, stage_id)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(fetched, filtered);
    }
}

#[tokio::test]
async fn test_progress_counts_completed_tasks_per_stage() {
    let database = create_test_database().await.unwrap();
    let (plan, user_id, coach_id) = create_plan(&database).await;

    let stage = database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week one", 0))
        .await
        .unwrap();
    let task_a = database
        .tasks()
        .create(stage.id, coach_id, &task_input("Task a"))
        .await
        .unwrap();
    database
        .tasks()
        .create(stage.id, coach_id, &task_input("Task b"))
        .await
        .unwrap();

    database
        .tasks()
        .set_completed(task_a.id, user_id, true)
        .await
        .unwrap();

    let progress = database.plans().progress(plan.id).await.unwrap();
    assert_eq!(progress.total_tasks, 2);
    assert_eq!(progress.completed_tasks, 1);
    assert_eq!(progress.stages.len(), 1);
    assert_eq!(progress.stages[0].stage_id, stage.id);
    assert_eq!(progress.stages[0].completed_tasks, 1);
    assert_eq!(progress.stages[0].total_tasks, 2);
}

#[tokio::test]
async fn test_stage_delete_cascades_to_tasks() {
    let database = create_test_database().await.unwrap();
    let (plan, _, coach_id) = create_plan(&database).await;

    let stage = database
        .stages()
        .create(plan.id, coach_id, &stage_input("Week one", 0))
        .await
        .unwrap();
    let task = database
        .tasks()
        .create(stage.id, coach_id, &task_input("Task a"))
        .await
        .unwrap();

    database.stages().delete(stage.id, coach_id).await.unwrap();
    assert!(database.tasks().get(task.id).await.unwrap().is_none());
}
