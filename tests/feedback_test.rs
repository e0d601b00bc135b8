// ABOUTME: Unit tests for the feedback manager and duplicate-rating gate
// ABOUTME: Covers the (user, coach, plan) truth table, validation, and moderation views
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{create_test_coach, create_test_database, create_test_user};
use quitline_server::database::FeedbackStatus;
use quitline_server::errors::ErrorCode;
use uuid::Uuid;

// ============================================================================
// Duplicate-rating gate
// ============================================================================

#[tokio::test]
async fn test_has_rated_truth_table() {
    let database = create_test_database().await.unwrap();
    let user = create_test_user(&database).await.unwrap();
    let coach = create_test_coach(&database).await.unwrap();
    let other_coach = create_test_coach(&database).await.unwrap();
    let plan_id = Uuid::new_v4();

    let manager = database.feedback();
    manager
        .create(user.id, coach.id, Some(plan_id), 4.5, "Great support")
        .await
        .unwrap();

    // Same (user, coach, plan): rated
    assert!(manager
        .has_rated(user.id, coach.id, Some(plan_id))
        .await
        .unwrap());
    // Coach-level check with no plan supplied: rated
    assert!(manager.has_rated(user.id, coach.id, None).await.unwrap());
    // Different plan for the same coach: not rated yet
    assert!(!manager
        .has_rated(user.id, coach.id, Some(Uuid::new_v4()))
        .await
        .unwrap());
    // Different coach: not rated
    assert!(!manager
        .has_rated(user.id, other_coach.id, Some(plan_id))
        .await
        .unwrap());
    assert!(!manager
        .has_rated(user.id, other_coach.id, None)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_has_rated_with_planless_entry() {
    let database = create_test_database().await.unwrap();
    let user = create_test_user(&database).await.unwrap();
    let coach = create_test_coach(&database).await.unwrap();

    let manager = database.feedback();
    manager
        .create(user.id, coach.id, None, 5.0, "Excellent coach")
        .await
        .unwrap();

    // No plan supplied on either side still matches
    assert!(manager.has_rated(user.id, coach.id, None).await.unwrap());
}

#[tokio::test]
async fn test_duplicate_submission_is_a_conflict() {
    let database = create_test_database().await.unwrap();
    let user = create_test_user(&database).await.unwrap();
    let coach = create_test_coach(&database).await.unwrap();
    let plan_id = Uuid::new_v4();

    let manager = database.feedback();
    manager
        .create(user.id, coach.id, Some(plan_id), 4.0, "Helped me a lot")
        .await
        .unwrap();

    let err = manager
        .create(user.id, coach.id, Some(plan_id), 2.0, "Changed my mind")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidState);

    // The original entry is untouched
    let all = manager.list_all_for_coach(coach.id).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!((all[0].rating - 4.0).abs() < f64::EPSILON);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_submission_validation_runs_before_any_write() {
    let database = create_test_database().await.unwrap();
    let user = create_test_user(&database).await.unwrap();
    let coach = create_test_coach(&database).await.unwrap();

    let manager = database.feedback();

    let err = manager
        .create(user.id, coach.id, None, 5.5, "Too enthusiastic")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let err = manager
        .create(user.id, coach.id, None, 4.25, "Quarter stars")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let err = manager
        .create(user.id, coach.id, None, 4.0, "   ")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingRequiredField);

    assert!(manager
        .list_all_for_coach(coach.id)
        .await
        .unwrap()
        .is_empty());
}

// ============================================================================
// Moderation views
// ============================================================================

#[tokio::test]
async fn test_only_approved_entries_are_public() {
    let database = create_test_database().await.unwrap();
    let coach = create_test_coach(&database).await.unwrap();
    let manager = database.feedback();

    let first_user = create_test_user(&database).await.unwrap();
    let second_user = create_test_user(&database).await.unwrap();
    let approved = manager
        .create(first_user.id, coach.id, None, 4.5, "Visible entry")
        .await
        .unwrap();
    manager
        .create(second_user.id, coach.id, None, 1.0, "Pending entry")
        .await
        .unwrap();

    manager
        .set_status(approved.id, FeedbackStatus::Approved)
        .await
        .unwrap();

    let public = manager.list_approved_for_coach(coach.id).await.unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].id, approved.id);

    let all = manager.list_all_for_coach(coach.id).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_hidden_entries_stay_out_of_the_public_view() {
    let database = create_test_database().await.unwrap();
    let user = create_test_user(&database).await.unwrap();
    let coach = create_test_coach(&database).await.unwrap();
    let manager = database.feedback();

    let entry = manager
        .create(user.id, coach.id, None, 1.5, "Spam entry")
        .await
        .unwrap();
    manager
        .set_status(entry.id, FeedbackStatus::Approved)
        .await
        .unwrap();
    manager
        .set_status(entry.id, FeedbackStatus::Hidden)
        .await
        .unwrap();

    assert!(manager
        .list_approved_for_coach(coach.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_set_status_on_unknown_entry_is_not_found() {
    let database = create_test_database().await.unwrap();
    let err = database
        .feedback()
        .set_status(Uuid::new_v4(), FeedbackStatus::Approved)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}
