// ABOUTME: Unit tests for the quit request status transition engine
// ABOUTME: Covers the transition matrix, coach gating, and atomic plan creation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{create_test_coach, create_test_database, create_test_user};
use quitline_server::database::requests::{CreateRequestInput, RequestStatus};
use quitline_server::database::{Database, QuitRequest};
use quitline_server::errors::ErrorCode;
use uuid::Uuid;

fn request_input() -> CreateRequestInput {
    CreateRequestInput {
        name: "Quit for good".to_owned(),
        reason: "Family health".to_owned(),
        start_date: "2025-03-01".to_owned(),
        target_quit_date: "2025-06-01".to_owned(),
    }
}

async fn create_pending_request(database: &Database) -> (QuitRequest, Uuid, Uuid) {
    let user = create_test_user(database).await.unwrap();
    let coach = create_test_coach(database).await.unwrap();
    let request = database
        .requests()
        .create(user.id, coach.id, &request_input())
        .await
        .unwrap();
    (request, user.id, coach.id)
}

// ============================================================================
// Creation and validation
// ============================================================================

#[tokio::test]
async fn test_create_request_starts_pending() {
    let database = create_test_database().await.unwrap();
    let (request, user_id, coach_id) = create_pending_request(&database).await;

    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.user_id, user_id);
    assert_eq!(request.coach_id, coach_id);
    assert_eq!(request.name, "Quit for good");

    let fetched = database.requests().get(request.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, RequestStatus::Pending);
    assert_eq!(fetched.start_date.to_string(), "2025-03-01");
}

#[tokio::test]
async fn test_create_request_rejects_missing_fields_before_write() {
    let database = create_test_database().await.unwrap();
    let user = create_test_user(&database).await.unwrap();
    let coach = create_test_coach(&database).await.unwrap();

    let mut input = request_input();
    input.reason = String::new();

    let err = database
        .requests()
        .create(user.id, coach.id, &input)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingRequiredField);

    // Nothing was persisted
    let requests = database.requests().list_for_user(user.id).await.unwrap();
    assert!(requests.is_empty());
}

// ============================================================================
// Transition engine
// ============================================================================

#[tokio::test]
async fn test_approve_by_assigned_coach() {
    let database = create_test_database().await.unwrap();
    let (request, _, coach_id) = create_pending_request(&database).await;

    let approved = database
        .requests()
        .approve(request.id, coach_id)
        .await
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);

    let fetched = database.requests().get(request.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, RequestStatus::Approved);
}

#[tokio::test]
async fn test_approve_by_other_actor_is_permission_denied() {
    let database = create_test_database().await.unwrap();
    let (request, user_id, _) = create_pending_request(&database).await;
    let other_coach = create_test_coach(&database).await.unwrap();

    // Neither the requesting user nor an unrelated coach may approve
    for actor in [user_id, other_coach.id] {
        let err = database
            .requests()
            .approve(request.id, actor)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    let fetched = database.requests().get(request.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_approve_twice_is_a_conflict() {
    let database = create_test_database().await.unwrap();
    let (request, _, coach_id) = create_pending_request(&database).await;

    database
        .requests()
        .approve(request.id, coach_id)
        .await
        .unwrap();
    let err = database
        .requests()
        .approve(request.id, coach_id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_reject_is_terminal() {
    let database = create_test_database().await.unwrap();
    let (request, _, coach_id) = create_pending_request(&database).await;

    let rejected = database
        .requests()
        .reject(request.id, coach_id)
        .await
        .unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);

    let err = database
        .requests()
        .approve(request.id, coach_id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let database = create_test_database().await.unwrap();
    let coach = create_test_coach(&database).await.unwrap();

    let err = database
        .requests()
        .approve(Uuid::new_v4(), coach.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

// ============================================================================
// Plan creation (approved -> created, atomic)
// ============================================================================

#[tokio::test]
async fn test_create_plan_from_pending_fails_without_partial_state() {
    let database = create_test_database().await.unwrap();
    let (request, _, coach_id) = create_pending_request(&database).await;

    // Skipping the approval step is an invalid transition
    let err = database
        .plans()
        .create_from_request(request.id, coach_id, &request_input())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidState);

    // No plan row, status untouched
    assert!(database
        .plans()
        .get_by_request(request.id)
        .await
        .unwrap()
        .is_none());
    let fetched = database.requests().get(request.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_create_plan_from_approved_advances_to_created() {
    let database = create_test_database().await.unwrap();
    let (request, user_id, coach_id) = create_pending_request(&database).await;

    database
        .requests()
        .approve(request.id, coach_id)
        .await
        .unwrap();

    let plan = database
        .plans()
        .create_from_request(request.id, coach_id, &request_input())
        .await
        .unwrap();

    assert_eq!(plan.request_id, request.id);
    assert_eq!(plan.user_id, user_id);
    assert_eq!(plan.coach_id, coach_id);
    assert_eq!(plan.name, "Quit for good");
    assert_eq!(plan.reason, "Family health");
    assert_eq!(plan.start_date.to_string(), "2025-03-01");
    assert_eq!(plan.target_quit_date.to_string(), "2025-06-01");

    let fetched = database.requests().get(request.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, RequestStatus::Created);

    let by_request = database
        .plans()
        .get_by_request(request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_request.id, plan.id);
}

#[tokio::test]
async fn test_create_plan_validation_failure_leaves_request_approved() {
    let database = create_test_database().await.unwrap();
    let (request, _, coach_id) = create_pending_request(&database).await;

    database
        .requests()
        .approve(request.id, coach_id)
        .await
        .unwrap();

    let mut input = request_input();
    input.name = "  ".to_owned();

    let err = database
        .plans()
        .create_from_request(request.id, coach_id, &input)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingRequiredField);

    // Either both the plan insert and the status change happen or neither
    assert!(database
        .plans()
        .get_by_request(request.id)
        .await
        .unwrap()
        .is_none());
    let fetched = database.requests().get(request.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, RequestStatus::Approved);
}

#[tokio::test]
async fn test_create_plan_unparseable_date_is_invalid_format() {
    let database = create_test_database().await.unwrap();
    let (request, _, coach_id) = create_pending_request(&database).await;

    database
        .requests()
        .approve(request.id, coach_id)
        .await
        .unwrap();

    let mut input = request_input();
    input.target_quit_date = "next summer".to_owned();

    let err = database
        .plans()
        .create_from_request(request.id, coach_id, &input)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFormat);
}

#[tokio::test]
async fn test_create_plan_by_other_actor_is_permission_denied() {
    let database = create_test_database().await.unwrap();
    let (request, _, coach_id) = create_pending_request(&database).await;
    let other_coach = create_test_coach(&database).await.unwrap();

    database
        .requests()
        .approve(request.id, coach_id)
        .await
        .unwrap();

    let err = database
        .plans()
        .create_from_request(request.id, other_coach.id, &request_input())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    assert!(database
        .plans()
        .get_by_request(request.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_create_plan_twice_is_a_conflict() {
    let database = create_test_database().await.unwrap();
    let (request, _, coach_id) = create_pending_request(&database).await;

    database
        .requests()
        .approve(request.id, coach_id)
        .await
        .unwrap();
    database
        .plans()
        .create_from_request(request.id, coach_id, &request_input())
        .await
        .unwrap();

    let err = database
        .plans()
        .create_from_request(request.id, coach_id, &request_input())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidState);
}

// ============================================================================
// Listings and admin delete
// ============================================================================

#[tokio::test]
async fn test_listings_are_scoped_to_user_and_coach() {
    let database = create_test_database().await.unwrap();
    let (request, user_id, coach_id) = create_pending_request(&database).await;
    let (_other, other_user_id, other_coach_id) = create_pending_request(&database).await;

    let for_user = database.requests().list_for_user(user_id).await.unwrap();
    assert_eq!(for_user.len(), 1);
    assert_eq!(for_user[0].id, request.id);

    let for_coach = database.requests().list_for_coach(coach_id).await.unwrap();
    assert_eq!(for_coach.len(), 1);
    assert_eq!(for_coach[0].id, request.id);

    assert_eq!(
        database
            .requests()
            .list_for_user(other_user_id)
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        database
            .requests()
            .list_for_coach(other_coach_id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_delete_removes_request() {
    let database = create_test_database().await.unwrap();
    let (request, _, _) = create_pending_request(&database).await;

    assert!(database.requests().delete(request.id).await.unwrap());
    assert!(database.requests().get(request.id).await.unwrap().is_none());
    assert!(!database.requests().delete(request.id).await.unwrap());
}
