// ABOUTME: Route module organization for the Quitline HTTP endpoints
// ABOUTME: Centralized route definitions organized by domain with clean separation of concerns
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

//! Route module for the Quitline server
//!
//! This module organizes all HTTP routes by domain for better
//! maintainability. Each domain module contains route definitions and thin
//! handler functions that delegate to the database managers.

/// Health check and system status routes
pub mod health;

/// Authentication and account routes
pub mod auth;

/// Quit-plan request routes (submission, review, plan creation)
pub mod requests;

/// Plan, stage, and task routes
pub mod plans;

/// Feedback submission and moderation routes
pub mod feedback;

/// Subscription and access gate routes
pub mod subscriptions;

/// Smoking profile and savings routes
pub mod smoking;

pub use auth::AuthRoutes;
pub use feedback::FeedbackRoutes;
pub use health::HealthRoutes;
pub use plans::PlanRoutes;
pub use requests::RequestRoutes;
pub use smoking::SmokingRoutes;
pub use subscriptions::SubscriptionRoutes;
