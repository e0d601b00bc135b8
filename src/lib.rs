// ABOUTME: Main library entry point for the Quitline coaching API platform
// ABOUTME: Provides the REST API for quit-plan requests, plans, feedback, and subscriptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

#![deny(unsafe_code)]

//! # Quitline Server
//!
//! A REST backend for a smoking-cessation coaching service. Users track
//! their smoking status and request coach-guided quit plans; coaches review
//! requests, build plans out of stages and tasks, and collect feedback once
//! a plan completes.
//!
//! ## Features
//!
//! - **Quit-plan workflow**: request approval state machine with
//!   coach-gated transitions
//! - **Plan hierarchy**: coach-authored stages and tasks with per-actor
//!   permission checks
//! - **Access gating**: subscription-tier checks for coach features
//! - **Feedback**: one rating per (user, coach, plan) with admin moderation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use quitline_server::config::environment::ServerConfig;
//! use quitline_server::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     // Load configuration
//!     let config = ServerConfig::from_env()?;
//!
//!     println!("Quitline server configured with port: HTTP={}", config.http_port);
//!
//!     Ok(())
//! }
//! ```

/// Configuration management and persistence
pub mod config;

/// Authentication and session management
pub mod auth;

/// Quit-plan workflow database management
pub mod database;

/// Common data models shared across routes and storage
pub mod models;

/// `HTTP` routes for the coaching workflow
pub mod routes;

/// Production logging and structured output
pub mod logging;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Role-based permission system with `admin`, `coach`, `user` hierarchy
pub mod permissions;

/// Shared server state handed to route handlers
pub mod resources;

/// HTTP server assembly and startup
pub mod server;
