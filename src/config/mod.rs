// ABOUTME: Configuration management for the Quitline server
// ABOUTME: Environment-driven settings with development-friendly defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

/// Environment-based server configuration
pub mod environment;

pub use environment::ServerConfig;
