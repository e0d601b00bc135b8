// ABOUTME: Test helper module index
// ABOUTME: Exposes the axum oneshot request wrapper used by route tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching
#![allow(dead_code)]

pub mod axum_test;
