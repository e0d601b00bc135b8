// ABOUTME: Role-based permission system with admin, coach, user hierarchy
// ABOUTME: Maps roles to and from their database string representation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use serde::{Deserialize, Serialize};

/// Actor role carried in JWT claims and the users table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular member tracking a quit attempt
    #[default]
    User,
    /// Coach reviewing requests and authoring plans
    Coach,
    /// Platform administrator
    Admin,
}

impl UserRole {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Coach => "coach",
            Self::Admin => "admin",
        }
    }

    /// Parse from database string representation (case-insensitive)
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "coach" => Self::Coach,
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }

    /// Whether this role has administrator privileges
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this role may act as a coach
    #[must_use]
    pub const fn is_coach(self) -> bool {
        matches!(self, Self::Coach)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips() {
        for role in [UserRole::User, UserRole::Coach, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()), role);
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_defaults_to_user() {
        assert_eq!(UserRole::parse("Coach"), UserRole::Coach);
        assert_eq!(UserRole::parse("ADMIN"), UserRole::Admin);
        assert_eq!(UserRole::parse("something-else"), UserRole::User);
    }
}
