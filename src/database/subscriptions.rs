// ABOUTME: Database operations for subscriptions and the coach access gate
// ABOUTME: Coach features require an active plus or premium package that has not expired
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Subscription package tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPackage {
    /// No paid features
    #[default]
    Free,
    /// Coach access
    Plus,
    /// Coach access plus premium content
    Premium,
}

impl SubscriptionPackage {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Plus => "plus",
            Self::Premium => "premium",
        }
    }

    /// Parse from database string representation (case-insensitive)
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "plus" => Self::Plus,
            "premium" => Self::Premium,
            _ => Self::Free,
        }
    }
}

/// A user's subscription record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier
    pub id: Uuid,
    /// Subscribed user
    pub user_id: Uuid,
    /// Package tier
    pub package: SubscriptionPackage,
    /// Whether the subscription is currently marked active
    pub is_active: bool,
    /// Expiry; `None` means no expiry
    pub end_date: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the package grants coach access at all
    #[must_use]
    pub const fn has_plus_or_premium(&self) -> bool {
        matches!(
            self.package,
            SubscriptionPackage::Plus | SubscriptionPackage::Premium
        )
    }

    /// Whether the subscription is active at `now`
    ///
    /// Free subscriptions never expire; paid ones must be marked active
    /// and either carry no end date or one at or after `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        match self.package {
            SubscriptionPackage::Free => true,
            SubscriptionPackage::Plus | SubscriptionPackage::Premium => {
                self.end_date.is_none_or(|end| end >= now)
            }
        }
    }

    /// The coach access gate
    ///
    /// Denies when no subscription exists or the package is free;
    /// otherwise requires a plus/premium package that is active at `now`.
    #[must_use]
    pub fn can_access_coach(subscription: Option<&Self>, now: DateTime<Utc>) -> bool {
        subscription
            .is_some_and(|sub| sub.has_plus_or_premium() && sub.is_active_at(now))
    }
}

fn row_to_subscription(row: &SqliteRow) -> AppResult<Subscription> {
    let id: String = row
        .try_get("id")
        .map_err(|e| AppError::database(format!("Failed to get id: {e}")))?;
    let user_id: String = row
        .try_get("user_id")
        .map_err(|e| AppError::database(format!("Failed to get user_id: {e}")))?;
    let package: String = row
        .try_get("package")
        .map_err(|e| AppError::database(format!("Failed to get package: {e}")))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| AppError::database(format!("Failed to get status: {e}")))?;

    Ok(Subscription {
        id: Uuid::parse_str(&id)?,
        user_id: Uuid::parse_str(&user_id)?,
        package: SubscriptionPackage::parse(&package),
        is_active: status == "active",
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

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, package, status, end_date, created_at, updated_at";

/// Subscription database operations manager
pub struct SubscriptionManager {
    pool: SqlitePool,
}

impl SubscriptionManager {
    /// Create a new subscription manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a subscription for a user (admin operation)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn create(
        &self,
        user_id: Uuid,
        package: SubscriptionPackage,
        end_date: Option<DateTime<Utc>>,
    ) -> AppResult<Subscription> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r"
            INSERT INTO subscriptions (id, user_id, package, status, end_date, created_at, updated_at)
            VALUES ($1, $2, $3, 'active', $4, $5, $5)
            ",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(package.as_str())
        .bind(end_date)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create subscription: {e}")))?;

        Ok(Subscription {
            id,
            user_id,
            package,
            is_active: true,
            end_date,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a user's most recent subscription, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_for_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        row.as_ref().map(row_to_subscription).transpose()
    }

    /// Deactivate a subscription (admin operation)
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn deactivate(&self, subscription_id: Uuid) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE subscriptions SET status = 'inactive', updated_at = $1 WHERE id = $2")
                .bind(Utc::now())
                .bind(subscription_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::database(format!("Failed to deactivate subscription: {e}"))
                })?;

        Ok(result.rows_affected() > 0)
    }

    /// The access gate as seen by route handlers
    ///
    /// A storage failure degrades to "no subscription" (denied) with a
    /// warning instead of surfacing a 500; the gate is never the reason a
    /// request blows up.
    pub async fn can_access_coach(&self, user_id: Uuid, now: DateTime<Utc>) -> bool {
        match self.get_for_user(user_id).await {
            Ok(subscription) => Subscription::can_access_coach(subscription.as_ref(), now),
            Err(e) => {
                tracing::warn!("Subscription lookup failed for {user_id}; denying coach access: {e}");
                false
            }
        }
    }
}
