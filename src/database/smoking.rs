// ABOUTME: Database operations for smoking profiles and quit-progress arithmetic
// ABOUTME: Derives days smoke-free, cigarettes avoided, and money saved from the profile
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quitline Coaching

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// A user's smoking habits and quit date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokingProfile {
    /// Owning user
    pub user_id: Uuid,
    /// Cigarettes smoked per day before quitting
    pub cigarettes_per_day: u32,
    /// Price of one pack in the user's currency
    pub price_per_pack: f64,
    /// Cigarettes in one pack
    pub cigarettes_per_pack: u32,
    /// The day the user stopped smoking, if set
    pub quit_date: Option<NaiveDate>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Derived quit-progress numbers; computed on demand, never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsSummary {
    /// Full days since the quit date
    pub days_smoke_free: u32,
    /// Cigarettes not smoked since the quit date
    pub cigarettes_avoided: u64,
    /// Money not spent since the quit date
    pub money_saved: f64,
}

impl SmokingProfile {
    /// Derive the savings summary at `today`
    ///
    /// A missing or future quit date yields all zeros.
    #[must_use]
    pub fn savings_at(&self, today: NaiveDate) -> SavingsSummary {
        let days = self
            .quit_date
            .map_or(0, |quit| (today - quit).num_days().max(0));

        let days_smoke_free = u32::try_from(days).unwrap_or(u32::MAX);
        let cigarettes_avoided = u64::from(days_smoke_free) * u64::from(self.cigarettes_per_day);
        let money_saved = if self.cigarettes_per_pack == 0 {
            0.0
        } else {
            cigarettes_avoided as f64 / f64::from(self.cigarettes_per_pack) * self.price_per_pack
        };

        SavingsSummary {
            days_smoke_free,
            cigarettes_avoided,
            money_saved,
        }
    }
}

/// Fields supplied when creating or replacing a profile
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertProfileInput {
    /// Cigarettes smoked per day before quitting
    pub cigarettes_per_day: u32,
    /// Price of one pack
    pub price_per_pack: f64,
    /// Cigarettes in one pack; defaults to 20
    #[serde(default = "default_cigarettes_per_pack")]
    pub cigarettes_per_pack: u32,
    /// The day the user stopped smoking
    pub quit_date: Option<NaiveDate>,
}

const fn default_cigarettes_per_pack() -> u32 {
    20
}

fn row_to_profile(row: &SqliteRow) -> AppResult<SmokingProfile> {
    let user_id: String = row
        .try_get("user_id")
        .map_err(|e| AppError::database(format!("Failed to get user_id: {e}")))?;
    let cigarettes_per_day: i64 = row
        .try_get("cigarettes_per_day")
        .map_err(|e| AppError::database(format!("Failed to get cigarettes_per_day: {e}")))?;
    let cigarettes_per_pack: i64 = row
        .try_get("cigarettes_per_pack")
        .map_err(|e| AppError::database(format!("Failed to get cigarettes_per_pack: {e}")))?;

    Ok(SmokingProfile {
        user_id: Uuid::parse_str(&user_id)?,
        cigarettes_per_day: u32::try_from(cigarettes_per_day).unwrap_or(0),
        price_per_pack: row
            .try_get("price_per_pack")
            .map_err(|e| AppError::database(format!("Failed to get price_per_pack: {e}")))?,
        cigarettes_per_pack: u32::try_from(cigarettes_per_pack).unwrap_or(0),
        quit_date: row
            .try_get("quit_date")
            .map_err(|e| AppError::database(format!("Failed to get quit_date: {e}")))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::database(format!("Failed to get created_at: {e}")))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| AppError::database(format!("Failed to get updated_at: {e}")))?,
    })
}

/// Smoking profile database operations manager
pub struct SmokingProfileManager {
    pool: SqlitePool,
}

impl SmokingProfileManager {
    /// Create a new smoking profile manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create or replace a user's profile
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a negative pack price, database errors otherwise
    pub async fn upsert(
        &self,
        user_id: Uuid,
        input: &UpsertProfileInput,
    ) -> AppResult<SmokingProfile> {
        if input.price_per_pack < 0.0 {
            return Err(AppError::invalid_input("price_per_pack must not be negative"));
        }

        let now = Utc::now();
        sqlx::query(
            r"
            INSERT INTO smoking_profiles
                (user_id, cigarettes_per_day, price_per_pack, cigarettes_per_pack,
                 quit_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT(user_id) DO UPDATE SET
                cigarettes_per_day = excluded.cigarettes_per_day,
                price_per_pack = excluded.price_per_pack,
                cigarettes_per_pack = excluded.cigarettes_per_pack,
                quit_date = excluded.quit_date,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id.to_string())
        .bind(i64::from(input.cigarettes_per_day))
        .bind(input.price_per_pack)
        .bind(i64::from(input.cigarettes_per_pack))
        .bind(input.quit_date)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert smoking profile: {e}")))?;

        self.get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Smoking profile"))
    }

    /// Get a user's profile
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get(&self, user_id: Uuid) -> AppResult<Option<SmokingProfile>> {
        let row = sqlx::query(
            r"
            SELECT user_id, cigarettes_per_day, price_per_pack, cigarettes_per_pack,
                   quit_date, created_at, updated_at
            FROM smoking_profiles
            WHERE user_id = $1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Database query failed: {e}")))?;

        row.as_ref().map(row_to_profile).transpose()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn profile(per_day: u32, price: f64, quit: Option<&str>) -> SmokingProfile {
        let now = Utc::now();
        SmokingProfile {
            user_id: Uuid::new_v4(),
            cigarettes_per_day: per_day,
            price_per_pack: price,
            cigarettes_per_pack: 20,
            quit_date: quit.map(|q| q.parse().unwrap()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn savings_accumulate_per_day() {
        let p = profile(10, 8.0, Some("2025-01-01"));
        let summary = p.savings_at("2025-01-11".parse().unwrap());
        assert_eq!(summary.days_smoke_free, 10);
        assert_eq!(summary.cigarettes_avoided, 100);
        // 100 cigarettes = 5 packs at 8.0 each
        assert!((summary.money_saved - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_or_future_quit_date_yields_zeros() {
        let none = profile(10, 8.0, None);
        assert_eq!(none.savings_at("2025-01-11".parse().unwrap()).days_smoke_free, 0);

        let future = profile(10, 8.0, Some("2025-06-01"));
        let summary = future.savings_at("2025-01-11".parse().unwrap());
        assert_eq!(summary.days_smoke_free, 0);
        assert_eq!(summary.cigarettes_avoided, 0);
    }
}
