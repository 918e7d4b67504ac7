// ABOUTME: Database operations for per-exercise completion records
// ABOUTME: Enforces the one-record-per-(user, entry, date) invariant via upserts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

use super::rows::{parse_date, parse_datetime, parse_uuid, to_u32};
use crate::errors::{AppError, AppResult};
use crate::models::CompletionRecord;
use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

/// Database manager for completion records
pub struct CompletionManager {
    pool: SqlitePool,
}

impl CompletionManager {
    /// Create a new completion manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or update the completion record for (user, entry, date).
    ///
    /// The uniqueness constraint makes re-marking idempotent: a second
    /// call updates the existing row in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn upsert(&self, record: &CompletionRecord) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO completion_records (id, user_id, plan_entry_id, completed_on,
                                            actual_sets, actual_reps, actual_duration_minutes,
                                            calories_burned, rating, note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT(user_id, plan_entry_id, completed_on) DO UPDATE SET
                actual_sets = excluded.actual_sets,
                actual_reps = excluded.actual_reps,
                actual_duration_minutes = excluded.actual_duration_minutes,
                calories_burned = excluded.calories_burned,
                rating = excluded.rating,
                note = excluded.note,
                updated_at = excluded.updated_at
            ",
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(record.plan_entry_id.to_string())
        .bind(record.completed_on.to_string())
        .bind(record.actual_sets.map(i64::from))
        .bind(record.actual_reps.map(i64::from))
        .bind(record.actual_duration_minutes.map(i64::from))
        .bind(record.calories_burned)
        .bind(i64::from(record.rating))
        .bind(&record.note)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert completion record: {e}")))?;

        Ok(())
    }

    /// Get the completion record for (user, entry, date), if any
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get(
        &self,
        user_id: Uuid,
        plan_entry_id: Uuid,
        completed_on: NaiveDate,
    ) -> AppResult<Option<CompletionRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, plan_entry_id, completed_on, actual_sets, actual_reps,
                   actual_duration_minutes, calories_burned, rating, note,
                   created_at, updated_at
            FROM completion_records
            WHERE user_id = $1 AND plan_entry_id = $2 AND completed_on = $3
            ",
        )
        .bind(user_id.to_string())
        .bind(plan_entry_id.to_string())
        .bind(completed_on.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get completion record: {e}")))?;

        row.map(|r| row_to_completion(&r)).transpose()
    }

    /// Which of the given entries already have a record for the date
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn completed_entry_ids_for_date(
        &self,
        user_id: Uuid,
        entry_ids: &[Uuid],
        completed_on: NaiveDate,
    ) -> AppResult<HashSet<Uuid>> {
        if entry_ids.is_empty() {
            return Ok(HashSet::new());
        }

        // Parameterized IN clause sized to the id list
        let placeholders = vec!["?"; entry_ids.len()].join(", ");
        let query = format!(
            r"
            SELECT plan_entry_id
            FROM completion_records
            WHERE user_id = ? AND completed_on = ? AND plan_entry_id IN ({placeholders})
            "
        );

        let mut sql_query = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(completed_on.to_string());
        for entry_id in entry_ids {
            sql_query = sql_query.bind(entry_id.to_string());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to query completions: {e}")))?;

        rows.iter()
            .map(|r| {
                let id: String = r.get("plan_entry_id");
                parse_uuid(&id, "completion_records.plan_entry_id")
            })
            .collect()
    }

    /// Distinct dates on which any of the plan's entries was completed
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn completed_dates_for_plan(&self, plan_id: Uuid) -> AppResult<HashSet<NaiveDate>> {
        let rows = sqlx::query(
            r"
            SELECT DISTINCT c.completed_on
            FROM completion_records c
            JOIN plan_entries e ON e.id = c.plan_entry_id
            WHERE e.plan_id = $1
            ",
        )
        .bind(plan_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to query completed dates: {e}")))?;

        rows.iter()
            .map(|r| {
                let date: String = r.get("completed_on");
                parse_date(&date, "completion_records.completed_on")
            })
            .collect()
    }
}

/// Convert a database row to a `CompletionRecord`
pub(crate) fn row_to_completion(row: &SqliteRow) -> AppResult<CompletionRecord> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let plan_entry_id: String = row.get("plan_entry_id");
    let completed_on: String = row.get("completed_on");
    let actual_sets: Option<i64> = row.get("actual_sets");
    let actual_reps: Option<i64> = row.get("actual_reps");
    let actual_duration_minutes: Option<i64> = row.get("actual_duration_minutes");
    let rating: i64 = row.get("rating");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(CompletionRecord {
        id: parse_uuid(&id, "completion_records.id")?,
        user_id: parse_uuid(&user_id, "completion_records.user_id")?,
        plan_entry_id: parse_uuid(&plan_entry_id, "completion_records.plan_entry_id")?,
        completed_on: parse_date(&completed_on, "completion_records.completed_on")?,
        actual_sets: actual_sets.map(to_u32),
        actual_reps: actual_reps.map(to_u32),
        actual_duration_minutes: actual_duration_minutes.map(to_u32),
        calories_burned: row.get("calories_burned"),
        rating: to_u32(rating),
        note: row.get("note"),
        created_at: parse_datetime(&created_at, "completion_records.created_at")?,
        updated_at: parse_datetime(&updated_at, "completion_records.updated_at")?,
    })
}
