// ABOUTME: Database operations for user fitness goals and their anchor dates
// ABOUTME: Handles goal reads, ownership checks, and anchor-date repair persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

use super::rows::{parse_date, parse_datetime, parse_uuid};
use crate::errors::{AppError, AppResult};
use crate::models::{Goal, GoalMetadata};
use chrono::{NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Database manager for goal operations
pub struct GoalManager {
    pool: SqlitePool,
}

impl GoalManager {
    /// Create a new goal manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new goal
    ///
    /// # Errors
    ///
    /// Returns an error if the goal type is empty or the write fails
    pub async fn create_goal(&self, goal: &Goal) -> AppResult<()> {
        if goal.goal_type.trim().is_empty() {
            return Err(AppError::missing_field("goal_type"));
        }

        let notes = goal
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO goals (id, user_id, goal_type, target_value, start_date,
                               end_date, progress, completed, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(goal.id.to_string())
        .bind(goal.user_id.to_string())
        .bind(&goal.goal_type)
        .bind(goal.target_value)
        .bind(goal.start_date.to_string())
        .bind(goal.end_date.map(|d| d.to_string()))
        .bind(goal.progress)
        .bind(goal.completed)
        .bind(notes)
        .bind(goal.created_at.to_rfc3339())
        .bind(goal.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create goal: {e}")))?;

        Ok(())
    }

    /// Get a goal by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_goal(&self, goal_id: Uuid) -> AppResult<Option<Goal>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, goal_type, target_value, start_date, end_date,
                   progress, completed, notes, created_at, updated_at
            FROM goals
            WHERE id = $1
            ",
        )
        .bind(goal_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get goal: {e}")))?;

        row.map(|r| row_to_goal(&r)).transpose()
    }

    /// Get a goal that must exist and belong to the given user
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the goal is missing or owned by
    /// another user
    pub async fn get_owned_goal(&self, user_id: Uuid, goal_id: Uuid) -> AppResult<Goal> {
        match self.get_goal(goal_id).await? {
            Some(goal) if goal.user_id == user_id => Ok(goal),
            // Ownership failures read the same as missing rows to the caller
            _ => Err(AppError::not_found("goal").with_user_id(user_id)),
        }
    }

    /// Find the user's open (not completed) goal for a goal type
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn find_open_goal(
        &self,
        user_id: Uuid,
        goal_type: &str,
    ) -> AppResult<Option<Goal>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, goal_type, target_value, start_date, end_date,
                   progress, completed, notes, created_at, updated_at
            FROM goals
            WHERE user_id = $1 AND goal_type = $2 AND completed = 0
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(user_id.to_string())
        .bind(goal_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find open goal: {e}")))?;

        row.map(|r| row_to_goal(&r)).transpose()
    }

    /// Persist a corrected anchor start date
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn update_start_date(&self, goal_id: Uuid, start_date: NaiveDate) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE goals SET start_date = $1, updated_at = $2 WHERE id = $3
            ",
        )
        .bind(start_date.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(goal_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update goal start date: {e}")))?;

        Ok(())
    }
}

/// Convert a database row to a `Goal`
pub(crate) fn row_to_goal(row: &SqliteRow) -> AppResult<Goal> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let start_date: String = row.get("start_date");
    let end_date: Option<String> = row.get("end_date");
    let notes: Option<String> = row.get("notes");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    // Legacy rows may hold freeform text in the notes column; only a JSON
    // object that matches the side-channel shape becomes typed metadata
    let metadata: Option<GoalMetadata> =
        notes.as_deref().and_then(|s| serde_json::from_str(s).ok());

    Ok(Goal {
        id: parse_uuid(&id, "goals.id")?,
        user_id: parse_uuid(&user_id, "goals.user_id")?,
        goal_type: row.get("goal_type"),
        target_value: row.get("target_value"),
        start_date: parse_date(&start_date, "goals.start_date")?,
        end_date: end_date
            .map(|d| parse_date(&d, "goals.end_date"))
            .transpose()?,
        progress: row.get("progress"),
        completed: row.get("completed"),
        metadata,
        created_at: parse_datetime(&created_at, "goals.created_at")?,
        updated_at: parse_datetime(&updated_at, "goals.updated_at")?,
    })
}
