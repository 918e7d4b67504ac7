// ABOUTME: Database operations for materialized plans and their scheduled entries
// ABOUTME: Handles active-plan queries, per-date entry lookups, and dual-coordinate rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

use super::rows::{parse_date, parse_datetime, parse_uuid, to_u32};
use crate::errors::{AppError, AppResult};
use crate::models::{Plan, PlanEntry, PlanSource, ScheduleSlot, SessionWindow, SkillLevel};
use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Database manager for plan operations
pub struct PlanManager {
    pool: SqlitePool,
}

impl PlanManager {
    /// Create a new plan manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a plan by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_plan(&self, plan_id: Uuid) -> AppResult<Option<Plan>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, goal_id, name, goal_type, skill_level, total_weeks,
                   sessions_per_week, avg_minutes_per_session, avg_calories_per_session,
                   source, is_active, created_at
            FROM plans
            WHERE id = $1
            ",
        )
        .bind(plan_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get plan: {e}")))?;

        row.map(|r| row_to_plan(&r)).transpose()
    }

    /// Get the user's single active plan, if any.
    ///
    /// When duplicate-active rows exist the newest wins; the lifecycle
    /// manager repairs the duplication.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_active_plan(&self, user_id: Uuid) -> AppResult<Option<Plan>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, goal_id, name, goal_type, skill_level, total_weeks,
                   sessions_per_week, avg_minutes_per_session, avg_calories_per_session,
                   source, is_active, created_at
            FROM plans
            WHERE user_id = $1 AND is_active = 1
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get active plan: {e}")))?;

        row.map(|r| row_to_plan(&r)).transpose()
    }

    /// Get the user's most recent plan regardless of active flag.
    ///
    /// Lets the progress evaluator re-run as a no-op after the active
    /// plan has been deactivated on completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_latest_plan(&self, user_id: Uuid) -> AppResult<Option<Plan>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, goal_id, name, goal_type, skill_level, total_weeks,
                   sessions_per_week, avg_minutes_per_session, avg_calories_per_session,
                   source, is_active, created_at
            FROM plans
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get latest plan: {e}")))?;

        row.map(|r| row_to_plan(&r)).transpose()
    }

    /// Find every plan flagged active for the user.
    ///
    /// More than one result indicates a duplicate-active bug the
    /// lifecycle manager must reconcile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn find_active_plans(&self, user_id: Uuid) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, goal_id, name, goal_type, skill_level, total_weeks,
                   sessions_per_week, avg_minutes_per_session, avg_calories_per_session,
                   source, is_active, created_at
            FROM plans
            WHERE user_id = $1 AND is_active = 1
            ORDER BY created_at ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find active plans: {e}")))?;

        rows.iter().map(row_to_plan).collect()
    }

    /// Get a plan's entries in display order
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn entries_for_plan(&self, plan_id: Uuid) -> AppResult<Vec<PlanEntry>> {
        let rows = sqlx::query(
            r"
            SELECT id, plan_id, name, sets, reps, duration_minutes, rest_seconds,
                   estimated_calories, scheduled_date, week_index, day_of_week,
                   display_order, session_window, video_url, created_at
            FROM plan_entries
            WHERE plan_id = $1
            ORDER BY display_order ASC
            ",
        )
        .bind(plan_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get plan entries: {e}")))?;

        rows.iter().map(row_to_plan_entry).collect()
    }

    /// Get entries carrying an explicit date equal to the given one
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn entries_for_date(
        &self,
        plan_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Vec<PlanEntry>> {
        let rows = sqlx::query(
            r"
            SELECT id, plan_id, name, sets, reps, duration_minutes, rest_seconds,
                   estimated_calories, scheduled_date, week_index, day_of_week,
                   display_order, session_window, video_url, created_at
            FROM plan_entries
            WHERE plan_id = $1 AND scheduled_date = $2
            ORDER BY display_order ASC
            ",
        )
        .bind(plan_id.to_string())
        .bind(date.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get entries for date: {e}")))?;

        rows.iter().map(row_to_plan_entry).collect()
    }

    /// Get legacy entries matching relative (week, day-of-week)
    /// coordinates and lacking an explicit date
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn entries_for_coordinates(
        &self,
        plan_id: Uuid,
        week: u32,
        day_of_week: u32,
    ) -> AppResult<Vec<PlanEntry>> {
        let rows = sqlx::query(
            r"
            SELECT id, plan_id, name, sets, reps, duration_minutes, rest_seconds,
                   estimated_calories, scheduled_date, week_index, day_of_week,
                   display_order, session_window, video_url, created_at
            FROM plan_entries
            WHERE plan_id = $1 AND scheduled_date IS NULL
              AND week_index = $2 AND day_of_week = $3
            ORDER BY display_order ASC
            ",
        )
        .bind(plan_id.to_string())
        .bind(i64::from(week))
        .bind(i64::from(day_of_week))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get entries for coordinates: {e}")))?;

        rows.iter().map(row_to_plan_entry).collect()
    }

    /// Get a plan entry by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_entry(&self, entry_id: Uuid) -> AppResult<Option<PlanEntry>> {
        let row = sqlx::query(
            r"
            SELECT id, plan_id, name, sets, reps, duration_minutes, rest_seconds,
                   estimated_calories, scheduled_date, week_index, day_of_week,
                   display_order, session_window, video_url, created_at
            FROM plan_entries
            WHERE id = $1
            ",
        )
        .bind(entry_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get plan entry: {e}")))?;

        row.map(|r| row_to_plan_entry(&r)).transpose()
    }

    /// Get a plan entry that must belong to one of the user's plans
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the entry is missing or owned by
    /// another user
    pub async fn get_owned_entry(&self, user_id: Uuid, entry_id: Uuid) -> AppResult<PlanEntry> {
        let row = sqlx::query(
            r"
            SELECT e.id, e.plan_id, e.name, e.sets, e.reps, e.duration_minutes,
                   e.rest_seconds, e.estimated_calories, e.scheduled_date, e.week_index,
                   e.day_of_week, e.display_order, e.session_window, e.video_url,
                   e.created_at
            FROM plan_entries e
            JOIN plans p ON p.id = e.plan_id
            WHERE e.id = $1 AND p.user_id = $2
            ",
        )
        .bind(entry_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get plan entry: {e}")))?;

        row.map_or_else(
            || Err(AppError::not_found("plan entry").with_user_id(user_id)),
            |r| row_to_plan_entry(&r),
        )
    }
}

/// Convert a database row to a `Plan`
pub(crate) fn row_to_plan(row: &SqliteRow) -> AppResult<Plan> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let goal_id: String = row.get("goal_id");
    let skill_level: String = row.get("skill_level");
    let source: String = row.get("source");
    let total_weeks: i64 = row.get("total_weeks");
    let sessions_per_week: i64 = row.get("sessions_per_week");
    let created_at: String = row.get("created_at");

    Ok(Plan {
        id: parse_uuid(&id, "plans.id")?,
        user_id: parse_uuid(&user_id, "plans.user_id")?,
        goal_id: parse_uuid(&goal_id, "plans.goal_id")?,
        name: row.get("name"),
        goal_type: row.get("goal_type"),
        skill_level: SkillLevel::parse(&skill_level),
        total_weeks: to_u32(total_weeks),
        sessions_per_week: to_u32(sessions_per_week),
        avg_minutes_per_session: row.get("avg_minutes_per_session"),
        avg_calories_per_session: row.get("avg_calories_per_session"),
        source: PlanSource::parse(&source),
        is_active: row.get("is_active"),
        created_at: parse_datetime(&created_at, "plans.created_at")?,
    })
}

/// Convert a database row to a `PlanEntry`, reconstructing the schedule
/// slot from the dual-coordinate columns
pub(crate) fn row_to_plan_entry(row: &SqliteRow) -> AppResult<PlanEntry> {
    let id: String = row.get("id");
    let plan_id: String = row.get("plan_id");
    let sets: Option<i64> = row.get("sets");
    let reps: Option<i64> = row.get("reps");
    let duration_minutes: Option<i64> = row.get("duration_minutes");
    let rest_seconds: Option<i64> = row.get("rest_seconds");
    let scheduled_date: Option<String> = row.get("scheduled_date");
    let week_index: Option<i64> = row.get("week_index");
    let day_of_week: Option<i64> = row.get("day_of_week");
    let display_order: i64 = row.get("display_order");
    let session_window_json: Option<String> = row.get("session_window");
    let created_at: String = row.get("created_at");

    // Explicit dates are authoritative; legacy rows carry only the
    // relative pair
    let slot = match scheduled_date {
        Some(date) => ScheduleSlot::Explicit {
            date: parse_date(&date, "plan_entries.scheduled_date")?,
        },
        None => match (week_index, day_of_week) {
            (Some(week), Some(dow)) => ScheduleSlot::Relative {
                week: to_u32(week),
                day_of_week: to_u32(dow),
            },
            _ => {
                return Err(AppError::internal(format!(
                    "plan entry {id} has no schedule coordinates"
                )))
            }
        },
    };

    let session_window: Option<SessionWindow> = session_window_json
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .filter(|w: &SessionWindow| !w.is_empty());

    Ok(PlanEntry {
        id: parse_uuid(&id, "plan_entries.id")?,
        plan_id: parse_uuid(&plan_id, "plan_entries.plan_id")?,
        name: row.get("name"),
        sets: sets.map(to_u32),
        reps: reps.map(to_u32),
        duration_minutes: duration_minutes.map(to_u32),
        rest_seconds: rest_seconds.map(to_u32),
        estimated_calories: row.get("estimated_calories"),
        slot,
        display_order: to_u32(display_order),
        session_window,
        video_url: row.get("video_url"),
        created_at: parse_datetime(&created_at, "plan_entries.created_at")?,
    })
}
