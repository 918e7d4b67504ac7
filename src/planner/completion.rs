// ABOUTME: Completion tracking for plan entries, per exercise and per session
// ABOUTME: Resolves a date's entries through explicit dates first, relative coordinates second
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{CompletionRecord, ExerciseActuals, PlanEntry};
use crate::planner::ensure_anchor;
use crate::schedule;
use chrono::{NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

/// Note recorded when a whole session is marked complete in one call
pub const SESSION_COMPLETED_NOTE: &str = "session completed";

/// Rating recorded when the caller supplies none
const DEFAULT_RATING: u32 = 5;

/// Entries scheduled for a date under the user's active plan.
///
/// Explicit dates win; only when no entry carries the date are legacy
/// relative coordinates translated through the goal's anchor Monday.
/// No active plan means an empty schedule, not an error.
pub(crate) async fn entries_for_date(
    db: &Database,
    user_id: Uuid,
    date: NaiveDate,
) -> AppResult<Vec<PlanEntry>> {
    let Some(plan) = db.plans().get_active_plan(user_id).await? else {
        return Ok(Vec::new());
    };

    let dated = db.plans().entries_for_date(plan.id, date).await?;
    if !dated.is_empty() {
        return Ok(dated);
    }

    let Some(goal) = db.goals().get_goal(plan.goal_id).await? else {
        debug!(plan_id = %plan.id, goal_id = %plan.goal_id, "plan references a missing goal");
        return Ok(Vec::new());
    };
    let anchor = ensure_anchor(db, goal.id, goal.start_date).await?;

    // Dates before the anchor have no relative representation
    let Ok((week, day_of_week)) = schedule::resolve_coordinates(date, anchor) else {
        return Ok(Vec::new());
    };

    db.plans()
        .entries_for_coordinates(plan.id, week, day_of_week)
        .await
}

/// Record that the user performed one exercise on a date.
///
/// Absent actuals default to the entry's planned values; re-marking the
/// same (entry, date) updates the existing record in place.
pub(crate) async fn mark_exercise_complete(
    db: &Database,
    user_id: Uuid,
    entry_id: Uuid,
    date: NaiveDate,
    actuals: &ExerciseActuals,
) -> AppResult<CompletionRecord> {
    let entry = db.plans().get_owned_entry(user_id, entry_id).await?;
    let rating = validate_rating(actuals.rating)?;

    let record = build_record(user_id, &entry, date, actuals, rating, actuals.note.clone());
    db.completions().upsert(&record).await?;

    info!(
        user_id = %user_id,
        entry_id = %entry_id,
        date = %date,
        "exercise marked complete"
    );

    // Re-read so a re-mark returns the stored row, not the candidate
    db.completions()
        .get(user_id, entry_id, date)
        .await?
        .ok_or_else(|| AppError::internal("completion record vanished after upsert"))
}

/// Mark every entry of a session complete on a date.
///
/// Inserts records only for entries that lack one, all in a single
/// transaction; returns the number of records inserted. Calling twice
/// with the same arguments inserts nothing the second time.
pub(crate) async fn mark_session_complete(
    db: &Database,
    user_id: Uuid,
    date: NaiveDate,
    entry_ids: &[Uuid],
) -> AppResult<u32> {
    if entry_ids.is_empty() {
        return Err(AppError::invalid_input("no entries in session"));
    }

    let mut entries = Vec::with_capacity(entry_ids.len());
    for entry_id in entry_ids {
        entries.push(db.plans().get_owned_entry(user_id, *entry_id).await?);
    }

    let already_done = db
        .completions()
        .completed_entry_ids_for_date(user_id, entry_ids, date)
        .await?;

    let pending: Vec<&PlanEntry> = entries
        .iter()
        .filter(|e| !already_done.contains(&e.id))
        .collect();
    if pending.is_empty() {
        debug!(user_id = %user_id, date = %date, "session already fully recorded");
        return Ok(0);
    }

    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

    for entry in &pending {
        let record = build_record(
            user_id,
            entry,
            date,
            &ExerciseActuals::default(),
            DEFAULT_RATING,
            Some(SESSION_COMPLETED_NOTE.to_owned()),
        );
        // DO NOTHING rather than DO UPDATE: a record racing in between
        // the read above and this insert already covers the entry
        sqlx::query(
            r"
            INSERT INTO completion_records (id, user_id, plan_entry_id, completed_on,
                                            actual_sets, actual_reps, actual_duration_minutes,
                                            calories_burned, rating, note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT(user_id, plan_entry_id, completed_on) DO NOTHING
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
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert completion record: {e}")))?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::database(format!("Failed to commit session completion: {e}")))?;

    let inserted = pending.len() as u32;
    info!(
        user_id = %user_id,
        date = %date,
        inserted,
        total = entry_ids.len(),
        "session marked complete"
    );
    Ok(inserted)
}

/// Whether every entry in the set has a completion record for the date.
/// An empty set is never reported complete.
pub(crate) async fn is_session_complete(
    db: &Database,
    user_id: Uuid,
    date: NaiveDate,
    entry_ids: &[Uuid],
) -> AppResult<bool> {
    if entry_ids.is_empty() {
        return Ok(false);
    }

    let completed = db
        .completions()
        .completed_entry_ids_for_date(user_id, entry_ids, date)
        .await?;
    Ok(entry_ids.iter().all(|id| completed.contains(id)))
}

fn validate_rating(rating: Option<u32>) -> AppResult<u32> {
    match rating {
        None => Ok(DEFAULT_RATING),
        Some(r) if (1..=5).contains(&r) => Ok(r),
        Some(r) => Err(AppError::out_of_range(format!(
            "rating must be between 1 and 5, got {r}"
        ))),
    }
}

fn build_record(
    user_id: Uuid,
    entry: &PlanEntry,
    date: NaiveDate,
    actuals: &ExerciseActuals,
    rating: u32,
    note: Option<String>,
) -> CompletionRecord {
    let now = Utc::now();
    CompletionRecord {
        id: Uuid::new_v4(),
        user_id,
        plan_entry_id: entry.id,
        completed_on: date,
        actual_sets: actuals.sets.or(entry.sets),
        actual_reps: actuals.reps.or(entry.reps),
        actual_duration_minutes: actuals.duration_minutes.or(entry.duration_minutes),
        calories_burned: actuals.calories.unwrap_or(entry.estimated_calories),
        rating,
        note,
        created_at: now,
        updated_at: now,
    }
}
