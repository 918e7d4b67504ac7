// ABOUTME: Goal progress evaluation against the plan's scheduled days
// ABOUTME: Applies completion side effects atomically; re-evaluation after completion is a no-op
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{Goal, GoalProgressReport, Plan};
use crate::planner::ensure_anchor;
use crate::schedule;
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Evaluate whether the goal behind the user's plan is fully satisfied.
///
/// A goal is complete when the plan schedules at least one day and every
/// scheduled day carries at least one completion record. Extra records on
/// unscheduled days never count against the user.
///
/// On completion the goal is closed, the plan deactivated, and the goal's
/// template selections released, all in one transaction. Side effects
/// apply only while the plan is active: the evaluation falls back to the
/// user's most recent plan when no active one exists, so re-running after
/// completion (or after cancellation) reports the same result without
/// mutating anything.
pub(crate) async fn evaluate_goal_completion(
    db: &Database,
    user_id: Uuid,
) -> AppResult<GoalProgressReport> {
    let plan = match db.plans().get_active_plan(user_id).await? {
        Some(plan) => plan,
        None => db
            .plans()
            .get_latest_plan(user_id)
            .await?
            .ok_or_else(|| AppError::no_active_plan(user_id))?,
    };

    let goal = db
        .goals()
        .get_goal(plan.goal_id)
        .await?
        .ok_or_else(|| AppError::not_found("goal").with_resource_id(plan.goal_id.to_string()))?;
    let anchor = ensure_anchor(db, goal.id, goal.start_date).await?;

    let entries = db.plans().entries_for_plan(plan.id).await?;
    let mut scheduled: HashSet<NaiveDate> = HashSet::with_capacity(entries.len());
    for entry in &entries {
        scheduled.insert(schedule::resolve_slot(&entry.slot, anchor)?);
    }

    let completed = db.completions().completed_dates_for_plan(plan.id).await?;
    let completed_scheduled = scheduled.intersection(&completed).count();

    let is_complete = !scheduled.is_empty() && scheduled.is_subset(&completed);
    let report = GoalProgressReport {
        is_complete,
        scheduled_days: scheduled.len() as u32,
        completed_days: completed_scheduled as u32,
    };

    if is_complete && plan.is_active {
        apply_completion(db, &goal, &plan).await?;
        info!(
            user_id = %user_id,
            goal_id = %goal.id,
            plan_id = %plan.id,
            scheduled_days = report.scheduled_days,
            "goal completed; plan deactivated"
        );
    } else if is_complete {
        // Inactive plans (completed or cancelled) are report-only
        debug!(goal_id = %goal.id, plan_id = %plan.id, "plan inactive; evaluation is a no-op");
    }

    Ok(report)
}

/// Close the goal, deactivate the plan, and release the goal's template
/// selections in one transaction
async fn apply_completion(db: &Database, goal: &Goal, plan: &Plan) -> AppResult<()> {
    let now = Utc::now();
    let today = now.date_naive();
    // A pre-existing end date survives unless it lies in the future
    let end_date = goal.end_date.map_or(today, |d| d.min(today));

    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

    sqlx::query(
        r"
        UPDATE goals
        SET completed = 1, progress = 100, end_date = $1, updated_at = $2
        WHERE id = $3
        ",
    )
    .bind(end_date.to_string())
    .bind(now.to_rfc3339())
    .bind(goal.id.to_string())
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::database(format!("Failed to close goal: {e}")))?;

    sqlx::query("UPDATE plans SET is_active = 0 WHERE id = $1")
        .bind(plan.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to deactivate plan: {e}")))?;

    sqlx::query("UPDATE template_selections SET scheduled = 0 WHERE goal_id = $1")
        .bind(goal.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to release selections: {e}")))?;

    tx.commit()
        .await
        .map_err(|e| AppError::database(format!("Failed to commit goal completion: {e}")))?;

    Ok(())
}
