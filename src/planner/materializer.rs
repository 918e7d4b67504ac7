// ABOUTME: Materializes catalog templates or client previews into user-owned plans
// ABOUTME: Enforces the single-active-plan invariant and commits plan, entries, and flags atomically
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

use crate::calories::{estimate_calories, CalorieInput};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    Goal, Plan, PlanSource, PreviewEntry, ScheduleOverrides, SessionWindow, SkillLevel,
};
use crate::planner::ensure_anchor;
use crate::schedule;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Sqlite, Transaction};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One entry staged for insertion; coordinates are final at this point
struct DraftEntry {
    name: String,
    sets: Option<u32>,
    reps: Option<u32>,
    duration_minutes: Option<u32>,
    rest_seconds: Option<u32>,
    estimated_calories: f64,
    scheduled_date: Option<NaiveDate>,
    week_index: Option<u32>,
    day_of_week: Option<u32>,
    display_order: u32,
    session_window: Option<SessionWindow>,
    video_url: Option<String>,
}

/// Materialize a plan from selected catalog templates.
///
/// Template entries keep relative (week, day-of-week) coordinates;
/// caller-supplied overrides are applied by key or, for entries lacking
/// a relative position, consumed in declaration order.
pub(crate) async fn from_templates(
    db: &Database,
    user_id: Uuid,
    goal_id: Uuid,
    template_ids: &[Uuid],
    overrides: &ScheduleOverrides,
) -> AppResult<Plan> {
    if template_ids.is_empty() {
        return Err(AppError::invalid_input("no templates selected"));
    }

    let goal = db.goals().get_owned_goal(user_id, goal_id).await?;
    reject_if_active_plan(db, user_id).await?;
    let anchor = ensure_anchor(db, goal.id, goal.start_date).await?;

    // Missing ids are skipped; the operation fails only when none resolve
    let mut templates = Vec::new();
    for template_id in template_ids {
        match db.templates().get_template(*template_id).await? {
            Some(template) => templates.push(template),
            None => debug!(template_id = %template_id, "selected template no longer exists"),
        }
    }
    if templates.is_empty() {
        return Err(AppError::not_found("template").with_user_id(user_id));
    }

    let mut drafts = Vec::new();
    let mut unkeyed = overrides.unkeyed.iter();
    let mut display_order = 0_u32;

    for template in &templates {
        let entries = db.templates().entries_for_template(template.id).await?;
        for entry in entries {
            let relative = entry.relative_position();
            let assignment = match relative {
                Some(key) => overrides.keyed.get(&key),
                None => unkeyed.next(),
            };

            let (week, day_of_week) = match assignment
                .map(|a| (a.week, a.day_of_week))
                .or(relative)
            {
                Some(coordinates) => coordinates,
                None => {
                    return Err(AppError::invalid_input(format!(
                        "template entry '{}' has no relative position and no slot was supplied",
                        entry.name
                    )))
                }
            };
            // Validates the pair against the anchor math
            schedule::resolve_date(week, day_of_week, anchor)?;

            let estimated_calories = estimate_calories(&CalorieInput {
                duration_minutes: entry.duration_minutes,
                sets: entry.sets,
                reps: entry.reps,
                template_baseline: template.baseline_calories,
                goal_type: &goal.goal_type,
            });

            drafts.push(DraftEntry {
                name: entry.name,
                sets: entry.sets,
                reps: entry.reps,
                duration_minutes: entry.duration_minutes,
                rest_seconds: entry.rest_seconds,
                estimated_calories,
                scheduled_date: None,
                week_index: Some(week),
                day_of_week: Some(day_of_week),
                display_order,
                session_window: assignment.and_then(|a| a.window.clone()),
                video_url: entry.video_url,
            });
            display_order += 1;
        }
    }

    if drafts.is_empty() {
        return Err(AppError::invalid_input(
            "selected templates contain no exercises",
        ));
    }

    let sessions: BTreeSet<(u32, u32)> = drafts
        .iter()
        .filter_map(|d| d.week_index.zip(d.day_of_week))
        .collect();
    let session_count = sessions.len() as u32;

    let baseline_sum: f64 = templates
        .iter()
        .filter_map(|t| t.baseline_calories)
        .sum();
    let max_entry_week = drafts.iter().filter_map(|d| d.week_index).max().unwrap_or(1);
    let total_weeks = templates
        .iter()
        .map(|t| t.duration_weeks)
        .max()
        .unwrap_or(1)
        .max(max_entry_week);

    let name = if templates.len() == 1 {
        templates[0].name.clone()
    } else {
        format!("{} program", goal.goal_type)
    };
    let skill_level = templates
        .first()
        .map_or(SkillLevel::Beginner, |t| t.skill_level);

    let plan = build_plan(
        user_id,
        &goal,
        name,
        skill_level,
        total_weeks,
        session_count,
        duration_sum(&drafts),
        baseline_sum,
        PlanSource::Templates,
    );

    let selected_ids: Vec<Uuid> = templates.iter().map(|t| t.id).collect();
    let plan = commit_materialization(db, user_id, plan, &drafts, Some((goal.id, &selected_ids)))
        .await?;

    info!(
        user_id = %user_id,
        plan_id = %plan.id,
        templates = templates.len(),
        entries = drafts.len(),
        sessions = session_count,
        "plan materialized from templates"
    );
    Ok(plan)
}

/// Materialize a plan from a client-computed preview whose entries carry
/// authoritative calendar dates.
pub(crate) async fn from_preview(
    db: &Database,
    user_id: Uuid,
    goal_id: Uuid,
    entries: &[PreviewEntry],
) -> AppResult<Plan> {
    if entries.is_empty() {
        return Err(AppError::invalid_input("preview contains no entries"));
    }

    let goal = db.goals().get_owned_goal(user_id, goal_id).await?;
    reject_if_active_plan(db, user_id).await?;
    // The anchor is repaired even though preview dates bypass it, so
    // later relative lookups against this goal stay consistent
    ensure_anchor(db, goal.id, goal.start_date).await?;

    let mut drafts = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let estimated_calories = estimate_calories(&CalorieInput {
            duration_minutes: entry.duration_minutes,
            sets: entry.sets,
            reps: entry.reps,
            template_baseline: entry.baseline_calories,
            goal_type: &goal.goal_type,
        });

        drafts.push(DraftEntry {
            name: entry.name.clone(),
            sets: entry.sets,
            reps: entry.reps,
            duration_minutes: entry.duration_minutes,
            rest_seconds: entry.rest_seconds,
            estimated_calories,
            scheduled_date: Some(entry.scheduled_date),
            week_index: None,
            day_of_week: None,
            display_order: index as u32,
            session_window: entry.session_window.clone(),
            video_url: entry.video_url.clone(),
        });
    }

    let sessions: BTreeSet<NaiveDate> = drafts.iter().filter_map(|d| d.scheduled_date).collect();
    let session_count = sessions.len() as u32;

    let calorie_sum: f64 = entries
        .iter()
        .zip(&drafts)
        .map(|(entry, draft)| entry.baseline_calories.unwrap_or(draft.estimated_calories))
        .sum();

    // Week span counts schedule weeks, so dates straddling a Monday
    // boundary land in different weeks
    let total_weeks = match (sessions.iter().min(), sessions.iter().max()) {
        (Some(first), Some(last)) => {
            let week_start = schedule::first_monday(*first);
            ((*last - week_start).num_days() / 7 + 1) as u32
        }
        _ => 1,
    };

    let plan = build_plan(
        user_id,
        &goal,
        format!("{} schedule", goal.goal_type),
        SkillLevel::Beginner,
        total_weeks,
        session_count,
        duration_sum(&drafts),
        calorie_sum,
        PlanSource::Preview,
    );

    let plan = commit_materialization(db, user_id, plan, &drafts, None).await?;

    info!(
        user_id = %user_id,
        plan_id = %plan.id,
        entries = drafts.len(),
        sessions = session_count,
        "plan materialized from preview"
    );
    Ok(plan)
}

/// Reject materialization while any active plan exists, surfacing its id
/// so the caller can prompt for cancellation or completion
async fn reject_if_active_plan(db: &Database, user_id: Uuid) -> AppResult<()> {
    if let Some(existing) = db.plans().get_active_plan(user_id).await? {
        return Err(AppError::conflict(
            "an active plan already exists for this user",
            existing.id.to_string(),
        )
        .with_user_id(user_id));
    }
    Ok(())
}

fn duration_sum(drafts: &[DraftEntry]) -> f64 {
    drafts
        .iter()
        .filter_map(|d| d.duration_minutes)
        .map(f64::from)
        .sum()
}

#[allow(clippy::too_many_arguments)]
fn build_plan(
    user_id: Uuid,
    goal: &Goal,
    name: String,
    skill_level: SkillLevel,
    total_weeks: u32,
    session_count: u32,
    duration_sum: f64,
    calorie_sum: f64,
    source: PlanSource,
) -> Plan {
    let sessions = f64::from(session_count.max(1));
    Plan {
        id: Uuid::new_v4(),
        user_id,
        goal_id: goal.id,
        name,
        goal_type: goal.goal_type.clone(),
        skill_level,
        total_weeks: total_weeks.max(1),
        sessions_per_week: session_count,
        avg_minutes_per_session: duration_sum / sessions,
        avg_calories_per_session: calorie_sum / sessions,
        source,
        is_active: true,
        created_at: Utc::now(),
    }
}

/// Persist the plan, its entries, and the selection/usage updates as one
/// transaction, re-checking the single-active-plan invariant before any
/// write lands.
async fn commit_materialization(
    db: &Database,
    user_id: Uuid,
    mut plan: Plan,
    drafts: &[DraftEntry],
    selections: Option<(Uuid, &[Uuid])>,
) -> AppResult<Plan> {
    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

    // Optimistic re-check: a concurrent request may have materialized
    // between the initial precondition and this transaction
    let existing: Option<(String,)> =
        sqlx::query_as("SELECT id FROM plans WHERE user_id = $1 AND is_active = 1 LIMIT 1")
            .bind(user_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to re-check active plan: {e}")))?;
    if let Some((existing_id,)) = existing {
        return Err(
            AppError::conflict("an active plan already exists for this user", existing_id)
                .with_user_id(user_id),
        );
    }

    insert_plan(&mut tx, &mut plan).await?;

    for draft in drafts {
        insert_entry(&mut tx, plan.id, draft, plan.created_at).await?;
    }

    if let Some((goal_id, template_ids)) = selections {
        flag_selections_scheduled(&mut tx, goal_id, template_ids).await?;
        bump_template_usage(&mut tx, template_ids).await?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::database(format!("Failed to commit materialization: {e}")))?;

    Ok(plan)
}

/// Insert the plan row, retrying exactly once with a fresh id when the
/// generated identifier collides
async fn insert_plan(tx: &mut Transaction<'_, Sqlite>, plan: &mut Plan) -> AppResult<()> {
    for attempt in 0..2 {
        let result = sqlx::query(
            r"
            INSERT INTO plans (id, user_id, goal_id, name, goal_type, skill_level,
                               total_weeks, sessions_per_week, avg_minutes_per_session,
                               avg_calories_per_session, source, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(plan.id.to_string())
        .bind(plan.user_id.to_string())
        .bind(plan.goal_id.to_string())
        .bind(&plan.name)
        .bind(&plan.goal_type)
        .bind(plan.skill_level.as_str())
        .bind(i64::from(plan.total_weeks))
        .bind(i64::from(plan.sessions_per_week))
        .bind(plan.avg_minutes_per_session)
        .bind(plan.avg_calories_per_session)
        .bind(plan.source.as_str())
        .bind(plan.is_active)
        .bind(plan.created_at.to_rfc3339())
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => return Ok(()),
            Err(e) if attempt == 0 && crate::database::is_unique_violation(&e) => {
                warn!(plan_id = %plan.id, "plan id collided; retrying with a fresh id");
                plan.id = Uuid::new_v4();
            }
            Err(e) => return Err(AppError::database(format!("Failed to insert plan: {e}"))),
        }
    }
    Err(AppError::database("plan id collided twice"))
}

async fn insert_entry(
    tx: &mut Transaction<'_, Sqlite>,
    plan_id: Uuid,
    draft: &DraftEntry,
    created_at: DateTime<Utc>,
) -> AppResult<()> {
    let session_window = draft
        .session_window
        .as_ref()
        .filter(|w| !w.is_empty())
        .map(serde_json::to_string)
        .transpose()?;

    let mut entry_id = Uuid::new_v4();
    for attempt in 0..2 {
        let result = sqlx::query(
            r"
            INSERT INTO plan_entries (id, plan_id, name, sets, reps, duration_minutes,
                                      rest_seconds, estimated_calories, scheduled_date,
                                      week_index, day_of_week, display_order,
                                      session_window, video_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ",
        )
        .bind(entry_id.to_string())
        .bind(plan_id.to_string())
        .bind(&draft.name)
        .bind(draft.sets.map(i64::from))
        .bind(draft.reps.map(i64::from))
        .bind(draft.duration_minutes.map(i64::from))
        .bind(draft.rest_seconds.map(i64::from))
        .bind(draft.estimated_calories)
        .bind(draft.scheduled_date.map(|d| d.to_string()))
        .bind(draft.week_index.map(i64::from))
        .bind(draft.day_of_week.map(i64::from))
        .bind(i64::from(draft.display_order))
        .bind(session_window.as_deref())
        .bind(&draft.video_url)
        .bind(created_at.to_rfc3339())
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => return Ok(()),
            Err(e) if attempt == 0 && crate::database::is_unique_violation(&e) => {
                warn!(entry_id = %entry_id, "plan entry id collided; retrying with a fresh id");
                entry_id = Uuid::new_v4();
            }
            Err(e) => {
                return Err(AppError::database(format!(
                    "Failed to insert plan entry: {e}"
                )))
            }
        }
    }
    Err(AppError::database("plan entry id collided twice"))
}

/// Mark the consumed selections as scheduled so they cannot be deleted
/// out from under the plan
async fn flag_selections_scheduled(
    tx: &mut Transaction<'_, Sqlite>,
    goal_id: Uuid,
    template_ids: &[Uuid],
) -> AppResult<()> {
    let placeholders = vec!["?"; template_ids.len()].join(", ");
    let query = format!(
        "UPDATE template_selections SET scheduled = 1
         WHERE goal_id = ? AND template_id IN ({placeholders})"
    );

    let mut sql_query = sqlx::query(&query).bind(goal_id.to_string());
    for template_id in template_ids {
        sql_query = sql_query.bind(template_id.to_string());
    }
    sql_query
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to flag selections: {e}")))?;

    Ok(())
}

async fn bump_template_usage(
    tx: &mut Transaction<'_, Sqlite>,
    template_ids: &[Uuid],
) -> AppResult<()> {
    let placeholders = vec!["?"; template_ids.len()].join(", ");
    let query =
        format!("UPDATE templates SET usage_count = usage_count + 1 WHERE id IN ({placeholders})");

    let mut sql_query = sqlx::query(&query);
    for template_id in template_ids {
        sql_query = sql_query.bind(template_id.to_string());
    }
    sql_query
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to bump template usage: {e}")))?;

    Ok(())
}
