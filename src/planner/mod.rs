// ABOUTME: Request-scoped scheduling operations exposed through the PlanningService facade
// ABOUTME: Owns anchor repair and delegates to materializer, completion, progress, lifecycle
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

//! # Planner
//!
//! The engine's operation surface. Each method is one request-scoped unit
//! of work: multi-row mutations commit in a single transaction, and the
//! goal's anchor date is repaired before any materialization or lookup
//! that depends on it.

/// Completion tracking: per-exercise and per-session marking
pub mod completion;

/// Plan cancellation and duplicate-active reconciliation
pub mod lifecycle;

/// Template and preview plan materialization
pub mod materializer;

/// Goal progress evaluation and completion side effects
pub mod progress;

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    CompletionRecord, ExerciseActuals, Goal, GoalProgressReport, Plan, PlanEntry, PreviewEntry,
    ScheduleOverrides,
};
use crate::schedule;
use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

/// Facade over the scheduling engine's operations.
///
/// Wire format and routing are collaborator concerns; callers thread an
/// explicit `user_id` through every operation.
#[derive(Clone)]
pub struct PlanningService {
    db: Database,
}

impl PlanningService {
    /// Create a new planning service over a database handle
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the underlying database handle
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Get the user's active plan
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user has no active plan
    pub async fn get_active_plan(&self, user_id: Uuid) -> AppResult<Plan> {
        self.db
            .plans()
            .get_active_plan(user_id)
            .await?
            .ok_or_else(|| AppError::no_active_plan(user_id))
    }

    /// Find the user's newest open goal for a goal type, so callers can
    /// reuse it instead of opening a duplicate
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails
    pub async fn find_open_goal(
        &self,
        user_id: Uuid,
        goal_type: &str,
    ) -> AppResult<Option<Goal>> {
        self.db.goals().find_open_goal(user_id, goal_type).await
    }

    /// Get the entries scheduled for a date, checking explicit dates
    /// first and legacy relative coordinates second
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails
    pub async fn get_entries_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Vec<PlanEntry>> {
        completion::entries_for_date(&self.db, user_id, date).await
    }

    /// Materialize a plan from selected catalog templates
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` (carrying the existing plan id)
    /// when an active plan exists, `ResourceNotFound` when the goal or
    /// every template is missing
    pub async fn materialize_from_templates(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        template_ids: &[Uuid],
        overrides: &ScheduleOverrides,
    ) -> AppResult<Plan> {
        materializer::from_templates(&self.db, user_id, goal_id, template_ids, overrides).await
    }

    /// Materialize a plan from a client-computed preview of dated entries
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` when an active plan exists,
    /// `InvalidInput` when the preview is empty
    pub async fn materialize_from_preview(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        entries: &[PreviewEntry],
    ) -> AppResult<Plan> {
        materializer::from_preview(&self.db, user_id, goal_id, entries).await
    }

    /// Record that the user performed one exercise on a date
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the entry is not the user's,
    /// `ValueOutOfRange` for an invalid rating
    pub async fn mark_exercise_complete(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        date: NaiveDate,
        actuals: &ExerciseActuals,
    ) -> AppResult<CompletionRecord> {
        completion::mark_exercise_complete(&self.db, user_id, entry_id, date, actuals).await
    }

    /// Mark a whole session complete, inserting records only for entries
    /// that lack one; returns the number of records inserted
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty entry set, `ResourceNotFound`
    /// when an entry is not the user's
    pub async fn mark_session_complete(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        entry_ids: &[Uuid],
    ) -> AppResult<u32> {
        completion::mark_session_complete(&self.db, user_id, date, entry_ids).await
    }

    /// Whether every entry in the set has a completion record for the date
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails
    pub async fn is_session_complete(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        entry_ids: &[Uuid],
    ) -> AppResult<bool> {
        completion::is_session_complete(&self.db, user_id, date, entry_ids).await
    }

    /// Evaluate whether the goal behind the user's plan is fully
    /// satisfied, applying completion side effects when it is
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the user has no plan at all
    pub async fn evaluate_goal_completion(&self, user_id: Uuid) -> AppResult<GoalProgressReport> {
        progress::evaluate_goal_completion(&self.db, user_id).await
    }

    /// Deactivate every active plan for the user and release their
    /// template selections; returns the number of plans deactivated
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when no active plan exists
    pub async fn cancel_active_plan(&self, user_id: Uuid) -> AppResult<u32> {
        lifecycle::cancel_active_plan(&self.db, user_id).await
    }
}

/// Resolve a goal's anchor Monday, repairing drifted start dates.
///
/// Idempotent: a start date already on Monday is returned untouched and
/// nothing is logged or written. Safe to run redundantly from concurrent
/// readers since the corrected value is deterministic.
pub(crate) async fn ensure_anchor(
    db: &Database,
    goal_id: Uuid,
    start_date: NaiveDate,
) -> AppResult<NaiveDate> {
    if !schedule::needs_repair(start_date) {
        return Ok(start_date);
    }

    let corrected = schedule::first_monday(start_date);
    db.goals().update_start_date(goal_id, corrected).await?;
    warn!(
        goal_id = %goal_id,
        stored = %start_date,
        corrected = %corrected,
        "goal start date drifted off Monday; anchor repaired"
    );
    Ok(corrected)
}
