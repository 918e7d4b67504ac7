// ABOUTME: Plan cancellation, including reconciliation of duplicate active plans
// ABOUTME: Deactivates every active plan in one transaction and verifies the invariant after commit
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Deactivate every active plan for the user and release the template
/// selections of the goals those plans served.
///
/// Rows written before the single-active-plan invariant was enforced can
/// leave a user with several active plans; cancellation sweeps them all
/// in one transaction and re-checks the invariant afterwards. Returns
/// the number of plans deactivated.
pub(crate) async fn cancel_active_plan(db: &Database, user_id: Uuid) -> AppResult<u32> {
    let active = db.plans().find_active_plans(user_id).await?;
    if active.is_empty() {
        return Err(AppError::no_active_plan(user_id));
    }
    if active.len() > 1 {
        warn!(
            user_id = %user_id,
            count = active.len(),
            "multiple active plans found; reconciling"
        );
    }

    let goal_ids: HashSet<Uuid> = active.iter().map(|p| p.goal_id).collect();

    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

    sqlx::query("UPDATE plans SET is_active = 0 WHERE user_id = $1 AND is_active = 1")
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to deactivate plans: {e}")))?;

    for goal_id in &goal_ids {
        sqlx::query("UPDATE template_selections SET scheduled = 0 WHERE goal_id = $1")
            .bind(goal_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to release selections: {e}")))?;
    }

    tx.commit()
        .await
        .map_err(|e| AppError::database(format!("Failed to commit cancellation: {e}")))?;

    // Post-commit invariant check: nothing may remain active
    let remaining = db.plans().find_active_plans(user_id).await?;
    if !remaining.is_empty() {
        return Err(AppError::internal(format!(
            "{} plan(s) still active after cancellation",
            remaining.len()
        )));
    }

    let cancelled = active.len() as u32;
    info!(user_id = %user_id, cancelled, "active plans cancelled");
    Ok(cancelled)
}
