// ABOUTME: Database management for the scheduling engine over SQLite
// ABOUTME: Owns the connection pool, idempotent migrations, and per-entity managers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

//! # Database Management
//!
//! `SQLite` persistence for goals, templates, plans, and completions.
//! Read paths and single-row writes live on per-entity managers; the
//! planner layer owns multi-row transactional flows directly on the pool.

/// Completion record storage with per-date upserts
pub mod completions;

/// Goal storage and anchor-date persistence
pub mod goals;

/// Plan and plan-entry storage
pub mod plans;

/// Template catalog and selection basket storage
pub mod templates;

/// In-memory database helpers for tests
pub mod test_utils;

mod rows;

pub(crate) use rows::is_unique_violation;

pub use completions::CompletionManager;
pub use goals::GoalManager;
pub use plans::PlanManager;
pub use templates::TemplateCatalog;

use crate::errors::{AppError, AppResult};
use sqlx::{Pool, Sqlite, SqlitePool};

/// Database handle for the scheduling engine
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:")
            && !database_url.contains("memory")
            && !database_url.contains('?')
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        let pool = SqlitePool::connect(&connection_options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the pool for transactional operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Goal manager bound to this database
    #[must_use]
    pub fn goals(&self) -> GoalManager {
        GoalManager::new(self.pool.clone())
    }

    /// Template catalog bound to this database
    #[must_use]
    pub fn templates(&self) -> TemplateCatalog {
        TemplateCatalog::new(self.pool.clone())
    }

    /// Plan manager bound to this database
    #[must_use]
    pub fn plans(&self) -> PlanManager {
        PlanManager::new(self.pool.clone())
    }

    /// Completion manager bound to this database
    #[must_use]
    pub fn completions(&self) -> CompletionManager {
        CompletionManager::new(self.pool.clone())
    }

    /// Run database migrations; safe to re-run
    ///
    /// # Errors
    ///
    /// Returns an error if a migration statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_goals().await?;
        self.migrate_templates().await?;
        self.migrate_plans().await?;
        self.migrate_completions().await?;
        Ok(())
    }

    async fn migrate_goals(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS goals (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                goal_type TEXT NOT NULL,
                target_value REAL,
                start_date TEXT NOT NULL,
                end_date TEXT,
                progress REAL NOT NULL DEFAULT 0,
                completed INTEGER NOT NULL DEFAULT 0,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create goals table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_goals_user ON goals(user_id, completed)")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create goals index: {e}")))?;

        Ok(())
    }

    async fn migrate_templates(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS templates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                goal_type TEXT NOT NULL,
                skill_level TEXT NOT NULL,
                duration_weeks INTEGER NOT NULL,
                baseline_calories REAL,
                average_rating REAL,
                usage_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create templates table: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS template_entries (
                id TEXT PRIMARY KEY,
                template_id TEXT NOT NULL REFERENCES templates(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                sets INTEGER,
                reps INTEGER,
                duration_minutes INTEGER,
                rest_seconds INTEGER,
                week_index INTEGER,
                day_of_week INTEGER,
                display_order INTEGER NOT NULL DEFAULT 0,
                video_url TEXT,
                notes TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create template_entries table: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS template_selections (
                id TEXT PRIMARY KEY,
                goal_id TEXT NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
                template_id TEXT NOT NULL REFERENCES templates(id),
                scheduled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                UNIQUE(goal_id, template_id)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::database(format!("Failed to create template_selections table: {e}"))
        })?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_template_entries_template
             ON template_entries(template_id, display_order)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create template index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_selections_goal ON template_selections(goal_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create selections index: {e}")))?;

        Ok(())
    }

    async fn migrate_plans(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS plans (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                goal_id TEXT NOT NULL REFERENCES goals(id),
                name TEXT NOT NULL,
                goal_type TEXT NOT NULL,
                skill_level TEXT NOT NULL,
                total_weeks INTEGER NOT NULL DEFAULT 1,
                sessions_per_week INTEGER NOT NULL DEFAULT 0,
                avg_minutes_per_session REAL NOT NULL DEFAULT 0,
                avg_calories_per_session REAL NOT NULL DEFAULT 0,
                source TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create plans table: {e}")))?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS plan_entries (
                id TEXT PRIMARY KEY,
                plan_id TEXT NOT NULL REFERENCES plans(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                sets INTEGER,
                reps INTEGER,
                duration_minutes INTEGER,
                rest_seconds INTEGER,
                estimated_calories REAL NOT NULL DEFAULT 0,
                scheduled_date TEXT,
                week_index INTEGER,
                day_of_week INTEGER,
                display_order INTEGER NOT NULL DEFAULT 0,
                session_window TEXT,
                video_url TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create plan_entries table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_plans_user_active ON plans(user_id, is_active)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create plans index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_plan_entries_plan
             ON plan_entries(plan_id, display_order)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create plan_entries index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_plan_entries_date ON plan_entries(scheduled_date)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create entry date index: {e}")))?;

        Ok(())
    }

    async fn migrate_completions(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS completion_records (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                plan_entry_id TEXT NOT NULL REFERENCES plan_entries(id) ON DELETE CASCADE,
                completed_on TEXT NOT NULL,
                actual_sets INTEGER,
                actual_reps INTEGER,
                actual_duration_minutes INTEGER,
                calories_burned REAL NOT NULL DEFAULT 0,
                rating INTEGER NOT NULL DEFAULT 5,
                note TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(user_id, plan_entry_id, completed_on)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::database(format!("Failed to create completion_records table: {e}"))
        })?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_completions_entry_date
             ON completion_records(plan_entry_id, completed_on)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create completions index: {e}")))?;

        Ok(())
    }
}
