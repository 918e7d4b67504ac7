// ABOUTME: Database operations for the workout template catalog and selection baskets
// ABOUTME: Read-only template access for the core plus selection flag management
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

use super::rows::{is_unique_violation, parse_datetime, parse_uuid, to_u32};
use crate::errors::{AppError, AppResult};
use crate::models::{SkillLevel, Template, TemplateEntry, TemplateSelection};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Filter options for listing templates
#[derive(Debug, Clone, Default)]
pub struct ListTemplatesFilter {
    /// Filter by goal category
    pub goal_type: Option<String>,
    /// Filter by skill level
    pub skill_level: Option<SkillLevel>,
    /// Maximum number of results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

/// Database manager for the template catalog.
///
/// Templates are owned by the catalog service and immutable from the
/// core's perspective; the writes here exist for seeding and for the
/// selection basket.
pub struct TemplateCatalog {
    pool: SqlitePool,
}

impl TemplateCatalog {
    /// Create a new template catalog
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Template Operations
    // ========================================================================

    /// Insert a template (seeding/catalog sync)
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub async fn create_template(&self, template: &Template) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO templates (id, name, goal_type, skill_level, duration_weeks,
                                   baseline_calories, average_rating, usage_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(template.id.to_string())
        .bind(&template.name)
        .bind(&template.goal_type)
        .bind(template.skill_level.as_str())
        .bind(i64::from(template.duration_weeks))
        .bind(template.baseline_calories)
        .bind(template.average_rating)
        .bind(i64::from(template.usage_count))
        .bind(template.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create template: {e}")))?;

        Ok(())
    }

    /// Insert a template entry (seeding/catalog sync)
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub async fn create_entry(&self, entry: &TemplateEntry) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO template_entries (id, template_id, name, sets, reps,
                                          duration_minutes, rest_seconds, week_index,
                                          day_of_week, display_order, video_url, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(entry.id.to_string())
        .bind(entry.template_id.to_string())
        .bind(&entry.name)
        .bind(entry.sets.map(i64::from))
        .bind(entry.reps.map(i64::from))
        .bind(entry.duration_minutes.map(i64::from))
        .bind(entry.rest_seconds.map(i64::from))
        .bind(entry.week_index.map(i64::from))
        .bind(entry.day_of_week.map(i64::from))
        .bind(i64::from(entry.display_order))
        .bind(&entry.video_url)
        .bind(&entry.notes)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create template entry: {e}")))?;

        Ok(())
    }

    /// Get a template by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_template(&self, template_id: Uuid) -> AppResult<Option<Template>> {
        let row = sqlx::query(
            r"
            SELECT id, name, goal_type, skill_level, duration_weeks,
                   baseline_calories, average_rating, usage_count, created_at
            FROM templates
            WHERE id = $1
            ",
        )
        .bind(template_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get template: {e}")))?;

        row.map(|r| row_to_template(&r)).transpose()
    }

    /// List templates with optional filtering by goal type and skill level
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_templates(&self, filter: &ListTemplatesFilter) -> AppResult<Vec<Template>> {
        let limit_val = i32::try_from(filter.limit.unwrap_or(50)).unwrap_or(50);
        let offset_val = i32::try_from(filter.offset.unwrap_or(0)).unwrap_or(0);

        // Build dynamic query with parameterized conditions
        let mut conditions = Vec::new();
        let mut bind_values: Vec<String> = Vec::new();

        if let Some(ref goal_type) = filter.goal_type {
            conditions.push("goal_type = ?".to_owned());
            bind_values.push(goal_type.clone());
        }
        if let Some(ref level) = filter.skill_level {
            conditions.push("skill_level = ?".to_owned());
            bind_values.push(level.as_str().to_owned());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            r"
            SELECT id, name, goal_type, skill_level, duration_weeks,
                   baseline_calories, average_rating, usage_count, created_at
            FROM templates
            {where_clause}
            ORDER BY average_rating DESC, usage_count DESC, name ASC
            LIMIT ? OFFSET ?
            "
        );

        let mut sql_query = sqlx::query(&query);
        for value in &bind_values {
            sql_query = sql_query.bind(value);
        }
        sql_query = sql_query.bind(limit_val).bind(offset_val);

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list templates: {e}")))?;

        rows.iter().map(row_to_template).collect()
    }

    /// Get a template's entries in materialization order: display order,
    /// then week, then day-of-week
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn entries_for_template(&self, template_id: Uuid) -> AppResult<Vec<TemplateEntry>> {
        let rows = sqlx::query(
            r"
            SELECT id, template_id, name, sets, reps, duration_minutes, rest_seconds,
                   week_index, day_of_week, display_order, video_url, notes
            FROM template_entries
            WHERE template_id = $1
            ORDER BY display_order ASC, week_index ASC, day_of_week ASC
            ",
        )
        .bind(template_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get template entries: {e}")))?;

        rows.iter().map(row_to_template_entry).collect()
    }

    // ========================================================================
    // Selection Basket Operations
    // ========================================================================

    /// Add a template to a goal's selection basket
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` when the template is already in the
    /// basket for this goal
    pub async fn add_selection(
        &self,
        goal_id: Uuid,
        template_id: Uuid,
    ) -> AppResult<TemplateSelection> {
        let selection = TemplateSelection {
            id: Uuid::new_v4(),
            goal_id,
            template_id,
            scheduled: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            r"
            INSERT INTO template_selections (id, goal_id, template_id, scheduled, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(selection.id.to_string())
        .bind(goal_id.to_string())
        .bind(template_id.to_string())
        .bind(selection.scheduled)
        .bind(selection.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict(
                    "template already selected for this goal",
                    template_id.to_string(),
                )
            } else {
                AppError::database(format!("Failed to add selection: {e}"))
            }
        })?;

        Ok(selection)
    }

    /// List a goal's selections
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn selections_for_goal(&self, goal_id: Uuid) -> AppResult<Vec<TemplateSelection>> {
        let rows = sqlx::query(
            r"
            SELECT id, goal_id, template_id, scheduled, created_at
            FROM template_selections
            WHERE goal_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(goal_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list selections: {e}")))?;

        rows.iter().map(row_to_selection).collect()
    }

    /// Remove a selection from the basket
    ///
    /// # Errors
    ///
    /// Returns `ResourceLocked` while an active plan references the
    /// selection, `ResourceNotFound` when it does not exist
    pub async fn remove_selection(&self, selection_id: Uuid) -> AppResult<()> {
        let row = sqlx::query("SELECT scheduled FROM template_selections WHERE id = $1")
            .bind(selection_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get selection: {e}")))?;

        let Some(row) = row else {
            return Err(AppError::not_found("template selection"));
        };
        let scheduled: bool = row.get("scheduled");
        if scheduled {
            return Err(AppError::locked(
                "selection is referenced by an active plan",
            ));
        }

        sqlx::query("DELETE FROM template_selections WHERE id = $1")
            .bind(selection_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to remove selection: {e}")))?;

        Ok(())
    }
}

/// Convert a database row to a `Template`
pub(crate) fn row_to_template(row: &SqliteRow) -> AppResult<Template> {
    let id: String = row.get("id");
    let skill_level: String = row.get("skill_level");
    let duration_weeks: i64 = row.get("duration_weeks");
    let usage_count: i64 = row.get("usage_count");
    let created_at: String = row.get("created_at");

    Ok(Template {
        id: parse_uuid(&id, "templates.id")?,
        name: row.get("name"),
        goal_type: row.get("goal_type"),
        skill_level: SkillLevel::parse(&skill_level),
        duration_weeks: to_u32(duration_weeks),
        baseline_calories: row.get("baseline_calories"),
        average_rating: row.get("average_rating"),
        usage_count: to_u32(usage_count),
        created_at: parse_datetime(&created_at, "templates.created_at")?,
    })
}

/// Convert a database row to a `TemplateEntry`
pub(crate) fn row_to_template_entry(row: &SqliteRow) -> AppResult<TemplateEntry> {
    let id: String = row.get("id");
    let template_id: String = row.get("template_id");
    let sets: Option<i64> = row.get("sets");
    let reps: Option<i64> = row.get("reps");
    let duration_minutes: Option<i64> = row.get("duration_minutes");
    let rest_seconds: Option<i64> = row.get("rest_seconds");
    let week_index: Option<i64> = row.get("week_index");
    let day_of_week: Option<i64> = row.get("day_of_week");
    let display_order: i64 = row.get("display_order");

    Ok(TemplateEntry {
        id: parse_uuid(&id, "template_entries.id")?,
        template_id: parse_uuid(&template_id, "template_entries.template_id")?,
        name: row.get("name"),
        sets: sets.map(to_u32),
        reps: reps.map(to_u32),
        duration_minutes: duration_minutes.map(to_u32),
        rest_seconds: rest_seconds.map(to_u32),
        week_index: week_index.map(to_u32),
        day_of_week: day_of_week.map(to_u32),
        display_order: to_u32(display_order),
        video_url: row.get("video_url"),
        notes: row.get("notes"),
    })
}

/// Convert a database row to a `TemplateSelection`
pub(crate) fn row_to_selection(row: &SqliteRow) -> AppResult<TemplateSelection> {
    let id: String = row.get("id");
    let goal_id: String = row.get("goal_id");
    let template_id: String = row.get("template_id");
    let created_at: String = row.get("created_at");

    Ok(TemplateSelection {
        id: parse_uuid(&id, "template_selections.id")?,
        goal_id: parse_uuid(&goal_id, "template_selections.goal_id")?,
        template_id: parse_uuid(&template_id, "template_selections.template_id")?,
        scheduled: row.get("scheduled"),
        created_at: parse_datetime(&created_at, "template_selections.created_at")?,
    })
}
