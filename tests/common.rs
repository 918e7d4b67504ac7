// ABOUTME: Shared seeding helpers for integration tests
// ABOUTME: Builds goals, templates, and template entries against an in-memory database
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(missing_docs, dead_code)]

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use fitplan_engine::database::Database;
use fitplan_engine::models::{Goal, SkillLevel, Template, TemplateEntry};
use uuid::Uuid;

/// Create an isolated in-memory test database
pub async fn create_test_db() -> Result<Database> {
    Ok(fitplan_engine::database::test_utils::create_test_db().await?)
}

/// A Monday, convenient as a schedule anchor
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn seed_goal(
    db: &Database,
    user_id: Uuid,
    start_date: NaiveDate,
    goal_type: &str,
) -> Result<Goal> {
    let now = Utc::now();
    let goal = Goal {
        id: Uuid::new_v4(),
        user_id,
        goal_type: goal_type.to_owned(),
        target_value: None,
        start_date,
        end_date: None,
        progress: 0.0,
        completed: false,
        metadata: None,
        created_at: now,
        updated_at: now,
    };
    db.goals().create_goal(&goal).await?;
    Ok(goal)
}

pub async fn seed_template(
    db: &Database,
    name: &str,
    goal_type: &str,
    duration_weeks: u32,
    baseline_calories: Option<f64>,
) -> Result<Template> {
    let template = Template {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        goal_type: goal_type.to_owned(),
        skill_level: SkillLevel::Beginner,
        duration_weeks,
        baseline_calories,
        average_rating: None,
        usage_count: 0,
        created_at: Utc::now(),
    };
    db.templates().create_template(&template).await?;
    Ok(template)
}

/// Shape of one template entry to seed; unset fields stay `None`
#[derive(Default)]
pub struct EntrySpec {
    pub name: &'static str,
    pub week: Option<u32>,
    pub day_of_week: Option<u32>,
    pub sets: Option<u32>,
    pub reps: Option<u32>,
    pub duration_minutes: Option<u32>,
}

pub async fn seed_entry(
    db: &Database,
    template_id: Uuid,
    display_order: u32,
    spec: EntrySpec,
) -> Result<TemplateEntry> {
    let entry = TemplateEntry {
        id: Uuid::new_v4(),
        template_id,
        name: spec.name.to_owned(),
        sets: spec.sets,
        reps: spec.reps,
        duration_minutes: spec.duration_minutes,
        rest_seconds: None,
        week_index: spec.week,
        day_of_week: spec.day_of_week,
        display_order,
        video_url: None,
        notes: None,
    };
    db.templates().create_entry(&entry).await?;
    Ok(entry)
}
