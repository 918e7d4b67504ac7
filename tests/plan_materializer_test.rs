// ABOUTME: Integration tests for plan materialization from templates and previews
// ABOUTME: Covers conflicts, anchor repair, overrides, aggregates, and selection flagging
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use common::{create_test_db, date, monday, seed_entry, seed_goal, seed_template, EntrySpec};
use fitplan_engine::errors::ErrorCode;
use fitplan_engine::models::{
    PlanSource, PreviewEntry, ScheduleOverrides, ScheduleSlot, SessionWindow, SlotAssignment,
};
use fitplan_engine::planner::PlanningService;
use fitplan_engine::schedule;
use uuid::Uuid;

#[tokio::test]
async fn test_materialize_from_single_template() -> Result<()> {
    let db = create_test_db().await?;
    let service = PlanningService::new(db.clone());
    let user_id = Uuid::new_v4();

    let goal = seed_goal(&db, user_id, monday(), "muscle-gain").await?;
    let template = seed_template(&db, "Beginner Strength", "muscle-gain", 2, Some(250.0)).await?;
    seed_entry(
        &db,
        template.id,
        0,
        EntrySpec {
            name: "Squats",
            week: Some(1),
            day_of_week: Some(1),
            sets: Some(3),
            reps: Some(10),
            ..EntrySpec::default()
        },
    )
    .await?;
    seed_entry(
        &db,
        template.id,
        1,
        EntrySpec {
            name: "Easy Run",
            week: Some(1),
            day_of_week: Some(3),
            duration_minutes: Some(30),
            ..EntrySpec::default()
        },
    )
    .await?;
    seed_entry(
        &db,
        template.id,
        2,
        EntrySpec {
            name: "Push-ups",
            week: Some(2),
            day_of_week: Some(3),
            sets: Some(3),
            reps: Some(12),
            ..EntrySpec::default()
        },
    )
    .await?;
    db.templates().add_selection(goal.id, template.id).await?;

    let plan = service
        .materialize_from_templates(
            user_id,
            goal.id,
            &[template.id],
            &ScheduleOverrides::default(),
        )
        .await?;

    assert!(plan.is_active);
    assert_eq!(plan.name, "Beginner Strength");
    assert_eq!(plan.source, PlanSource::Templates);
    // Three distinct (week, day) pairs
    assert_eq!(plan.sessions_per_week, 3);
    assert_eq!(plan.total_weeks, 2);

    let entries = db.plans().entries_for_plan(plan.id).await?;
    assert_eq!(entries.len(), 3);
    for entry in &entries {
        assert!(entry.slot.relative().is_some(), "template entries stay relative");
    }

    // Consumed selection is flagged and the template's usage bumped
    let selections = db.templates().selections_for_goal(goal.id).await?;
    assert!(selections.iter().all(|s| s.scheduled));
    let bumped = db.templates().get_template(template.id).await?.unwrap();
    assert_eq!(bumped.usage_count, 1);

    Ok(())
}

#[tokio::test]
async fn test_second_materialization_conflicts() -> Result<()> {
    let db = create_test_db().await?;
    let service = PlanningService::new(db.clone());
    let user_id = Uuid::new_v4();

    let goal = seed_goal(&db, user_id, monday(), "weight-loss").await?;
    let template = seed_template(&db, "Cardio Kickstart", "weight-loss", 1, None).await?;
    seed_entry(
        &db,
        template.id,
        0,
        EntrySpec {
            name: "Jog",
            week: Some(1),
            day_of_week: Some(2),
            duration_minutes: Some(20),
            ..EntrySpec::default()
        },
    )
    .await?;

    let first = service
        .materialize_from_templates(
            user_id,
            goal.id,
            &[template.id],
            &ScheduleOverrides::default(),
        )
        .await?;

    // The conflict is per user, not per goal: a request against a
    // different goal is refused just the same
    let other_goal = seed_goal(&db, user_id, monday(), "endurance").await?;
    let err = service
        .materialize_from_templates(
            user_id,
            other_goal.id,
            &[template.id],
            &ScheduleOverrides::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceAlreadyExists);
    // The conflicting plan's id is surfaced for the caller
    assert_eq!(err.context.resource_id.as_deref(), Some(first.id.to_string()).as_deref());

    Ok(())
}

#[tokio::test]
async fn test_anchor_repaired_during_materialization() -> Result<()> {
    let db = create_test_db().await?;
    let service = PlanningService::new(db.clone());
    let user_id = Uuid::new_v4();

    // 2024-01-10 is a Wednesday; the anchor must land on 2024-01-08
    let goal = seed_goal(&db, user_id, date(2024, 1, 10), "endurance").await?;
    let template = seed_template(&db, "Base Building", "endurance", 4, None).await?;
    seed_entry(
        &db,
        template.id,
        0,
        EntrySpec {
            name: "Long Ride",
            week: Some(2),
            day_of_week: Some(3),
            duration_minutes: Some(90),
            ..EntrySpec::default()
        },
    )
    .await?;

    service
        .materialize_from_templates(
            user_id,
            goal.id,
            &[template.id],
            &ScheduleOverrides::default(),
        )
        .await?;

    let repaired = db.goals().get_goal(goal.id).await?.unwrap();
    assert_eq!(repaired.start_date, date(2024, 1, 8));
    // (week 2, Wednesday) resolves through the repaired anchor
    assert_eq!(
        schedule::resolve_date(2, 3, repaired.start_date)?,
        date(2024, 1, 17)
    );

    Ok(())
}

#[tokio::test]
async fn test_unkeyed_override_positions_floating_entry() -> Result<()> {
    let db = create_test_db().await?;
    let service = PlanningService::new(db.clone());
    let user_id = Uuid::new_v4();

    let goal = seed_goal(&db, user_id, monday(), "mobility").await?;
    let template = seed_template(&db, "Stretch Basics", "mobility", 1, None).await?;
    // No relative position; the caller must supply a slot
    seed_entry(
        &db,
        template.id,
        0,
        EntrySpec {
            name: "Hip Openers",
            duration_minutes: Some(15),
            ..EntrySpec::default()
        },
    )
    .await?;

    let overrides = ScheduleOverrides {
        unkeyed: vec![SlotAssignment {
            week: 1,
            day_of_week: 2,
            window: Some(SessionWindow {
                time_of_day: Some("morning".into()),
                ..SessionWindow::default()
            }),
        }],
        ..ScheduleOverrides::default()
    };

    let plan = service
        .materialize_from_templates(user_id, goal.id, &[template.id], &overrides)
        .await?;

    let entries = db.plans().entries_for_plan(plan.id).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].slot,
        ScheduleSlot::Relative {
            week: 1,
            day_of_week: 2
        }
    );
    assert_eq!(
        entries[0]
            .session_window
            .as_ref()
            .and_then(|w| w.time_of_day.as_deref()),
        Some("morning")
    );

    Ok(())
}

#[tokio::test]
async fn test_floating_entry_without_override_rejected() -> Result<()> {
    let db = create_test_db().await?;
    let service = PlanningService::new(db.clone());
    let user_id = Uuid::new_v4();

    let goal = seed_goal(&db, user_id, monday(), "mobility").await?;
    let template = seed_template(&db, "Stretch Basics", "mobility", 1, None).await?;
    seed_entry(
        &db,
        template.id,
        0,
        EntrySpec {
            name: "Hip Openers",
            duration_minutes: Some(15),
            ..EntrySpec::default()
        },
    )
    .await?;

    let err = service
        .materialize_from_templates(
            user_id,
            goal.id,
            &[template.id],
            &ScheduleOverrides::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    Ok(())
}

#[tokio::test]
async fn test_missing_templates_are_skipped_but_not_all() -> Result<()> {
    let db = create_test_db().await?;
    let service = PlanningService::new(db.clone());
    let user_id = Uuid::new_v4();
    let goal = seed_goal(&db, user_id, monday(), "weight-loss").await?;

    // Every id unknown
    let err = service
        .materialize_from_templates(
            user_id,
            goal.id,
            &[Uuid::new_v4(), Uuid::new_v4()],
            &ScheduleOverrides::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);

    // One known, one unknown: the unknown id is ignored
    let template = seed_template(&db, "Cardio Kickstart", "weight-loss", 1, None).await?;
    seed_entry(
        &db,
        template.id,
        0,
        EntrySpec {
            name: "Jog",
            week: Some(1),
            day_of_week: Some(1),
            duration_minutes: Some(20),
            ..EntrySpec::default()
        },
    )
    .await?;
    let plan = service
        .materialize_from_templates(
            user_id,
            goal.id,
            &[template.id, Uuid::new_v4()],
            &ScheduleOverrides::default(),
        )
        .await?;
    assert_eq!(db.plans().entries_for_plan(plan.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_empty_template_list_rejected() -> Result<()> {
    let db = create_test_db().await?;
    let service = PlanningService::new(db.clone());
    let user_id = Uuid::new_v4();
    let goal = seed_goal(&db, user_id, monday(), "weight-loss").await?;

    let err = service
        .materialize_from_templates(user_id, goal.id, &[], &ScheduleOverrides::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    Ok(())
}

#[tokio::test]
async fn test_materialize_from_preview_uses_explicit_dates() -> Result<()> {
    let db = create_test_db().await?;
    let service = PlanningService::new(db.clone());
    let user_id = Uuid::new_v4();
    let goal = seed_goal(&db, user_id, monday(), "weight-loss").await?;

    let entries = vec![
        PreviewEntry {
            name: "Treadmill Intervals".into(),
            sets: None,
            reps: None,
            duration_minutes: Some(30),
            rest_seconds: None,
            scheduled_date: date(2024, 1, 9),
            session_window: None,
            baseline_calories: Some(220.0),
            video_url: None,
        },
        PreviewEntry {
            name: "Rowing".into(),
            sets: None,
            reps: None,
            duration_minutes: Some(20),
            rest_seconds: None,
            scheduled_date: date(2024, 1, 11),
            session_window: None,
            baseline_calories: None,
            video_url: None,
        },
    ];

    let plan = service
        .materialize_from_preview(user_id, goal.id, &entries)
        .await?;

    assert_eq!(plan.source, PlanSource::Preview);
    assert_eq!(plan.sessions_per_week, 2);
    let stored = db.plans().entries_for_plan(plan.id).await?;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].slot.explicit_date(), Some(date(2024, 1, 9)));
    assert_eq!(stored[1].slot.explicit_date(), Some(date(2024, 1, 11)));

    Ok(())
}

#[tokio::test]
async fn test_preview_weeks_count_schedule_weeks() -> Result<()> {
    let db = create_test_db().await?;
    let service = PlanningService::new(db.clone());
    let user_id = Uuid::new_v4();
    let goal = seed_goal(&db, user_id, monday(), "endurance").await?;

    // Sunday 2024-01-14 and Monday 2024-01-15 are a day apart but sit in
    // different schedule weeks
    let entries = vec![
        PreviewEntry {
            name: "Long Run".into(),
            sets: None,
            reps: None,
            duration_minutes: Some(60),
            rest_seconds: None,
            scheduled_date: date(2024, 1, 14),
            session_window: None,
            baseline_calories: None,
            video_url: None,
        },
        PreviewEntry {
            name: "Recovery Jog".into(),
            sets: None,
            reps: None,
            duration_minutes: Some(20),
            rest_seconds: None,
            scheduled_date: date(2024, 1, 15),
            session_window: None,
            baseline_calories: None,
            video_url: None,
        },
    ];

    let plan = service
        .materialize_from_preview(user_id, goal.id, &entries)
        .await?;
    assert_eq!(plan.total_weeks, 2);

    Ok(())
}

#[tokio::test]
async fn test_goal_ownership_enforced() -> Result<()> {
    let db = create_test_db().await?;
    let service = PlanningService::new(db.clone());
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();

    let goal = seed_goal(&db, owner, monday(), "muscle-gain").await?;
    let template = seed_template(&db, "Beginner Strength", "muscle-gain", 1, None).await?;

    let err = service
        .materialize_from_templates(
            intruder,
            goal.id,
            &[template.id],
            &ScheduleOverrides::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);

    Ok(())
}
