// ABOUTME: Typed domain model for goals, templates, plans, entries, and completions
// ABOUTME: Carries strongly-typed side-channel values that only serialize at the persistence boundary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

//! # Domain Model
//!
//! Core data structures shared across the engine. Free-form JSON that the
//! store keeps in text columns (session windows, goal metadata) is modeled
//! here as typed optional values; (de)serialization happens only in the
//! database layer's row converters.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// Enumerations
// ============================================================================

/// Skill level for templates and plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    /// Suitable for users with no prior training experience
    #[default]
    Beginner,
    /// Requires consistent training history
    Intermediate,
    /// For experienced athletes
    Advanced,
}

impl SkillLevel {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "intermediate" => Self::Intermediate,
            "advanced" => Self::Advanced,
            // Default to Beginner for unrecognized values
            _ => Self::Beginner,
        }
    }
}

/// Origin of a materialized plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// Materialized from one or more catalog templates
    #[default]
    Templates,
    /// Materialized from a client-computed preview with explicit dates
    Preview,
}

impl PlanSource {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Templates => "templates",
            Self::Preview => "preview",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "preview" => Self::Preview,
            _ => Self::Templates,
        }
    }
}

// ============================================================================
// Schedule Coordinates
// ============================================================================

/// Where a plan entry sits on the calendar.
///
/// Legacy rows carry only a relative (week, day-of-week) pair and are
/// translated through the plan's anchor Monday; modern rows carry an
/// explicit date which is always authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleSlot {
    /// An explicit calendar date
    Explicit {
        /// The scheduled date
        date: NaiveDate,
    },
    /// A relative position: week index 1..N, day-of-week 1 (Mon)..7 (Sun)
    Relative {
        /// 1-based week index
        week: u32,
        /// ISO day-of-week, 1 = Monday .. 7 = Sunday
        day_of_week: u32,
    },
}

impl ScheduleSlot {
    /// The explicit date, when this slot carries one
    #[must_use]
    pub const fn explicit_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Explicit { date } => Some(*date),
            Self::Relative { .. } => None,
        }
    }

    /// The relative coordinates, when this slot carries them
    #[must_use]
    pub const fn relative(&self) -> Option<(u32, u32)> {
        match self {
            Self::Explicit { .. } => None,
            Self::Relative { week, day_of_week } => Some((*week, *day_of_week)),
        }
    }
}

// ============================================================================
// Side-Channel Values
// ============================================================================

/// Session scheduling metadata stored alongside a plan entry.
///
/// Persisted as a JSON object in a text column; the wire shape
/// `{ timeOfDay, startTime, endTime }` is preserved for compatibility with
/// rows written by earlier versions of the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionWindow {
    /// Coarse time of day ("morning", "afternoon", "evening")
    #[serde(rename = "timeOfDay", skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    /// Session start time ("HH:MM")
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Session end time ("HH:MM")
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl SessionWindow {
    /// Whether the window carries any information at all
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.time_of_day.is_none() && self.start_time.is_none() && self.end_time.is_none()
    }
}

/// Goal metadata stored in the goal's notes text column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GoalMetadata {
    /// Where the user trains ("gym", "home", ...)
    #[serde(rename = "trainingLocation", skip_serializing_if = "Option::is_none")]
    pub training_location: Option<String>,
    /// Calendar dates excluded from scheduling
    #[serde(rename = "excludedDates", default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_dates: Vec<NaiveDate>,
}

// ============================================================================
// Goals
// ============================================================================

/// A user's fitness objective with a start/end window and completion state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Free-text goal category ("weight-loss", "muscle-gain", ...)
    pub goal_type: String,
    /// Target value, unit depends on the goal type
    pub target_value: Option<f64>,
    /// Schedule anchor; invariant: always a Monday once repaired
    pub start_date: NaiveDate,
    /// Optional end date, set on completion
    pub end_date: Option<NaiveDate>,
    /// Current progress percentage (0-100)
    pub progress: f64,
    /// Whether the goal has been completed
    pub completed: bool,
    /// Typed side-channel held in the notes column
    pub metadata: Option<GoalMetadata>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Templates
// ============================================================================

/// A reusable, catalog-owned workout definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Goal category this template serves
    pub goal_type: String,
    /// Skill level
    pub skill_level: SkillLevel,
    /// Duration in weeks
    pub duration_weeks: u32,
    /// Pre-computed baseline calorie estimate for one session
    pub baseline_calories: Option<f64>,
    /// Average user rating (1-5)
    pub average_rating: Option<f64>,
    /// How many plans have been materialized from this template
    pub usage_count: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One exercise inside a template, positioned relative to the plan start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEntry {
    /// Unique identifier
    pub id: Uuid,
    /// Owning template
    pub template_id: Uuid,
    /// Exercise name
    pub name: String,
    /// Planned sets
    pub sets: Option<u32>,
    /// Planned reps per set
    pub reps: Option<u32>,
    /// Planned duration in minutes
    pub duration_minutes: Option<u32>,
    /// Rest between sets in seconds
    pub rest_seconds: Option<u32>,
    /// 1-based week index; legacy rows may lack a relative position
    pub week_index: Option<u32>,
    /// ISO day-of-week (1 = Monday .. 7 = Sunday)
    pub day_of_week: Option<u32>,
    /// Display order within the template
    pub display_order: u32,
    /// Optional demonstration video reference
    pub video_url: Option<String>,
    /// Freeform notes
    pub notes: Option<String>,
}

impl TemplateEntry {
    /// The relative position, when both coordinates are present
    #[must_use]
    pub fn relative_position(&self) -> Option<(u32, u32)> {
        self.week_index.zip(self.day_of_week)
    }
}

/// A basket entry linking a goal to a chosen-but-not-yet-scheduled template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSelection {
    /// Unique identifier
    pub id: Uuid,
    /// Goal the template was picked for
    pub goal_id: Uuid,
    /// Selected template
    pub template_id: Uuid,
    /// True while an active plan references this selection
    pub scheduled: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Plans
// ============================================================================

/// A user-owned, calendar-anchored materialization of one or more templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Goal this plan works toward
    pub goal_id: Uuid,
    /// Display name
    pub name: String,
    /// Goal category
    pub goal_type: String,
    /// Skill level
    pub skill_level: SkillLevel,
    /// Total plan duration in weeks
    pub total_weeks: u32,
    /// Distinct scheduled session count recorded at materialization time
    pub sessions_per_week: u32,
    /// Average minutes per session
    pub avg_minutes_per_session: f64,
    /// Average calories per session
    pub avg_calories_per_session: f64,
    /// Where the plan came from
    pub source: PlanSource,
    /// Whether this is the user's working plan; at most one per user
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One scheduled exercise occurrence inside a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Unique identifier
    pub id: Uuid,
    /// Owning plan
    pub plan_id: Uuid,
    /// Exercise name
    pub name: String,
    /// Planned sets
    pub sets: Option<u32>,
    /// Planned reps per set
    pub reps: Option<u32>,
    /// Planned duration in minutes
    pub duration_minutes: Option<u32>,
    /// Rest between sets in seconds
    pub rest_seconds: Option<u32>,
    /// Calories estimated at creation time
    pub estimated_calories: f64,
    /// Calendar position: explicit date or relative coordinates
    pub slot: ScheduleSlot,
    /// Display order within the plan
    pub display_order: u32,
    /// Session time-of-day side-channel
    pub session_window: Option<SessionWindow>,
    /// Optional demonstration video reference
    pub video_url: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Completions
// ============================================================================

/// Evidence that a user performed a plan entry on a specific date.
///
/// At most one record exists per (user, entry, date); re-marking upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Unique identifier
    pub id: Uuid,
    /// User who performed the exercise
    pub user_id: Uuid,
    /// The plan entry that was performed
    pub plan_entry_id: Uuid,
    /// The calendar date of the session
    pub completed_on: NaiveDate,
    /// Sets actually performed
    pub actual_sets: Option<u32>,
    /// Reps actually performed
    pub actual_reps: Option<u32>,
    /// Minutes actually spent
    pub actual_duration_minutes: Option<u32>,
    /// Calories burned
    pub calories_burned: f64,
    /// Session quality rating (1-5)
    pub rating: u32,
    /// Freeform note
    pub note: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Actual performance values supplied when marking a single exercise
/// complete; absent fields default to the entry's planned values
#[derive(Debug, Clone, Default)]
pub struct ExerciseActuals {
    /// Sets actually performed
    pub sets: Option<u32>,
    /// Reps actually performed
    pub reps: Option<u32>,
    /// Minutes actually spent
    pub duration_minutes: Option<u32>,
    /// Calories burned
    pub calories: Option<f64>,
    /// Session quality rating (1-5)
    pub rating: Option<u32>,
    /// Freeform note
    pub note: Option<String>,
}

// ============================================================================
// Materialization Inputs
// ============================================================================

/// A user-chosen slot applied to template entries during materialization
#[derive(Debug, Clone)]
pub struct SlotAssignment {
    /// 1-based week index
    pub week: u32,
    /// ISO day-of-week (1 = Monday .. 7 = Sunday)
    pub day_of_week: u32,
    /// Optional session time-of-day metadata
    pub window: Option<SessionWindow>,
}

/// Schedule overrides supplied by the caller during template
/// materialization.
///
/// Entries with a relative position look up `keyed` by their
/// (week, day-of-week) pair; entries without one consume `unkeyed`
/// assignments in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ScheduleOverrides {
    /// Assignments keyed by the template entry's (week, day-of-week)
    pub keyed: HashMap<(u32, u32), SlotAssignment>,
    /// Assignments consumed in order by entries lacking a relative position
    pub unkeyed: Vec<SlotAssignment>,
}

impl ScheduleOverrides {
    /// Whether any override was supplied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyed.is_empty() && self.unkeyed.is_empty()
    }
}

/// One client-computed, explicitly dated exercise occurrence for the
/// preview materialization path
#[derive(Debug, Clone)]
pub struct PreviewEntry {
    /// Exercise name
    pub name: String,
    /// Planned sets
    pub sets: Option<u32>,
    /// Planned reps per set
    pub reps: Option<u32>,
    /// Planned duration in minutes
    pub duration_minutes: Option<u32>,
    /// Rest between sets in seconds
    pub rest_seconds: Option<u32>,
    /// Authoritative calendar date computed client-side
    pub scheduled_date: NaiveDate,
    /// Optional session time-of-day metadata
    pub session_window: Option<SessionWindow>,
    /// Optional per-entry baseline calorie figure
    pub baseline_calories: Option<f64>,
    /// Optional demonstration video reference
    pub video_url: Option<String>,
}

// ============================================================================
// Progress Reporting
// ============================================================================

/// Result of evaluating a goal against its plan's schedule
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GoalProgressReport {
    /// True when every scheduled day has at least one completion
    pub is_complete: bool,
    /// Number of distinct days the plan schedules
    pub scheduled_days: u32,
    /// Number of distinct days with at least one completion record
    pub completed_days: u32,
}
