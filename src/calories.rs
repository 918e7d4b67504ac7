// ABOUTME: Pure calorie expenditure estimation from duration, volume, or template baselines
// ABOUTME: Classifies goal types into training intensities for per-minute rates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

//! # Calorie Estimation
//!
//! Estimates energy expenditure for a planned exercise. Priority order:
//! explicit session duration (scaled from the template baseline when one
//! exists, otherwise an intensity-based per-minute rate), then set/rep
//! volume, then the raw template baseline, then a fixed fallback.
//!
//! Downstream calorie aggregates depend on these exact figures; the
//! thresholds and keyword matching below mirror the values plans have
//! been materialized with historically.

/// Session length a template baseline calorie figure represents
const BASELINE_SESSION_MINUTES: f64 = 30.0;

/// kcal per minute for low-intensity goal types
const LOW_INTENSITY_KCAL_PER_MINUTE: f64 = 4.5;

/// kcal per minute for standard-intensity goal types
const STANDARD_INTENSITY_KCAL_PER_MINUTE: f64 = 9.0;

/// kcal per rep under the heavy-resistance heuristic (reps <= 8, sets >= 3)
const HEAVY_RESISTANCE_KCAL_PER_REP: f64 = 1.5;

/// kcal per rep under the endurance heuristic (reps >= 15)
const ENDURANCE_KCAL_PER_REP: f64 = 0.6;

/// kcal per rep outside both heuristics
const DEFAULT_KCAL_PER_REP: f64 = 1.0;

/// Fixed fallback when no usable input is available
const FALLBACK_SESSION_CALORIES: f64 = 200.0;

/// Rep ceiling for the heavy-resistance heuristic
const HEAVY_REP_CEILING: u32 = 8;

/// Set floor for the heavy-resistance heuristic
const HEAVY_SET_FLOOR: u32 = 3;

/// Rep floor for the endurance heuristic
const ENDURANCE_REP_FLOOR: u32 = 15;

/// Training intensity classification derived from a goal type.
///
/// Goal types remain free text in the store; this enum makes the
/// historical substring mapping explicit in one place instead of
/// scattering keyword checks across call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrainingIntensity {
    /// Weight-loss, yoga, and cardio style goals
    Low,
    /// Everything else (strength, muscle-gain, ...)
    #[default]
    Standard,
}

impl TrainingIntensity {
    /// Classify a free-text goal type.
    ///
    /// The keyword set ("weight-loss"/"weight loss", "yoga", "cardio",
    /// case-insensitive substring match) is preserved exactly; plans
    /// already in the store were priced with it.
    #[must_use]
    pub fn classify(goal_type: &str) -> Self {
        let normalized = goal_type.to_lowercase();
        if normalized.contains("weight-loss")
            || normalized.contains("weight loss")
            || normalized.contains("yoga")
            || normalized.contains("cardio")
        {
            Self::Low
        } else {
            Self::Standard
        }
    }

    /// kcal burned per minute at this intensity
    #[must_use]
    pub const fn kcal_per_minute(&self) -> f64 {
        match self {
            Self::Low => LOW_INTENSITY_KCAL_PER_MINUTE,
            Self::Standard => STANDARD_INTENSITY_KCAL_PER_MINUTE,
        }
    }
}

/// Inputs for a calorie estimate
#[derive(Debug, Clone, Copy, Default)]
pub struct CalorieInput<'a> {
    /// Explicit session duration in minutes
    pub duration_minutes: Option<u32>,
    /// Planned sets
    pub sets: Option<u32>,
    /// Planned reps per set
    pub reps: Option<u32>,
    /// Template baseline calorie figure for one session
    pub template_baseline: Option<f64>,
    /// Free-text goal type driving intensity classification
    pub goal_type: &'a str,
}

/// Estimate calories for one planned exercise occurrence.
///
/// 1. Positive duration: baseline scaled linearly assuming it represents
///    a 30-minute session, else intensity rate times minutes.
/// 2. Positive sets and reps: total reps times a per-rep coefficient
///    (1.5 heavy, 0.6 endurance, 1.0 otherwise).
/// 3. Positive baseline: returned unchanged.
/// 4. Fixed 200 kcal fallback.
#[must_use]
pub fn estimate_calories(input: &CalorieInput<'_>) -> f64 {
    if let Some(duration) = input.duration_minutes.filter(|d| *d > 0) {
        let per_minute = match input.template_baseline.filter(|b| *b > 0.0) {
            Some(baseline) => baseline / BASELINE_SESSION_MINUTES,
            None => TrainingIntensity::classify(input.goal_type).kcal_per_minute(),
        };
        return f64::from(duration) * per_minute;
    }

    if let (Some(sets), Some(reps)) = (
        input.sets.filter(|s| *s > 0),
        input.reps.filter(|r| *r > 0),
    ) {
        let per_rep = if reps <= HEAVY_REP_CEILING && sets >= HEAVY_SET_FLOOR {
            HEAVY_RESISTANCE_KCAL_PER_REP
        } else if reps >= ENDURANCE_REP_FLOOR {
            ENDURANCE_KCAL_PER_REP
        } else {
            DEFAULT_KCAL_PER_REP
        };
        return f64::from(sets) * f64::from(reps) * per_rep;
    }

    if let Some(baseline) = input.template_baseline.filter(|b| *b > 0.0) {
        return baseline;
    }

    FALLBACK_SESSION_CALORIES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_low_intensity() {
        let input = CalorieInput {
            duration_minutes: Some(30),
            goal_type: "weight-loss",
            ..Default::default()
        };
        assert!((estimate_calories(&input) - 135.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duration_standard_intensity() {
        let input = CalorieInput {
            duration_minutes: Some(30),
            goal_type: "muscle-gain",
            ..Default::default()
        };
        assert!((estimate_calories(&input) - 270.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duration_scales_baseline() {
        // Baseline represents 30 minutes, so 60 minutes doubles it
        let input = CalorieInput {
            duration_minutes: Some(60),
            template_baseline: Some(300.0),
            goal_type: "muscle-gain",
            ..Default::default()
        };
        assert!((estimate_calories(&input) - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_heavy_resistance_heuristic() {
        let input = CalorieInput {
            sets: Some(4),
            reps: Some(6),
            goal_type: "strength",
            ..Default::default()
        };
        assert!((estimate_calories(&input) - 36.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_endurance_heuristic() {
        let input = CalorieInput {
            sets: Some(3),
            reps: Some(20),
            goal_type: "strength",
            ..Default::default()
        };
        assert!((estimate_calories(&input) - 36.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_rep_coefficient() {
        // 10 reps sits between both heuristics
        let input = CalorieInput {
            sets: Some(3),
            reps: Some(10),
            goal_type: "strength",
            ..Default::default()
        };
        assert!((estimate_calories(&input) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_heavy_requires_three_sets() {
        // 2 sets of 6 reps misses the heavy heuristic, falls to 1.0/rep
        let input = CalorieInput {
            sets: Some(2),
            reps: Some(6),
            goal_type: "strength",
            ..Default::default()
        };
        assert!((estimate_calories(&input) - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bare_baseline_passthrough() {
        let input = CalorieInput {
            template_baseline: Some(250.0),
            goal_type: "muscle-gain",
            ..Default::default()
        };
        assert!((estimate_calories(&input) - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fallback_with_no_inputs() {
        let input = CalorieInput {
            goal_type: "",
            ..Default::default()
        };
        assert!((estimate_calories(&input) - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_duration_ignored() {
        let input = CalorieInput {
            duration_minutes: Some(0),
            template_baseline: Some(250.0),
            goal_type: "cardio",
            ..Default::default()
        };
        // Falls through to the bare baseline
        assert!((estimate_calories(&input) - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_intensity_classification_keywords() {
        assert_eq!(TrainingIntensity::classify("Weight-Loss"), TrainingIntensity::Low);
        assert_eq!(TrainingIntensity::classify("weight loss"), TrainingIntensity::Low);
        assert_eq!(TrainingIntensity::classify("Morning Yoga"), TrainingIntensity::Low);
        assert_eq!(TrainingIntensity::classify("Cardio Blast"), TrainingIntensity::Low);
        assert_eq!(
            TrainingIntensity::classify("muscle-gain"),
            TrainingIntensity::Standard
        );
        assert_eq!(TrainingIntensity::classify(""), TrainingIntensity::Standard);
    }
}
