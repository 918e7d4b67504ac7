// ABOUTME: Main library entry point for the FitPlan workout scheduling engine
// ABOUTME: Exposes plan materialization, completion tracking, and goal progress evaluation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # FitPlan Engine
//!
//! The scheduling and progress core of the FitPlan coaching platform. This
//! crate turns reusable workout templates (catalog items positioned by
//! relative week and day-of-week) into calendar-anchored, user-owned plans,
//! tracks per-exercise and per-session completion, estimates calories, and
//! decides when a fitness goal is complete.
//!
//! ## Architecture
//!
//! - **Models**: Typed domain structures shared across the engine
//! - **Schedule**: Pure anchor math translating (week, day-of-week) pairs
//!   to and from calendar dates via a plan's "first Monday"
//! - **Calories**: Pure energy-expenditure estimation
//! - **Database**: `SQLite` persistence with per-entity managers
//! - **Planner**: Request-scoped operations (materialize, complete,
//!   evaluate, cancel) exposed through [`planner::PlanningService`]
//!
//! Identity, payments, nutrition logging, and HTTP routing are collaborator
//! concerns: every operation takes an explicit `user_id` and returns plain
//! domain values.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fitplan_engine::config::EngineConfig;
//! use fitplan_engine::database::Database;
//! use fitplan_engine::errors::AppResult;
//! use fitplan_engine::planner::PlanningService;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = EngineConfig::from_env()?;
//!     let database = Database::new(&config.database_url).await?;
//!     let service = PlanningService::new(database);
//!
//!     let user_id = uuid::Uuid::new_v4();
//!     match service.get_active_plan(user_id).await {
//!         Ok(plan) => println!("active plan: {}", plan.name),
//!         Err(e) => println!("no plan: {e}"),
//!     }
//!     Ok(())
//! }
//! ```

/// Calorie expenditure estimation and intensity classification
pub mod calories;

/// Environment-based engine configuration
pub mod config;

/// `SQLite` persistence layer with per-entity managers
pub mod database;

/// Unified error handling system
pub mod errors;

/// Logging configuration and structured logging setup
pub mod logging;

/// Typed domain model shared across the engine
pub mod models;

/// Scheduling operations: materialization, completion, progress, lifecycle
pub mod planner;

/// Calendar anchor math for relative schedule coordinates
pub mod schedule;
