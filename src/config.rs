// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses database and logging settings from environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

//! Environment-based configuration for the engine

use crate::errors::{AppError, AppResult};
use crate::logging::LoggingConfig;
use std::env;

/// Default on-disk database location when `DATABASE_URL` is unset
const DEFAULT_DATABASE_URL: &str = "sqlite:data/fitplan.db";

/// Engine configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Database connection URL (sqlite)
    pub database_url: String,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is set but empty
    pub fn from_env() -> AppResult<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());

        if database_url.trim().is_empty() {
            return Err(AppError::invalid_input("DATABASE_URL must not be empty"));
        }

        Ok(Self {
            database_url,
            logging: LoggingConfig::from_env(),
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            logging: LoggingConfig::default(),
        }
    }
}
