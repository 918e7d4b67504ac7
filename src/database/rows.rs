// ABOUTME: Shared column parsers for uuid, date, and timestamp text columns
// ABOUTME: Used by the per-entity row converters across the database layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitPlan Labs

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Parse a uuid stored as text
pub(crate) fn parse_uuid(value: &str, column: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| AppError::internal(format!("Invalid uuid in {column}: {e}")))
}

/// Parse a calendar date stored as ISO-8601 text
pub(crate) fn parse_date(value: &str, column: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| AppError::internal(format!("Invalid date in {column}: {e}")))
}

/// Parse a timestamp stored as RFC 3339 text
pub(crate) fn parse_datetime(value: &str, column: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::internal(format!("Invalid datetime in {column}: {e}")))
}

/// Convert an i64 column to u32, clamping negatives to zero
pub(crate) fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Whether a sqlx error is a uniqueness-constraint violation
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db| matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_iso() {
        let d = parse_date("2024-01-08", "start_date").unwrap();
        assert_eq!(d.to_string(), "2024-01-08");
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("08/01/2024", "start_date").is_err());
    }

    #[test]
    fn test_to_u32_clamps_negative() {
        assert_eq!(to_u32(-3), 0);
        assert_eq!(to_u32(12), 12);
    }
}
