// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared row-decoding helpers.
//!
//! UUIDs and timestamps are stored as TEXT; these helpers centralize the
//! parse-or-Internal error shape the repositories share.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbError;

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
	Uuid::parse_str(value).map_err(|e| DbError::Internal(format!("Invalid {field}: {e}")))
}

pub(crate) fn parse_datetime(field: &str, value: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {field}: {e}")))
}

pub(crate) fn parse_opt_datetime(
	field: &str,
	value: Option<String>,
) -> Result<Option<DateTime<Utc>>, DbError> {
	value.map(|v| parse_datetime(field, &v)).transpose()
}

pub(crate) fn parse_enum<T: std::str::FromStr<Err = String>>(
	field: &str,
	value: &str,
) -> Result<T, DbError> {
	value
		.parse::<T>()
		.map_err(|e| DbError::Internal(format!("Invalid {field}: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use trellis_server_auth::ProjectRole;

	#[test]
	fn parse_uuid_rejects_garbage() {
		assert!(parse_uuid("id", "not-a-uuid").is_err());
		assert!(parse_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
	}

	#[test]
	fn parse_datetime_rejects_garbage() {
		assert!(parse_datetime("created_at", "yesterday").is_err());
		assert!(parse_datetime("created_at", "2026-01-01T00:00:00Z").is_ok());
	}

	#[test]
	fn parse_opt_datetime_passes_none_through() {
		assert!(parse_opt_datetime("x", None).unwrap().is_none());
	}

	#[test]
	fn parse_enum_uses_fromstr() {
		let role: ProjectRole = parse_enum("role", "admin").unwrap();
		assert_eq!(role, ProjectRole::Admin);
		assert!(parse_enum::<ProjectRole>("role", "sudo").is_err());
	}
}
