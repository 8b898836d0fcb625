// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use trellis_server_auth::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl DbError {
	/// Returns true if the underlying driver reported a unique-constraint
	/// violation. Services treat this as a `Conflict` outcome, not a fault:
	/// the `UNIQUE(project_id, user_id)` constraint is the backstop for
	/// concurrent membership creation.
	pub fn is_unique_violation(&self) -> bool {
		match self {
			DbError::Sqlx(sqlx::Error::Database(db)) => {
				matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
			}
			DbError::Conflict(_) => true,
			_ => false,
		}
	}
}

impl From<DbError> for AuthError {
	fn from(err: DbError) -> Self {
		if err.is_unique_violation() {
			return AuthError::Conflict(err.to_string());
		}
		match err {
			DbError::NotFound(what) => AuthError::NotFound(what),
			DbError::Conflict(what) => AuthError::Conflict(what),
			other => AuthError::Store(other.to_string()),
		}
	}
}

pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn not_found_maps_to_not_found() {
		let err: AuthError = DbError::NotFound("project".into()).into();
		assert!(matches!(err, AuthError::NotFound(_)));
	}

	#[test]
	fn conflict_maps_to_conflict() {
		let err: AuthError = DbError::Conflict("duplicate member".into()).into();
		assert!(matches!(err, AuthError::Conflict(_)));
	}

	#[test]
	fn internal_maps_to_store() {
		let err: AuthError = DbError::Internal("corrupt row".into()).into();
		assert!(matches!(err, AuthError::Store(_)));
	}
}
