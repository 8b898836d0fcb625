// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error taxonomy for the authorization core.
//!
//! Every failure the core produces is distinguishable by kind so a transport
//! layer can map it onto a status code without re-deriving authorization
//! logic. Identity failures (`InvalidCredential`, `ExpiredCredential`,
//! `PrincipalNotFound`, `TenantInactive`) surface as "not authenticated";
//! `TenantMismatch` surfaces as "not authorized" without revealing whether
//! the resource exists.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
	/// The credential failed signature or structural validation.
	#[error("invalid credential")]
	InvalidCredential,

	/// The credential is well-formed but past its expiry.
	#[error("expired credential")]
	ExpiredCredential,

	/// The credential resolved to a user that no longer exists.
	#[error("principal not found")]
	PrincipalNotFound,

	/// The principal's tenant is suspended or cancelled.
	#[error("tenant is not active")]
	TenantInactive,

	/// The caller's tenant does not match the resource's tenant.
	///
	/// A hard invariant violation, not a normal denial; callers log this at
	/// elevated severity before surfacing it.
	#[error("tenant mismatch")]
	TenantMismatch,

	/// The resource does not exist (or, before tenant match is confirmed,
	/// is indistinguishable from one in a foreign tenant).
	#[error("not found: {0}")]
	NotFound(String),

	/// The principal is authenticated and the resource exists in-tenant,
	/// but role or ownership checks failed.
	#[error("forbidden: {0}")]
	Forbidden(String),

	/// A uniqueness or idempotency invariant would be violated. Expected and
	/// recoverable, not a bug.
	#[error("conflict: {0}")]
	Conflict(String),

	/// A time-boxed resource has expired.
	#[error("gone: {0}")]
	Gone(String),

	/// Input failed structural validation.
	#[error("validation error: {0}")]
	Validation(String),

	/// Invalid configuration (missing or malformed environment values).
	#[error("configuration error: {0}")]
	Configuration(String),

	/// The persistence layer failed in a way that is not a domain outcome.
	#[error("store error: {0}")]
	Store(String),
}

impl AuthError {
	/// Returns true for identity failures that surface as "not authenticated".
	pub fn is_authentication_failure(&self) -> bool {
		matches!(
			self,
			AuthError::InvalidCredential
				| AuthError::ExpiredCredential
				| AuthError::PrincipalNotFound
				| AuthError::TenantInactive
		)
	}

	/// Returns true for outcomes that are part of normal operation
	/// (uniqueness conflicts, expiries) rather than faults.
	pub fn is_expected_outcome(&self) -> bool {
		matches!(self, AuthError::Conflict(_) | AuthError::Gone(_))
	}
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identity_failures_are_authentication_failures() {
		assert!(AuthError::InvalidCredential.is_authentication_failure());
		assert!(AuthError::ExpiredCredential.is_authentication_failure());
		assert!(AuthError::PrincipalNotFound.is_authentication_failure());
		assert!(AuthError::TenantInactive.is_authentication_failure());
	}

	#[test]
	fn denials_are_not_authentication_failures() {
		assert!(!AuthError::TenantMismatch.is_authentication_failure());
		assert!(!AuthError::Forbidden("role".into()).is_authentication_failure());
		assert!(!AuthError::NotFound("project".into()).is_authentication_failure());
	}

	#[test]
	fn conflicts_and_expiries_are_expected() {
		assert!(AuthError::Conflict("duplicate".into()).is_expected_outcome());
		assert!(AuthError::Gone("expired".into()).is_expected_outcome());
		assert!(!AuthError::Store("io".into()).is_expected_outcome());
	}

	#[test]
	fn messages_do_not_leak_resource_existence() {
		// TenantMismatch renders without any resource detail.
		assert_eq!(AuthError::TenantMismatch.to_string(), "tenant mismatch");
	}
}
