// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User and profile types.
//!
//! A user is a principal: it holds credentials and belongs to exactly one
//! tenant. The same email can exist in multiple tenants as distinct users,
//! but a user never switches tenants. [`Profile`] is the user-facing identity
//! view sharing the user's identifier.
//!
//! # PII Handling
//!
//! `display_name` and `email` are user-provided PII and should be redacted
//! in logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{TenantId, UserId};

/// A user in the system, scoped to a single tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	/// Unique identifier for this user.
	pub id: UserId,

	/// The tenant this user belongs to. Never changes.
	pub tenant_id: TenantId,

	/// Display name shown in the UI.
	pub display_name: String,

	/// Email address; unique within the tenant.
	pub email: String,

	/// URL to the user's avatar image.
	pub avatar_url: Option<String>,

	/// When the user was created.
	pub created_at: DateTime<Utc>,

	/// When the user was last updated.
	pub updated_at: DateTime<Utc>,
}

impl User {
	/// Creates a new user in the given tenant. The email is stored normalized.
	pub fn new(
		tenant_id: TenantId,
		display_name: impl Into<String>,
		email: impl Into<String>,
	) -> Self {
		let now = Utc::now();
		Self {
			id: UserId::generate(),
			tenant_id,
			display_name: display_name.into(),
			email: normalize_email(&email.into()),
			avatar_url: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// Creates the user-facing profile view of this user.
	pub fn to_profile(&self) -> Profile {
		Profile {
			id: self.id,
			display_name: self.display_name.clone(),
			email: self.email.clone(),
			avatar_url: self.avatar_url.clone(),
		}
	}
}

/// User-facing identity view; shares its identifier with [`User`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
	/// Same identifier as the underlying user.
	pub id: UserId,

	/// Display name shown in the UI.
	pub display_name: String,

	/// Email address.
	pub email: String,

	/// URL to the user's avatar image.
	pub avatar_url: Option<String>,
}

/// Normalize an email address for storage and comparison: trim surrounding
/// whitespace and lowercase. Invitation email matching is case-insensitive,
/// so every email the core stores or compares goes through this.
pub fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	mod user {
		use super::*;

		#[test]
		fn new_normalizes_email() {
			let user = User::new(TenantId::generate(), "Alice", "  Alice@Example.COM ");
			assert_eq!(user.email, "alice@example.com");
		}

		#[test]
		fn new_generates_unique_ids() {
			let tenant = TenantId::generate();
			let u1 = User::new(tenant, "A", "a@x.com");
			let u2 = User::new(tenant, "B", "b@x.com");
			assert_ne!(u1.id, u2.id);
		}

		#[test]
		fn to_profile_shares_id() {
			let user = User::new(TenantId::generate(), "Alice", "alice@example.com");
			let profile = user.to_profile();
			assert_eq!(profile.id, user.id);
			assert_eq!(profile.display_name, user.display_name);
			assert_eq!(profile.email, user.email);
		}
	}

	mod normalize {
		use super::*;

		#[test]
		fn lowercases_and_trims() {
			assert_eq!(normalize_email("Bob@X.Com"), "bob@x.com");
			assert_eq!(normalize_email("  c@x.com\n"), "c@x.com");
		}

		proptest! {
				#[test]
				fn idempotent(email in "[a-zA-Z0-9._%+-]{1,20}@[a-zA-Z0-9.-]{1,20}") {
						let once = normalize_email(&email);
						prop_assert_eq!(normalize_email(&once), once);
				}
		}
	}
}
