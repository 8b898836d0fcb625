// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project and project-membership types.
//!
//! This module provides:
//! - [`Project`] - a workspace owned by a tenant, carrying a human-shareable
//!   join code
//! - [`ProjectMember`] - the authoritative access-control edge linking a user
//!   to a project at a role
//!
//! The membership table is the single source of truth for "who can access
//! project X and at what level"; the creator-fallback caveat lives in
//! [`crate::policy::creator_fallback_role`], not here.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{MemberId, ProjectId, ProjectRole, ProjectStatus, TenantId, UserId};

/// Number of characters in a project join code.
pub const JOIN_CODE_LEN: usize = 6;

/// Alphabet for join codes.
///
/// Uppercase letters and digits with ambiguous glyphs (0/O, 1/I/L) removed,
/// since users read these codes aloud and type them by hand.
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// A workspace within a tenant.
///
/// Deleting a project cascades to its members, tasks, invitations, join
/// requests, and activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
	/// Unique identifier for this project.
	pub id: ProjectId,

	/// The tenant that owns this project.
	pub tenant_id: TenantId,

	/// Display name of the project.
	pub name: String,

	/// Optional free-form description.
	pub description: Option<String>,

	/// Lifecycle status.
	pub status: ProjectStatus,

	/// Short human-shareable code for join-by-code discovery. Unique across
	/// all projects; generated at creation and collision-checked by the
	/// creating service.
	pub join_code: String,

	/// The user who created the project.
	pub created_by: UserId,

	/// When the project was created.
	pub created_at: DateTime<Utc>,

	/// When the project was last updated.
	pub updated_at: DateTime<Utc>,
}

impl Project {
	/// Creates a new active project with a freshly generated join code.
	pub fn new(
		tenant_id: TenantId,
		created_by: UserId,
		name: impl Into<String>,
		description: Option<String>,
	) -> Self {
		let now = Utc::now();
		Self {
			id: ProjectId::generate(),
			tenant_id,
			name: name.into(),
			description,
			status: ProjectStatus::Active,
			join_code: generate_join_code(),
			created_by,
			created_at: now,
			updated_at: now,
		}
	}
}

/// A user's membership in a project.
///
/// Unique per `(project_id, user_id)`; the storage layer enforces this with
/// a constraint because application-level check-then-insert is racy under
/// concurrent acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
	/// Unique identifier for this membership record.
	pub id: MemberId,

	/// The tenant the project belongs to.
	pub tenant_id: TenantId,

	/// The project this membership is for.
	pub project_id: ProjectId,

	/// The user who is a member.
	pub user_id: UserId,

	/// The user's role within the project.
	pub role: ProjectRole,

	/// When this membership was created.
	pub created_at: DateTime<Utc>,
}

impl ProjectMember {
	/// Creates a new membership record.
	pub fn new(
		tenant_id: TenantId,
		project_id: ProjectId,
		user_id: UserId,
		role: ProjectRole,
	) -> Self {
		Self {
			id: MemberId::generate(),
			tenant_id,
			project_id,
			user_id,
			role,
			created_at: Utc::now(),
		}
	}

	/// Returns true if this member is the project owner.
	pub fn is_owner(&self) -> bool {
		self.role == ProjectRole::Owner
	}

	/// Returns true if this member has at least the given role's permissions.
	pub fn has_permission_of(&self, role: &ProjectRole) -> bool {
		self.role.has_permission_of(role)
	}
}

/// Generate a random join code.
///
/// Codes are short and human-typable, not secrets: discovery by code still
/// requires authentication and same-tenant membership rules apply before any
/// join succeeds.
pub fn generate_join_code() -> String {
	let mut rng = rand::thread_rng();
	(0..JOIN_CODE_LEN)
		.map(|_| {
			let idx = rng.gen_range(0..JOIN_CODE_ALPHABET.len());
			JOIN_CODE_ALPHABET[idx] as char
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::collections::HashSet;

	mod project {
		use super::*;

		#[test]
		fn new_creates_active_project_with_code() {
			let tenant_id = TenantId::generate();
			let creator = UserId::generate();
			let project = Project::new(tenant_id, creator, "Apollo", None);

			assert_eq!(project.tenant_id, tenant_id);
			assert_eq!(project.created_by, creator);
			assert_eq!(project.status, ProjectStatus::Active);
			assert_eq!(project.join_code.len(), JOIN_CODE_LEN);
		}

		#[test]
		fn new_sets_timestamps() {
			let before = Utc::now();
			let project = Project::new(TenantId::generate(), UserId::generate(), "P", None);
			let after = Utc::now();

			assert!(project.created_at >= before && project.created_at <= after);
			assert_eq!(project.created_at, project.updated_at);
		}

		#[test]
		fn new_generates_unique_ids() {
			let tenant_id = TenantId::generate();
			let creator = UserId::generate();
			let p1 = Project::new(tenant_id, creator, "One", None);
			let p2 = Project::new(tenant_id, creator, "Two", None);
			assert_ne!(p1.id, p2.id);
		}
	}

	mod membership {
		use super::*;

		#[test]
		fn new_creates_membership() {
			let member = ProjectMember::new(
				TenantId::generate(),
				ProjectId::generate(),
				UserId::generate(),
				ProjectRole::Member,
			);
			assert_eq!(member.role, ProjectRole::Member);
			assert!(!member.is_owner());
		}

		#[test]
		fn owner_is_owner() {
			let member = ProjectMember::new(
				TenantId::generate(),
				ProjectId::generate(),
				UserId::generate(),
				ProjectRole::Owner,
			);
			assert!(member.is_owner());
			assert!(member.has_permission_of(&ProjectRole::Viewer));
		}

		#[test]
		fn viewer_lacks_member_permission() {
			let member = ProjectMember::new(
				TenantId::generate(),
				ProjectId::generate(),
				UserId::generate(),
				ProjectRole::Viewer,
			);
			assert!(!member.has_permission_of(&ProjectRole::Member));
		}
	}

	mod join_code {
		use super::*;

		#[test]
		fn generated_codes_use_alphabet() {
			for _ in 0..100 {
				let code = generate_join_code();
				assert_eq!(code.len(), JOIN_CODE_LEN);
				assert!(code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)));
			}
		}

		#[test]
		fn alphabet_has_no_ambiguous_glyphs() {
			for ambiguous in [b'0', b'O', b'1', b'I', b'L'] {
				assert!(!JOIN_CODE_ALPHABET.contains(&ambiguous));
			}
		}

		#[test]
		fn codes_are_reasonably_distinct() {
			let codes: HashSet<String> = (0..1000).map(|_| generate_join_code()).collect();
			// With a ~9e8 code space, 1000 draws colliding would indicate a
			// broken generator rather than bad luck.
			assert!(codes.len() > 990);
		}

		proptest! {
				#[test]
				fn generation_is_fixed_length(_seed in 0u8..255) {
						prop_assert_eq!(generate_join_code().len(), JOIN_CODE_LEN);
				}
		}
	}
}
