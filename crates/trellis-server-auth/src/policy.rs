// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pure authorization policy: permission predicates, the tenant guard, and
//! the creator-fallback rule.
//!
//! All functions here are total and side-effect free. They are the only
//! place permission semantics live; services compose them with store lookups
//! but never re-derive role logic.

use crate::error::AuthError;
use crate::project::Project;
use crate::types::{ProjectRole, TenantId, UserId};

/// Outcome of resolving a user's access to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAccess {
	/// The user has no access to the project.
	Denied,
	/// The user has access at the given role.
	Granted { role: ProjectRole },
}

impl ProjectAccess {
	/// Returns true if access was granted at any role.
	pub fn has_access(&self) -> bool {
		matches!(self, ProjectAccess::Granted { .. })
	}

	/// The granted role, if any.
	pub fn role(&self) -> Option<ProjectRole> {
		match self {
			ProjectAccess::Granted { role } => Some(*role),
			ProjectAccess::Denied => None,
		}
	}
}

/// Returns true if the role may mutate project data.
///
/// Viewer is read-only; an absent role grants nothing.
pub fn can_write(role: Option<ProjectRole>) -> bool {
	match role {
		Some(ProjectRole::Owner) | Some(ProjectRole::Admin) | Some(ProjectRole::Member) => true,
		Some(ProjectRole::Viewer) | None => false,
	}
}

/// Returns true if the role may manage members, invitations, and join
/// requests.
pub fn can_administer(role: Option<ProjectRole>) -> bool {
	match role {
		Some(ProjectRole::Owner) | Some(ProjectRole::Admin) => true,
		Some(ProjectRole::Member) | Some(ProjectRole::Viewer) | None => false,
	}
}

/// Returns true if the role may delete the project.
///
/// Stricter than [`can_administer`]: deletion is Owner-only.
pub fn can_delete_project(role: Option<ProjectRole>) -> bool {
	match role {
		Some(ProjectRole::Owner) => true,
		Some(ProjectRole::Admin)
		| Some(ProjectRole::Member)
		| Some(ProjectRole::Viewer)
		| None => false,
	}
}

/// The tenant guard: a resource's tenant must equal the caller's tenant.
///
/// Invoked immediately after loading any resource by id and before
/// evaluating membership, so a membership lookup can never be used to infer
/// the existence of a resource in a foreign tenant. Callers log the mismatch
/// at elevated severity; the error itself carries no resource detail.
pub fn ensure_same_tenant(
	caller_tenant: TenantId,
	resource_tenant: TenantId,
) -> Result<(), AuthError> {
	if caller_tenant == resource_tenant {
		Ok(())
	} else {
		Err(AuthError::TenantMismatch)
	}
}

/// The creator fallback: a project's creator is treated as Owner even when
/// no explicit membership row exists.
///
/// This tolerates the two-step creation sequence (project row first, owner
/// membership row second), but it also means a creator retains implicit
/// Owner access if their explicit row is later deleted. That policy is
/// deliberately concentrated here so it can be revisited at a single site
/// without touching callers.
pub fn creator_fallback_role(project: &Project, user_id: &UserId) -> Option<ProjectRole> {
	if project.created_by == *user_id {
		Some(ProjectRole::Owner)
	} else {
		None
	}
}
