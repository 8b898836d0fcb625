// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Membership and role resolution.
//!
//! [`AccessResolver::resolve_access`] is the single answer to "does this user
//! have access to this project, and at what level". The explicit membership
//! row is the source of truth; the creator fallback
//! ([`trellis_server_auth::policy::creator_fallback_role`]) tolerates the
//! two-step creation sequence and is consulted only when no row exists.

use std::sync::Arc;

use trellis_server_auth::error::AuthError;
use trellis_server_auth::policy::{creator_fallback_role, ensure_same_tenant, ProjectAccess};
use trellis_server_auth::types::{ProjectId, TenantId, UserId};
use trellis_server_db::project::ProjectStore;

/// Resolves a user's access to a project.
#[derive(Clone)]
pub struct AccessResolver {
	projects: Arc<dyn ProjectStore>,
}

impl AccessResolver {
	/// Create a resolver over the given project store.
	pub fn new(projects: Arc<dyn ProjectStore>) -> Self {
		Self { projects }
	}

	/// Resolve access for `(user, project, tenant)`.
	///
	/// Resolution order:
	/// 1. An explicit membership row wins outright.
	/// 2. No row and no project: `Denied` (not an error; absence of a
	///    project is indistinguishable from absence of access here).
	/// 3. No row, project in a foreign tenant: hard `TenantMismatch`,
	///    logged at `warn!` — louder than a normal denial because it is
	///    either a bug or a cross-tenant probe.
	/// 4. No row, same tenant, caller created the project: `Owner` via the
	///    creator fallback.
	/// 5. Otherwise `Denied`.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, project_id = %project_id))]
	pub async fn resolve_access(
		&self,
		user_id: &UserId,
		project_id: &ProjectId,
		tenant_id: &TenantId,
	) -> Result<ProjectAccess, AuthError> {
		if let Some(membership) = self
			.projects
			.get_membership(project_id, user_id, tenant_id)
			.await?
		{
			return Ok(ProjectAccess::Granted {
				role: membership.role,
			});
		}

		let Some(project) = self.projects.get_project_by_id(project_id).await? else {
			return Ok(ProjectAccess::Denied);
		};

		if let Err(err) = ensure_same_tenant(*tenant_id, project.tenant_id) {
			tracing::warn!(
				caller_tenant = %tenant_id,
				project_id = %project_id,
				"tenant mismatch during access resolution"
			);
			return Err(err);
		}

		if let Some(role) = creator_fallback_role(&project, user_id) {
			return Ok(ProjectAccess::Granted { role });
		}

		Ok(ProjectAccess::Denied)
	}
}
