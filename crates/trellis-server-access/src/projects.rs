// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project service: creation, guarded reads, and owner-only deletion.
//!
//! Creation is the two-step sequence the creator fallback exists for: the
//! project row is written first, the owner membership row second. A crash
//! between the two leaves a project whose creator still resolves as Owner
//! through the fallback.

use std::sync::Arc;

use trellis_server_auth::activity::{ActivityEntry, ActivityEventType};
use trellis_server_auth::credential::Principal;
use trellis_server_auth::error::AuthError;
use trellis_server_auth::policy::{can_delete_project, can_write, ensure_same_tenant};
use trellis_server_auth::project::{generate_join_code, Project, ProjectMember};
use trellis_server_auth::types::{ProjectId, ProjectRole};
use trellis_server_auth::user::User;
use trellis_server_db::project::ProjectStore;

use crate::access::AccessResolver;
use crate::effects::{EffectQueue, SideEffect};

/// Attempts to find an unused join code before giving up.
const JOIN_CODE_ATTEMPTS: usize = 5;

/// Service for project lifecycle operations.
#[derive(Clone)]
pub struct ProjectService {
	projects: Arc<dyn ProjectStore>,
	resolver: AccessResolver,
	effects: EffectQueue,
}

impl ProjectService {
	/// Create a service over the given store, resolver, and effect queue.
	pub fn new(
		projects: Arc<dyn ProjectStore>,
		resolver: AccessResolver,
		effects: EffectQueue,
	) -> Self {
		Self {
			projects,
			resolver,
			effects,
		}
	}

	/// Create a project; the caller becomes its Owner.
	///
	/// The join code is regenerated on collision. The owner membership row
	/// is written after the project row; the access resolver's creator
	/// fallback covers the window between the two writes.
	#[tracing::instrument(skip(self, principal, name, description), fields(user_id = %principal.user_id, tenant_id = %principal.tenant_id))]
	pub async fn create_project(
		&self,
		principal: &Principal,
		name: &str,
		description: Option<String>,
	) -> Result<Project, AuthError> {
		let name = name.trim();
		if name.is_empty() {
			return Err(AuthError::Validation("project name cannot be empty".into()));
		}

		let mut project = Project::new(
			principal.tenant_id,
			principal.user_id,
			name,
			description,
		);

		for attempt in 0..JOIN_CODE_ATTEMPTS {
			if !self.projects.join_code_exists(&project.join_code).await? {
				break;
			}
			if attempt + 1 == JOIN_CODE_ATTEMPTS {
				return Err(AuthError::Store(
					"could not allocate an unused join code".into(),
				));
			}
			project.join_code = generate_join_code();
		}

		self.projects.create_project(&project).await?;

		let owner = ProjectMember::new(
			principal.tenant_id,
			project.id,
			principal.user_id,
			ProjectRole::Owner,
		);
		self.projects.add_member(&owner).await?;

		self.effects
			.dispatch(vec![SideEffect::Activity {
				entry: ActivityEntry::builder(
					principal.tenant_id,
					ActivityEventType::ProjectCreated,
				)
				.project(project.id)
				.actor(principal.user_id)
				.details(serde_json::json!({ "name": project.name }))
				.build(),
			}])
			.await;

		tracing::info!(project_id = %project.id, "project created");
		Ok(project)
	}

	/// Get a project the caller has access to.
	///
	/// Missing projects report `NotFound`; projects in a foreign tenant
	/// report `TenantMismatch`; in-tenant projects the caller cannot see
	/// report `Forbidden` — in that order, so error shapes never leak
	/// cross-tenant existence.
	#[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id, project_id = %project_id))]
	pub async fn get_project(
		&self,
		principal: &Principal,
		project_id: &ProjectId,
	) -> Result<Project, AuthError> {
		let project = self.load_guarded(principal, project_id).await?;

		let access = self
			.resolver
			.resolve_access(&principal.user_id, project_id, &principal.tenant_id)
			.await?;
		if !access.has_access() {
			return Err(AuthError::Forbidden(
				"you are not a member of this project".into(),
			));
		}

		Ok(project)
	}

	/// Load a project requiring write access; data mutations on project
	/// contents route through this check.
	#[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id, project_id = %project_id))]
	pub async fn require_write(
		&self,
		principal: &Principal,
		project_id: &ProjectId,
	) -> Result<Project, AuthError> {
		let project = self.load_guarded(principal, project_id).await?;

		let access = self
			.resolver
			.resolve_access(&principal.user_id, project_id, &principal.tenant_id)
			.await?;
		if !can_write(access.role()) {
			return Err(AuthError::Forbidden(
				"write access to this project is required".into(),
			));
		}

		Ok(project)
	}

	/// Delete a project. Owner only; cascades to members, invitations, join
	/// requests, and activity.
	#[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id, project_id = %project_id))]
	pub async fn delete_project(
		&self,
		principal: &Principal,
		project_id: &ProjectId,
	) -> Result<(), AuthError> {
		let project = self.load_guarded(principal, project_id).await?;

		let access = self
			.resolver
			.resolve_access(&principal.user_id, project_id, &principal.tenant_id)
			.await?;
		if !can_delete_project(access.role()) {
			return Err(AuthError::Forbidden(
				"only the project owner can delete a project".into(),
			));
		}

		self.projects.delete_project(project_id).await?;

		self.effects
			.dispatch(vec![SideEffect::Activity {
				entry: ActivityEntry::builder(
					principal.tenant_id,
					ActivityEventType::ProjectDeleted,
				)
				.actor(principal.user_id)
				.details(serde_json::json!({ "name": project.name }))
				.build(),
			}])
			.await;

		tracing::info!(project_id = %project_id, "project deleted");
		Ok(())
	}

	/// List projects the caller is an explicit member of.
	#[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
	pub async fn list_projects(&self, principal: &Principal) -> Result<Vec<Project>, AuthError> {
		Ok(self
			.projects
			.list_projects_for_user(&principal.user_id)
			.await?)
	}

	/// List members of a project the caller has access to.
	#[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id, project_id = %project_id))]
	pub async fn list_members(
		&self,
		principal: &Principal,
		project_id: &ProjectId,
	) -> Result<Vec<(ProjectMember, User)>, AuthError> {
		// Access check included.
		self.get_project(principal, project_id).await?;
		Ok(self.projects.list_members(project_id).await?)
	}

	/// Load a project and run the tenant guard before anything else.
	async fn load_guarded(
		&self,
		principal: &Principal,
		project_id: &ProjectId,
	) -> Result<Project, AuthError> {
		let project = self
			.projects
			.get_project_by_id(project_id)
			.await?
			.ok_or_else(|| AuthError::NotFound("project".into()))?;

		if let Err(err) = ensure_same_tenant(principal.tenant_id, project.tenant_id) {
			tracing::warn!(
				caller_tenant = %principal.tenant_id,
				project_id = %project_id,
				"tenant mismatch on project access"
			);
			return Err(err);
		}

		Ok(project)
	}
}
