// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Join-request lifecycle manager.
//!
//! State machine: `pending -> {accepted, declined}`.
//!
//! Discovery by join code is deliberately cross-tenant: any authenticated
//! user may look up a project's public summary. Creating a request is not:
//! the requester's tenant must equal the project's tenant. Acceptance always
//! grants the fixed `Member` role; a requested role is never honored.

use std::sync::Arc;

use trellis_server_auth::activity::{ActivityEntry, ActivityEventType};
use trellis_server_auth::credential::Principal;
use trellis_server_auth::error::AuthError;
use trellis_server_auth::join_request::{JoinRequest, ProjectDiscovery};
use trellis_server_auth::notification::{Notification, NotificationKind};
use trellis_server_auth::policy::{can_administer, creator_fallback_role, ensure_same_tenant};
use trellis_server_auth::project::{Project, ProjectMember};
use trellis_server_auth::types::{JoinRequestId, JoinRequestStatus, ProjectId, ProjectRole, UserId};
use trellis_server_auth::user::User;
use trellis_server_db::join_request::JoinRequestStore;
use trellis_server_db::project::ProjectStore;
use trellis_server_db::user::UserStore;

use crate::access::AccessResolver;
use crate::effects::{EffectQueue, SideEffect};

/// Service for the join-request lifecycle.
#[derive(Clone)]
pub struct JoinRequestService {
	requests: Arc<dyn JoinRequestStore>,
	projects: Arc<dyn ProjectStore>,
	users: Arc<dyn UserStore>,
	resolver: AccessResolver,
	effects: EffectQueue,
}

impl JoinRequestService {
	/// Create a service over the given stores, resolver, and effect queue.
	pub fn new(
		requests: Arc<dyn JoinRequestStore>,
		projects: Arc<dyn ProjectStore>,
		users: Arc<dyn UserStore>,
		resolver: AccessResolver,
		effects: EffectQueue,
	) -> Self {
		Self {
			requests,
			projects,
			users,
			resolver,
			effects,
		}
	}

	/// Discover a project by its join code.
	///
	/// Open to any authenticated user in any tenant. The summary carries the
	/// two booleans a requester needs and nothing that would leak the
	/// tenant id or the member list.
	#[tracing::instrument(skip(self, principal, code), fields(user_id = %principal.user_id))]
	pub async fn discover_by_code(
		&self,
		principal: &Principal,
		code: &str,
	) -> Result<ProjectDiscovery, AuthError> {
		let project = self
			.projects
			.get_project_by_join_code(code.trim())
			.await?
			.ok_or_else(|| AuthError::NotFound("project".into()))?;

		let is_member = self.is_member(&project, principal).await?;
		let has_pending_request = self
			.requests
			.has_pending_join_request(&project.id, &principal.user_id)
			.await?;

		Ok(ProjectDiscovery {
			project_id: project.id,
			name: project.name,
			description: project.description,
			is_member,
			has_pending_request,
		})
	}

	/// Create a join request for a discovered project.
	///
	/// Cross-tenant joins are explicitly disallowed: discovery crosses the
	/// tenant boundary, requesting does not. The project's owner is notified
	/// post-commit; a notification failure does not fail the request.
	#[tracing::instrument(skip(self, principal, message), fields(user_id = %principal.user_id, project_id = %project_id))]
	pub async fn create(
		&self,
		principal: &Principal,
		project_id: &ProjectId,
		message: Option<String>,
	) -> Result<JoinRequest, AuthError> {
		let project = self
			.projects
			.get_project_by_id(project_id)
			.await?
			.ok_or_else(|| AuthError::NotFound("project".into()))?;

		if let Err(err) = ensure_same_tenant(principal.tenant_id, project.tenant_id) {
			tracing::warn!(
				caller_tenant = %principal.tenant_id,
				project_id = %project_id,
				"cross-tenant join request rejected"
			);
			return Err(err);
		}

		if self.is_member(&project, principal).await? {
			return Err(AuthError::Conflict(
				"you are already a member of this project".into(),
			));
		}

		if self
			.requests
			.has_pending_join_request(project_id, &principal.user_id)
			.await?
		{
			return Err(AuthError::Conflict(
				"you already have a pending request for this project".into(),
			));
		}

		let request = JoinRequest::new(
			project.tenant_id,
			*project_id,
			principal.user_id,
			message,
		);
		self.requests.create_join_request(&request).await?;

		let owner_id = self.resolve_owner(&project).await?;
		let requester_name = self
			.users
			.get_user_by_id(&principal.user_id)
			.await?
			.map(|u| u.display_name)
			.unwrap_or_else(|| principal.email.clone());

		self.effects
			.dispatch(vec![
				SideEffect::Notify {
					notification: Notification::new(
						project.tenant_id,
						owner_id,
						NotificationKind::JoinRequestReceived,
						serde_json::json!({
							"project": project.name,
							"requester": requester_name,
							"request_id": request.id,
						}),
					),
				},
				SideEffect::Activity {
					entry: ActivityEntry::builder(
						project.tenant_id,
						ActivityEventType::JoinRequestCreated,
					)
					.project(*project_id)
					.actor(principal.user_id)
					.build(),
				},
			])
			.await;

		tracing::info!(join_request_id = %request.id, project_id = %project_id, "join request created");
		Ok(request)
	}

	/// Accept a join request. Caller must administer the project.
	///
	/// The membership is created at the fixed `Member` role. If the
	/// requester is already a member (a race with another acceptance path),
	/// the request is marked accepted anyway and `Conflict` is reported
	/// without creating a duplicate membership.
	#[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id, join_request_id = %request_id))]
	pub async fn accept(
		&self,
		principal: &Principal,
		request_id: &JoinRequestId,
	) -> Result<ProjectMember, AuthError> {
		let (request, project) = self.load_for_resolution(principal, request_id).await?;

		if self
			.projects
			.get_membership(&request.project_id, &request.user_id, &request.tenant_id)
			.await?
			.is_some()
		{
			self.requests
				.resolve_join_request(request_id, JoinRequestStatus::Accepted, &principal.user_id)
				.await?;
			return Err(AuthError::Conflict(
				"requester is already a member of this project".into(),
			));
		}

		// Role is fixed at Member; the request never carries a role to honor.
		let member = ProjectMember::new(
			request.tenant_id,
			request.project_id,
			request.user_id,
			ProjectRole::Member,
		);
		if let Err(db_err) = self.projects.add_member(&member).await {
			if db_err.is_unique_violation() {
				self.requests
					.resolve_join_request(
						request_id,
						JoinRequestStatus::Accepted,
						&principal.user_id,
					)
					.await?;
				return Err(AuthError::Conflict(
					"requester is already a member of this project".into(),
				));
			}
			return Err(db_err.into());
		}

		let resolved = self
			.requests
			.resolve_join_request(request_id, JoinRequestStatus::Accepted, &principal.user_id)
			.await?;
		if !resolved {
			tracing::warn!(join_request_id = %request_id, "join request was no longer pending at acceptance");
		}

		self.effects
			.dispatch(vec![
				SideEffect::Notify {
					notification: Notification::new(
						request.tenant_id,
						request.user_id,
						NotificationKind::JoinRequestAccepted,
						serde_json::json!({ "project": project.name }),
					),
				},
				SideEffect::Activity {
					entry: ActivityEntry::builder(
						request.tenant_id,
						ActivityEventType::JoinRequestAccepted,
					)
					.project(request.project_id)
					.actor(principal.user_id)
					.build(),
				},
			])
			.await;

		tracing::info!(join_request_id = %request_id, "join request accepted");
		Ok(member)
	}

	/// Decline a join request. Caller must administer the project. The
	/// requester is notified; no membership side effect.
	#[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id, join_request_id = %request_id))]
	pub async fn decline(
		&self,
		principal: &Principal,
		request_id: &JoinRequestId,
	) -> Result<(), AuthError> {
		let (request, project) = self.load_for_resolution(principal, request_id).await?;

		let resolved = self
			.requests
			.resolve_join_request(request_id, JoinRequestStatus::Declined, &principal.user_id)
			.await?;
		if !resolved {
			return Err(AuthError::Conflict("join request already resolved".into()));
		}

		self.effects
			.dispatch(vec![
				SideEffect::Notify {
					notification: Notification::new(
						request.tenant_id,
						request.user_id,
						NotificationKind::JoinRequestDeclined,
						serde_json::json!({ "project": project.name }),
					),
				},
				SideEffect::Activity {
					entry: ActivityEntry::builder(
						request.tenant_id,
						ActivityEventType::JoinRequestDeclined,
					)
					.project(request.project_id)
					.actor(principal.user_id)
					.build(),
				},
			])
			.await;

		tracing::info!(join_request_id = %request_id, "join request declined");
		Ok(())
	}

	/// List pending join requests with requester profiles. Caller must
	/// administer the project.
	#[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id, project_id = %project_id))]
	pub async fn list_pending(
		&self,
		principal: &Principal,
		project_id: &ProjectId,
	) -> Result<Vec<(JoinRequest, User)>, AuthError> {
		let project = self
			.projects
			.get_project_by_id(project_id)
			.await?
			.ok_or_else(|| AuthError::NotFound("project".into()))?;

		if let Err(err) = ensure_same_tenant(principal.tenant_id, project.tenant_id) {
			tracing::warn!(
				caller_tenant = %principal.tenant_id,
				project_id = %project_id,
				"tenant mismatch on join request listing"
			);
			return Err(err);
		}
		self.require_administer(principal, project_id).await?;

		Ok(self.requests.list_pending_join_requests(project_id).await?)
	}

	/// Membership check used by discovery and request creation: an explicit
	/// row, or the creator fallback when the caller is in the project's
	/// tenant.
	async fn is_member(&self, project: &Project, principal: &Principal) -> Result<bool, AuthError> {
		if self
			.projects
			.get_membership(&project.id, &principal.user_id, &principal.tenant_id)
			.await?
			.is_some()
		{
			return Ok(true);
		}
		Ok(principal.tenant_id == project.tenant_id
			&& creator_fallback_role(project, &principal.user_id).is_some())
	}

	/// The project's current owner: the explicit Owner-role member, falling
	/// back to the creator field — the same precedence the access resolver
	/// applies.
	async fn resolve_owner(&self, project: &Project) -> Result<UserId, AuthError> {
		if let Some(owner) = self.projects.find_explicit_owner(&project.id).await? {
			return Ok(owner.user_id);
		}
		Ok(project.created_by)
	}

	/// Load a request and its project, run the tenant guard, and require an
	/// administering caller plus a pending request.
	async fn load_for_resolution(
		&self,
		principal: &Principal,
		request_id: &JoinRequestId,
	) -> Result<(JoinRequest, Project), AuthError> {
		let request = self
			.requests
			.get_join_request_by_id(request_id)
			.await?
			.ok_or_else(|| AuthError::NotFound("join request".into()))?;

		let project = self
			.projects
			.get_project_by_id(&request.project_id)
			.await?
			.ok_or_else(|| AuthError::NotFound("project".into()))?;

		if let Err(err) = ensure_same_tenant(principal.tenant_id, project.tenant_id) {
			tracing::warn!(
				caller_tenant = %principal.tenant_id,
				join_request_id = %request_id,
				"tenant mismatch on join request resolution"
			);
			return Err(err);
		}

		self.require_administer(principal, &request.project_id).await?;

		if request.status.is_terminal() {
			return Err(AuthError::Conflict("join request already resolved".into()));
		}

		Ok((request, project))
	}

	async fn require_administer(
		&self,
		principal: &Principal,
		project_id: &ProjectId,
	) -> Result<(), AuthError> {
		let access = self
			.resolver
			.resolve_access(&principal.user_id, project_id, &principal.tenant_id)
			.await?;
		if !can_administer(access.role()) {
			return Err(AuthError::Forbidden(
				"resolving join requests requires an admin or owner role".into(),
			));
		}
		Ok(())
	}
}
