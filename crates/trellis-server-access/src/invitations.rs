// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Invitation lifecycle manager.
//!
//! State machine: `pending -> {accepted, declined, expired}`; terminal
//! states never transition again. Expiry is enforced lazily at lookup time.
//!
//! Acceptance orders its writes deliberately: the membership row is created
//! before the invitation transitions to `accepted`, so a crash between the
//! two leaves the invitation re-acceptable instead of silently consumed
//! without membership. The `UNIQUE(project_id, user_id)` constraint is the
//! backstop for concurrent acceptances.

use std::sync::Arc;

use chrono::Utc;
use trellis_server_auth::activity::{ActivityEntry, ActivityEventType};
use trellis_server_auth::credential::Principal;
use trellis_server_auth::email::EmailTemplate;
use trellis_server_auth::error::AuthError;
use trellis_server_auth::invitation::{hash_invitation_token, Invitation};
use trellis_server_auth::notification::{Notification, NotificationKind};
use trellis_server_auth::policy::{can_administer, ensure_same_tenant};
use trellis_server_auth::project::{Project, ProjectMember};
use trellis_server_auth::types::{InvitationId, InvitationStatus, ProjectId, ProjectRole};
use trellis_server_auth::user::normalize_email;
use trellis_server_db::invitation::InvitationStore;
use trellis_server_db::project::ProjectStore;
use trellis_server_db::user::UserStore;

use crate::access::AccessResolver;
use crate::effects::{EffectQueue, SideEffect};

/// A freshly created invitation together with its plaintext token.
///
/// The token exists only here and in the invitation email; it is never
/// stored or logged.
#[derive(Debug, Clone)]
pub struct CreatedInvitation {
	pub invitation: Invitation,
	pub token: String,
}

/// Service for the invitation lifecycle.
#[derive(Clone)]
pub struct InvitationService {
	invitations: Arc<dyn InvitationStore>,
	projects: Arc<dyn ProjectStore>,
	users: Arc<dyn UserStore>,
	resolver: AccessResolver,
	effects: EffectQueue,
}

impl InvitationService {
	/// Create a service over the given stores, resolver, and effect queue.
	pub fn new(
		invitations: Arc<dyn InvitationStore>,
		projects: Arc<dyn ProjectStore>,
		users: Arc<dyn UserStore>,
		resolver: AccessResolver,
		effects: EffectQueue,
	) -> Self {
		Self {
			invitations,
			projects,
			users,
			resolver,
			effects,
		}
	}

	/// Create an invitation. Caller must administer the target project.
	///
	/// Conflicts: a pending invitation already targets `(project, email)`,
	/// or the email maps to a user already holding membership. The
	/// invitation email is dispatched post-commit; a send failure does not
	/// roll the invitation back.
	#[tracing::instrument(skip(self, principal, email), fields(user_id = %principal.user_id, project_id = %project_id, role = %role))]
	pub async fn create(
		&self,
		principal: &Principal,
		project_id: &ProjectId,
		email: &str,
		role: ProjectRole,
	) -> Result<CreatedInvitation, AuthError> {
		let email = normalize_email(email);
		if email.is_empty() || !email.contains('@') {
			return Err(AuthError::Validation("a valid email is required".into()));
		}
		if !role.is_invitable() {
			return Err(AuthError::Validation(
				"ownership cannot be offered by invitation".into(),
			));
		}

		let project = self.load_guarded(principal, project_id).await?;
		self.require_administer(principal, project_id).await?;

		if self
			.invitations
			.has_pending_invitation(project_id, &email)
			.await?
		{
			return Err(AuthError::Conflict(
				"a pending invitation already exists for this email".into(),
			));
		}

		if let Some(user) = self
			.users
			.get_user_by_email(&project.tenant_id, &email)
			.await?
		{
			if self
				.projects
				.get_membership(project_id, &user.id, &project.tenant_id)
				.await?
				.is_some()
			{
				return Err(AuthError::Conflict(
					"this user is already a member of the project".into(),
				));
			}
		}

		let (invitation, token) = Invitation::new(
			project.tenant_id,
			*project_id,
			&email,
			role,
			principal.user_id,
		);
		self.invitations.create_invitation(&invitation).await?;

		let inviter_name = self
			.users
			.get_user_by_id(&principal.user_id)
			.await?
			.map(|u| u.display_name)
			.unwrap_or_else(|| principal.email.clone());

		self.effects
			.dispatch(vec![
				SideEffect::Mail {
					to: email.clone(),
					template: EmailTemplate::ProjectInvitation {
						project_name: project.name.clone(),
						inviter_name,
						role,
						token: token.clone(),
					},
				},
				SideEffect::Activity {
					entry: ActivityEntry::builder(
						project.tenant_id,
						ActivityEventType::InvitationCreated,
					)
					.project(*project_id)
					.actor(principal.user_id)
					.details(serde_json::json!({ "role": role }))
					.build(),
				},
			])
			.await;

		tracing::info!(invitation_id = %invitation.id, project_id = %project_id, "invitation created");
		Ok(CreatedInvitation { invitation, token })
	}

	/// Look up an invitation by its token. Public: no authentication needed,
	/// the token itself is the capability.
	///
	/// Only pending invitations are returned. An invitation past its expiry
	/// is transitioned to `expired` as a side effect of the lookup and
	/// reported as `Gone`; already-consumed invitations are `Gone` as well.
	/// Only a token that never existed reports `NotFound`.
	#[tracing::instrument(skip(self, token))]
	pub async fn lookup_by_token(&self, token: &str) -> Result<Invitation, AuthError> {
		self.fetch_pending(token).await
	}

	/// Accept an invitation.
	///
	/// The accepting principal's email must match the invitation's target
	/// (case-insensitively), and the principal must be in the invitation's
	/// tenant. If the principal already holds membership, the invitation is
	/// transitioned to `accepted` anyway and `Conflict` is reported.
	#[tracing::instrument(skip(self, principal, token), fields(user_id = %principal.user_id))]
	pub async fn accept(
		&self,
		principal: &Principal,
		token: &str,
	) -> Result<ProjectMember, AuthError> {
		let invitation = self.fetch_resolvable(token).await?;

		if !invitation.is_addressed_to(&principal.email) {
			// Naming the required email is deliberate: the invitation was
			// already addressed to it, so this reveals nothing new.
			return Err(AuthError::Forbidden(format!(
				"this invitation was issued to {}",
				invitation.email
			)));
		}

		if let Err(err) = ensure_same_tenant(principal.tenant_id, invitation.tenant_id) {
			tracing::warn!(
				caller_tenant = %principal.tenant_id,
				invitation_id = %invitation.id,
				"tenant mismatch on invitation acceptance"
			);
			return Err(err);
		}

		if self
			.projects
			.get_membership(&invitation.project_id, &principal.user_id, &principal.tenant_id)
			.await?
			.is_some()
		{
			// Idempotent: consume the invitation, report the conflict.
			self.invitations
				.transition_invitation(&invitation.id, InvitationStatus::Accepted)
				.await?;
			return Err(AuthError::Conflict(
				"you are already a member of this project".into(),
			));
		}

		// Membership before status transition: a crash here leaves the
		// invitation pending and re-acceptable, never consumed without
		// membership.
		let member = ProjectMember::new(
			invitation.tenant_id,
			invitation.project_id,
			principal.user_id,
			invitation.role,
		);
		if let Err(db_err) = self.projects.add_member(&member).await {
			if db_err.is_unique_violation() {
				// Raced another acceptance path for the same (project, user);
				// the constraint is the backstop. Consume and report.
				self.invitations
					.transition_invitation(&invitation.id, InvitationStatus::Accepted)
					.await?;
				return Err(AuthError::Conflict(
					"you are already a member of this project".into(),
				));
			}
			return Err(db_err.into());
		}

		let transitioned = self
			.invitations
			.transition_invitation(&invitation.id, InvitationStatus::Accepted)
			.await?;
		if !transitioned {
			// The invitation left pending concurrently; membership exists,
			// which is the outcome that matters.
			tracing::warn!(invitation_id = %invitation.id, "invitation was no longer pending at acceptance");
		}

		let project_name = self
			.projects
			.get_project_by_id(&invitation.project_id)
			.await?
			.map(|p| p.name)
			.unwrap_or_default();

		self.effects
			.dispatch(vec![
				SideEffect::Notify {
					notification: Notification::new(
						invitation.tenant_id,
						invitation.invited_by,
						NotificationKind::InvitationAccepted,
						serde_json::json!({
							"project": project_name,
							"email": invitation.email,
						}),
					),
				},
				SideEffect::Activity {
					entry: ActivityEntry::builder(
						invitation.tenant_id,
						ActivityEventType::InvitationAccepted,
					)
					.project(invitation.project_id)
					.actor(principal.user_id)
					.details(serde_json::json!({ "role": invitation.role }))
					.build(),
				},
			])
			.await;

		tracing::info!(invitation_id = %invitation.id, "invitation accepted");
		Ok(member)
	}

	/// Decline an invitation. Requires the email match but not tenant match:
	/// invitations are tenant-agnostic by email, and the addressee can
	/// always turn one down.
	#[tracing::instrument(skip(self, principal, token), fields(user_id = %principal.user_id))]
	pub async fn decline(&self, principal: &Principal, token: &str) -> Result<(), AuthError> {
		let invitation = self.fetch_resolvable(token).await?;

		if !invitation.is_addressed_to(&principal.email) {
			return Err(AuthError::Forbidden(format!(
				"this invitation was issued to {}",
				invitation.email
			)));
		}

		let transitioned = self
			.invitations
			.transition_invitation(&invitation.id, InvitationStatus::Declined)
			.await?;
		if !transitioned {
			return Err(AuthError::Conflict("invitation already resolved".into()));
		}

		self.effects
			.dispatch(vec![SideEffect::Activity {
				entry: ActivityEntry::builder(
					invitation.tenant_id,
					ActivityEventType::InvitationDeclined,
				)
				.project(invitation.project_id)
				.actor(principal.user_id)
				.build(),
			}])
			.await;

		tracing::info!(invitation_id = %invitation.id, "invitation declined");
		Ok(())
	}

	/// Cancel a pending invitation. Caller must administer the project.
	///
	/// Invitations are never deleted; cancellation transitions to `expired`.
	#[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id, invitation_id = %invitation_id))]
	pub async fn cancel(
		&self,
		principal: &Principal,
		invitation_id: &InvitationId,
	) -> Result<(), AuthError> {
		let invitation = self
			.invitations
			.get_invitation_by_id(invitation_id)
			.await?
			.ok_or_else(|| AuthError::NotFound("invitation".into()))?;

		self.load_guarded(principal, &invitation.project_id).await?;
		self.require_administer(principal, &invitation.project_id)
			.await?;

		let transitioned = self
			.invitations
			.transition_invitation(invitation_id, InvitationStatus::Expired)
			.await?;
		if !transitioned {
			return Err(AuthError::Conflict("invitation already resolved".into()));
		}

		self.effects
			.dispatch(vec![SideEffect::Activity {
				entry: ActivityEntry::builder(
					invitation.tenant_id,
					ActivityEventType::InvitationExpired,
				)
				.project(invitation.project_id)
				.actor(principal.user_id)
				.build(),
			}])
			.await;

		Ok(())
	}

	/// List pending invitations for a project. Caller must administer it.
	#[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id, project_id = %project_id))]
	pub async fn list_pending(
		&self,
		principal: &Principal,
		project_id: &ProjectId,
	) -> Result<Vec<Invitation>, AuthError> {
		self.load_guarded(principal, project_id).await?;
		self.require_administer(principal, project_id).await?;
		Ok(self.invitations.list_pending_invitations(project_id).await?)
	}

	/// Fetch an invitation by token, enforcing pending status and lazy
	/// expiry. For lookups, every non-pending state reads as `Gone`.
	async fn fetch_pending(&self, token: &str) -> Result<Invitation, AuthError> {
		let invitation = self.fetch(token).await?;

		match invitation.status {
			InvitationStatus::Pending => self.check_expiry(invitation).await,
			InvitationStatus::Expired
			| InvitationStatus::Accepted
			| InvitationStatus::Declined => {
				Err(AuthError::Gone("invitation is no longer available".into()))
			}
		}
	}

	/// Fetch an invitation for acceptance or decline. Unlike a plain lookup,
	/// an already-consumed invitation reads as `Conflict` here: the caller
	/// attempted a second resolution, which is an idempotency outcome, not a
	/// missing resource.
	async fn fetch_resolvable(&self, token: &str) -> Result<Invitation, AuthError> {
		let invitation = self.fetch(token).await?;

		match invitation.status {
			InvitationStatus::Pending => self.check_expiry(invitation).await,
			InvitationStatus::Expired => Err(AuthError::Gone("invitation has expired".into())),
			InvitationStatus::Accepted | InvitationStatus::Declined => {
				Err(AuthError::Conflict("invitation already resolved".into()))
			}
		}
	}

	async fn fetch(&self, token: &str) -> Result<Invitation, AuthError> {
		self.invitations
			.get_invitation_by_token_hash(&hash_invitation_token(token))
			.await?
			.ok_or_else(|| AuthError::NotFound("invitation".into()))
	}

	/// Lazy expiry: the lookup that observes a stale pending invitation
	/// persists the `expired` transition itself.
	async fn check_expiry(&self, invitation: Invitation) -> Result<Invitation, AuthError> {
		if invitation.is_expired(Utc::now()) {
			self.invitations
				.transition_invitation(&invitation.id, InvitationStatus::Expired)
				.await?;
			return Err(AuthError::Gone("invitation has expired".into()));
		}
		Ok(invitation)
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
				"tenant mismatch on invitation operation"
			);
			return Err(err);
		}

		Ok(project)
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
				"managing invitations requires an admin or owner role".into(),
			));
		}
		Ok(())
	}
}
