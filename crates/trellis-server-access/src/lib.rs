// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization core services for Trellis.
//!
//! This crate composes the domain types of `trellis-server-auth` with the
//! repositories of `trellis-server-db` into the services every request path
//! flows through:
//!
//! - [`identity::IdentityResolver`] - credential to [`Principal`] resolution
//! - [`access::AccessResolver`] - membership/role resolution with the
//!   creator fallback
//! - [`projects::ProjectService`] - creation, guarded reads, owner-only
//!   deletion
//! - [`invitations::InvitationService`] - the invitation lifecycle
//! - [`join_requests::JoinRequestService`] - the join-request lifecycle
//! - [`effects::EffectQueue`] - post-commit side-effect dispatch
//!
//! Control flow for every mutating operation: authenticate, load the target
//! resource, tenant guard, resolve access, apply a permission predicate,
//! perform the transition, dispatch effects.
//!
//! [`Principal`]: trellis_server_auth::Principal

use std::sync::Arc;

use sqlx::sqlite::SqlitePool;
use trellis_server_auth::credential::CredentialKey;
use trellis_server_auth::email::MailSender;
use trellis_server_db::activity::ActivityRepository;
use trellis_server_db::invitation::InvitationRepository;
use trellis_server_db::join_request::JoinRequestRepository;
use trellis_server_db::notification::NotificationRepository;
use trellis_server_db::project::ProjectRepository;
use trellis_server_db::tenant::TenantRepository;
use trellis_server_db::user::UserRepository;

pub mod access;
pub mod effects;
pub mod identity;
pub mod invitations;
pub mod join_requests;
pub mod projects;
pub mod testing;

pub use access::AccessResolver;
pub use effects::{EffectQueue, SideEffect};
pub use identity::IdentityResolver;
pub use invitations::{CreatedInvitation, InvitationService};
pub use join_requests::JoinRequestService;
pub use projects::ProjectService;

/// The fully wired authorization core.
///
/// One instance per process; every service is cheaply cloneable and safe to
/// share across request handlers. No state lives here beyond the pool — all
/// authorization decisions are recomputed from persisted state on every
/// call.
#[derive(Clone)]
pub struct Core {
	pub identity: IdentityResolver,
	pub access: AccessResolver,
	pub projects: ProjectService,
	pub invitations: InvitationService,
	pub join_requests: JoinRequestService,
}

impl Core {
	/// Wire the core over a database pool, credential key, and mail sender.
	pub fn new(pool: SqlitePool, key: CredentialKey, mailer: Arc<dyn MailSender>) -> Self {
		let tenants = TenantRepository::new(pool.clone());
		let users = UserRepository::new(pool.clone());
		let project_repo = ProjectRepository::new(pool.clone());
		let invitation_repo = InvitationRepository::new(pool.clone());
		let join_request_repo = JoinRequestRepository::new(pool.clone());
		let notification_repo = NotificationRepository::new(pool.clone());
		let activity_repo = ActivityRepository::new(pool);

		let effects = EffectQueue::new(
			mailer,
			Arc::new(notification_repo),
			Arc::new(activity_repo),
		);
		let access = AccessResolver::new(Arc::new(project_repo.clone()));

		let identity = IdentityResolver::new(key, Arc::new(users.clone()), Arc::new(tenants));
		let projects = ProjectService::new(
			Arc::new(project_repo.clone()),
			access.clone(),
			effects.clone(),
		);
		let invitations = InvitationService::new(
			Arc::new(invitation_repo),
			Arc::new(project_repo.clone()),
			Arc::new(users.clone()),
			access.clone(),
			effects.clone(),
		);
		let join_requests = JoinRequestService::new(
			Arc::new(join_request_repo),
			Arc::new(project_repo),
			Arc::new(users),
			access.clone(),
			effects,
		);

		Self {
			identity,
			access,
			projects,
			invitations,
			join_requests,
		}
	}
}
