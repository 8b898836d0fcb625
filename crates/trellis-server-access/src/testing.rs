// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test helpers: a fully wired core over an in-memory database.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use trellis_server_auth::credential::Principal;
use trellis_server_auth::email::{EmailTemplate, MailError, MailSender};
use trellis_server_auth::notification::Notification;
use trellis_server_auth::project::{Project, ProjectMember};
use trellis_server_auth::tenant::Tenant;
use trellis_server_auth::types::ProjectRole;
use trellis_server_auth::user::User;
use trellis_server_db::activity::ActivityRepository;
use trellis_server_db::invitation::InvitationRepository;
use trellis_server_db::join_request::JoinRequestRepository;
use trellis_server_db::notification::NotificationRepository;
use trellis_server_db::project::ProjectRepository;
use trellis_server_db::tenant::TenantRepository;
use trellis_server_db::testing::create_test_pool_with_schema;
use trellis_server_db::user::UserRepository;

use crate::access::AccessResolver;
use crate::effects::EffectQueue;
use crate::invitations::InvitationService;
use crate::join_requests::JoinRequestService;
use crate::projects::ProjectService;

/// A [`MailSender`] that records recipient addresses.
#[derive(Default)]
pub struct RecordingMailer {
	sent: Mutex<Vec<String>>,
}

impl RecordingMailer {
	/// Recipients of every mail sent so far.
	pub fn recipients(&self) -> Vec<String> {
		self.sent.lock().unwrap().clone()
	}
}

#[async_trait]
impl MailSender for RecordingMailer {
	async fn send(&self, to: &str, _template: &EmailTemplate) -> Result<(), MailError> {
		self.sent.lock().unwrap().push(to.to_string());
		Ok(())
	}
}

/// A wired-up core over an in-memory database, with one default tenant.
pub struct TestCore {
	pub pool: sqlx::sqlite::SqlitePool,
	pub tenant: Tenant,
	pub tenants: TenantRepository,
	pub users: UserRepository,
	pub project_repo: ProjectRepository,
	pub notification_repo: NotificationRepository,
	pub mailer: Arc<RecordingMailer>,
	pub projects: ProjectService,
	pub invitations: InvitationService,
	pub join_requests: JoinRequestService,
}

impl TestCore {
	pub async fn new() -> Self {
		let pool = create_test_pool_with_schema().await;
		let tenants = TenantRepository::new(pool.clone());
		let users = UserRepository::new(pool.clone());
		let project_repo = ProjectRepository::new(pool.clone());
		let invitation_repo = InvitationRepository::new(pool.clone());
		let join_request_repo = JoinRequestRepository::new(pool.clone());
		let notification_repo = NotificationRepository::new(pool.clone());
		let activity_repo = ActivityRepository::new(pool.clone());

		let tenant = Tenant::new("Acme");
		tenants.create_tenant(&tenant).await.unwrap();

		let mailer = Arc::new(RecordingMailer::default());
		let effects = EffectQueue::new(
			mailer.clone(),
			Arc::new(notification_repo.clone()),
			Arc::new(activity_repo),
		);
		let resolver = AccessResolver::new(Arc::new(project_repo.clone()));

		let projects = ProjectService::new(
			Arc::new(project_repo.clone()),
			resolver.clone(),
			effects.clone(),
		);
		let invitations = InvitationService::new(
			Arc::new(invitation_repo),
			Arc::new(project_repo.clone()),
			Arc::new(users.clone()),
			resolver.clone(),
			effects.clone(),
		);
		let join_requests = JoinRequestService::new(
			Arc::new(join_request_repo),
			Arc::new(project_repo.clone()),
			Arc::new(users.clone()),
			resolver,
			effects,
		);

		Self {
			pool,
			tenant,
			tenants,
			users,
			project_repo,
			notification_repo,
			mailer,
			projects,
			invitations,
			join_requests,
		}
	}

	/// Create a user in the default tenant and return their principal.
	pub async fn make_principal(&self, email: &str) -> Principal {
		let user = User::new(self.tenant.id, email.split('@').next().unwrap(), email);
		self.users.create_user(&user).await.unwrap();
		Principal {
			user_id: user.id,
			tenant_id: user.tenant_id,
			email: user.email,
		}
	}

	/// Add an explicit membership row directly.
	pub async fn add_member(&self, project: &Project, principal: &Principal, role: ProjectRole) {
		let member = ProjectMember::new(
			principal.tenant_id,
			project.id,
			principal.user_id,
			role,
		);
		self.project_repo.add_member(&member).await.unwrap();
	}

	/// Recipients of every invitation email sent so far.
	pub async fn sent_mail(&self) -> Vec<String> {
		self.mailer.recipients()
	}

	/// All notifications addressed to the given principal, newest first.
	pub async fn notifications_for(&self, principal: &Principal) -> Vec<Notification> {
		self.notification_repo
			.list_notifications_for_user(&principal.user_id, false)
			.await
			.unwrap()
	}
}
