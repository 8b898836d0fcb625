// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end scenarios for the authorization core: tenant isolation,
//! membership uniqueness, invitation idempotence, expiry monotonicity, and
//! the join-by-code flow.

use std::sync::Arc;

use chrono::{Duration, Utc};
use trellis_server_access::testing::{RecordingMailer, TestCore};
use trellis_server_access::Core;
use trellis_server_auth::credential::{issue, CredentialClaims, CredentialKey, Principal};
use trellis_server_auth::error::AuthError;
use trellis_server_auth::invitation::Invitation;
use trellis_server_auth::notification::NotificationKind;
use trellis_server_auth::tenant::Tenant;
use trellis_server_auth::types::{ProjectRole, TenantStatus};
use trellis_server_auth::user::User;
use trellis_server_db::invitation::InvitationRepository;
use trellis_server_db::tenant::TenantRepository;
use trellis_server_db::testing::create_test_pool_with_schema;
use trellis_server_db::user::UserRepository;

/// Create a user in a second tenant and return their principal.
async fn make_foreign_principal(core: &TestCore, email: &str) -> (Tenant, Principal) {
	let tenant = Tenant::new("Globex");
	core.tenants.create_tenant(&tenant).await.unwrap();
	let user = User::new(tenant.id, "Foreign", email);
	core.users.create_user(&user).await.unwrap();
	(
		tenant,
		Principal {
			user_id: user.id,
			tenant_id: user.tenant_id,
			email: user.email,
		},
	)
}

#[tokio::test]
async fn join_by_code_end_to_end() {
	let core = TestCore::new().await;
	let u1 = core.make_principal("u1@x.com").await;
	let u2 = core.make_principal("u2@x.com").await;

	// Tenant T has project P, creator U1.
	let project = core.projects.create_project(&u1, "Apollo", None).await.unwrap();

	// U2, also in T, discovers by code.
	let seen = core
		.join_requests
		.discover_by_code(&u2, &project.join_code)
		.await
		.unwrap();
	assert!(!seen.is_member);
	assert!(!seen.has_pending_request);

	// U2 requests to join; U1 receives a notification.
	let request = core
		.join_requests
		.create(&u2, &project.id, Some("hello".into()))
		.await
		.unwrap();
	let inbox = core.notifications_for(&u1).await;
	assert_eq!(inbox.len(), 1);
	assert_eq!(inbox[0].kind, NotificationKind::JoinRequestReceived);

	// U1 accepts; a Member-role membership now exists.
	let member = core.join_requests.accept(&u1, &request.id).await.unwrap();
	assert_eq!(member.role, ProjectRole::Member);
	assert_eq!(member.user_id, u2.user_id);

	// A second accept on the same request id is a Conflict.
	let err = core.join_requests.accept(&u1, &request.id).await.unwrap_err();
	assert!(matches!(err, AuthError::Conflict(_)));

	// Exactly one membership row for U2 despite the second accept.
	let members = core.projects.list_members(&u1, &project.id).await.unwrap();
	let u2_rows = members.iter().filter(|(m, _)| m.user_id == u2.user_id).count();
	assert_eq!(u2_rows, 1);
}

#[tokio::test]
async fn cross_tenant_invitation_acceptance_is_rejected() {
	let core = TestCore::new().await;
	let u1 = core.make_principal("owner@x.com").await;
	let project = core.projects.create_project(&u1, "Apollo", None).await.unwrap();

	// Owner invites b@x.com as Viewer; token issued, expires in 7 days.
	let created = core
		.invitations
		.create(&u1, &project.id, "b@x.com", ProjectRole::Viewer)
		.await
		.unwrap();
	assert_eq!(
		created.invitation.expires_at,
		created.invitation.created_at + Duration::days(7)
	);

	// A user signs in as b@x.com but in a different tenant and accepts.
	let (_tenant, foreign_b) = make_foreign_principal(&core, "b@x.com").await;
	let err = core
		.invitations
		.accept(&foreign_b, &created.token)
		.await
		.unwrap_err();
	assert!(matches!(err, AuthError::TenantMismatch));

	// No membership was created.
	let members = core.projects.list_members(&u1, &project.id).await.unwrap();
	assert_eq!(members.len(), 1);
}

#[tokio::test]
async fn reinvitation_allowed_once_prior_is_terminal() {
	let core = TestCore::new().await;
	let u1 = core.make_principal("owner@x.com").await;
	let carol = core.make_principal("c@x.com").await;
	let project = core.projects.create_project(&u1, "Apollo", None).await.unwrap();

	let first = core
		.invitations
		.create(&u1, &project.id, "c@x.com", ProjectRole::Member)
		.await
		.unwrap();
	core.invitations.accept(&carol, &first.token).await.unwrap();

	// Carol is now a member, so a plain re-invite conflicts on membership,
	// but the pending-uniqueness constraint itself no longer applies: after
	// removing her membership a fresh invitation to the same (P, email) is
	// accepted even though the first invitation row still exists as
	// `accepted`.
	core.project_repo
		.remove_member(&project.id, &carol.user_id)
		.await
		.unwrap();
	core.invitations
		.create(&u1, &project.id, "c@x.com", ProjectRole::Viewer)
		.await
		.unwrap();
}

#[tokio::test]
async fn tenant_isolation_over_all_mutation_paths() {
	let core = TestCore::new().await;
	let u1 = core.make_principal("owner@x.com").await;
	let project = core.projects.create_project(&u1, "Apollo", None).await.unwrap();

	let (_tenant, outsider) = make_foreign_principal(&core, "outsider@y.com").await;

	// Every access or mutation attempt by a foreign-tenant principal fails
	// with TenantMismatch or NotFound, never succeeds.
	let err = core.projects.get_project(&outsider, &project.id).await.unwrap_err();
	assert!(matches!(err, AuthError::TenantMismatch | AuthError::NotFound(_)));

	let err = core.projects.delete_project(&outsider, &project.id).await.unwrap_err();
	assert!(matches!(err, AuthError::TenantMismatch | AuthError::NotFound(_)));

	let err = core
		.invitations
		.create(&outsider, &project.id, "x@y.com", ProjectRole::Member)
		.await
		.unwrap_err();
	assert!(matches!(err, AuthError::TenantMismatch | AuthError::NotFound(_)));

	let err = core
		.join_requests
		.create(&outsider, &project.id, None)
		.await
		.unwrap_err();
	assert!(matches!(err, AuthError::TenantMismatch | AuthError::NotFound(_)));

	let err = core
		.join_requests
		.list_pending(&outsider, &project.id)
		.await
		.unwrap_err();
	assert!(matches!(err, AuthError::TenantMismatch | AuthError::NotFound(_)));

	// The project is untouched.
	assert!(core.projects.get_project(&u1, &project.id).await.is_ok());
}

#[tokio::test]
async fn expired_invitation_is_gone_and_stays_gone() {
	let core = TestCore::new().await;
	let u1 = core.make_principal("owner@x.com").await;
	let bob = core.make_principal("b@x.com").await;
	let project = core.projects.create_project(&u1, "Apollo", None).await.unwrap();

	// Insert an invitation whose expiry is already in the past, bypassing
	// the service so the clock does not need to move.
	let invitations = InvitationRepository::new(core.pool.clone());
	let (mut invitation, token) = Invitation::new(
		core.tenant.id,
		project.id,
		"b@x.com",
		ProjectRole::Member,
		u1.user_id,
	);
	invitation.expires_at = Utc::now() - Duration::hours(1);
	invitations.create_invitation(&invitation).await.unwrap();

	// First lookup observes the expiry, transitions, and reports Gone.
	let err = core.invitations.lookup_by_token(&token).await.unwrap_err();
	assert!(matches!(err, AuthError::Gone(_)));

	// Every subsequent observation agrees.
	let err = core.invitations.lookup_by_token(&token).await.unwrap_err();
	assert!(matches!(err, AuthError::Gone(_)));
	let err = core.invitations.accept(&bob, &token).await.unwrap_err();
	assert!(matches!(err, AuthError::Gone(_)));
}

#[tokio::test]
async fn concurrent_acceptance_paths_yield_one_membership() {
	let core = TestCore::new().await;
	let u1 = core.make_principal("owner@x.com").await;
	let bob = core.make_principal("b@x.com").await;
	let project = core.projects.create_project(&u1, "Apollo", None).await.unwrap();

	// Bob holds both a pending invitation and a pending join request for
	// the same project.
	let created = core
		.invitations
		.create(&u1, &project.id, "b@x.com", ProjectRole::Admin)
		.await
		.unwrap();
	let request = core.join_requests.create(&bob, &project.id, None).await.unwrap();

	// One path wins...
	core.invitations.accept(&bob, &created.token).await.unwrap();

	// ...the other observes the existing membership and reports Conflict
	// instead of creating a second row.
	let err = core.join_requests.accept(&u1, &request.id).await.unwrap_err();
	assert!(matches!(err, AuthError::Conflict(_)));

	let members = core.projects.list_members(&u1, &project.id).await.unwrap();
	let bob_rows = members.iter().filter(|(m, _)| m.user_id == bob.user_id).count();
	assert_eq!(bob_rows, 1);
	// The invitation's Admin role won; the join request's fixed Member role
	// never overwrote it.
	let (bob_member, _) = members
		.iter()
		.find(|(m, _)| m.user_id == bob.user_id)
		.unwrap();
	assert_eq!(bob_member.role, ProjectRole::Admin);
}

#[tokio::test]
async fn authenticated_end_to_end_through_wired_core() {
	let pool = create_test_pool_with_schema().await;
	let key = CredentialKey::generate();
	let mailer = Arc::new(RecordingMailer::default());
	let core = Core::new(pool.clone(), key.clone(), mailer);

	let tenants = TenantRepository::new(pool.clone());
	let users = UserRepository::new(pool);

	let tenant = Tenant::new("Acme");
	tenants.create_tenant(&tenant).await.unwrap();
	let user = User::new(tenant.id, "Alice", "alice@x.com");
	users.create_user(&user).await.unwrap();

	// Sign in: issue a credential, resolve it, act with the principal.
	let claims = CredentialClaims::new(user.id, tenant.id, &user.email, 1);
	let token = issue(&claims, &key).unwrap();
	let principal = core.identity.authenticate(&token).await.unwrap();

	let project = core
		.projects
		.create_project(&principal, "Apollo", None)
		.await
		.unwrap();
	assert!(core.projects.get_project(&principal, &project.id).await.is_ok());

	// Suspending the tenant kills the credential on the next request even
	// though it has not expired.
	tenants
		.set_tenant_status(&tenant.id, TenantStatus::Suspended)
		.await
		.unwrap();
	let err = core.identity.authenticate(&token).await.unwrap_err();
	assert!(matches!(err, AuthError::TenantInactive));
}
