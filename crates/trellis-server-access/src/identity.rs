// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity and session resolution.
//!
//! Every operation enters the core through [`IdentityResolver::authenticate`]:
//! the bearer credential is verified, the user is re-resolved against live
//! store state, and the tenant's status is checked. The order is fixed and
//! the tenant check runs on every request, not just at login, because a
//! tenant can be suspended after a credential was issued.
//!
//! Authentication is read-only: it never mutates last-seen timestamps or any
//! other bookkeeping.

use std::sync::Arc;

use chrono::Utc;
use trellis_server_auth::credential::{self, CredentialKey, Principal};
use trellis_server_auth::error::AuthError;
use trellis_server_db::tenant::TenantStore;
use trellis_server_db::user::UserStore;

/// Resolves bearer credentials to authenticated principals.
#[derive(Clone)]
pub struct IdentityResolver {
	key: CredentialKey,
	users: Arc<dyn UserStore>,
	tenants: Arc<dyn TenantStore>,
}

impl IdentityResolver {
	/// Create a resolver over the given key and stores.
	pub fn new(key: CredentialKey, users: Arc<dyn UserStore>, tenants: Arc<dyn TenantStore>) -> Self {
		Self { key, users, tenants }
	}

	/// Authenticate a bearer credential.
	///
	/// Validation order:
	/// 1. Signature and expiry (`InvalidCredential` / `ExpiredCredential`)
	/// 2. Re-resolve the user (`PrincipalNotFound` handles
	///    revocation-by-deletion)
	/// 3. Tenant status (`TenantInactive` for suspended/cancelled tenants)
	///
	/// The returned [`Principal`] carries the user's stored email, not the
	/// credential's copy, so later email comparisons always see current
	/// state.
	#[tracing::instrument(skip(self, token))]
	pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
		let claims = credential::verify(token, &self.key, Utc::now())?;

		let user = self
			.users
			.get_user_by_id(&claims.user_id)
			.await?
			.ok_or(AuthError::PrincipalNotFound)?;

		let tenant = self
			.tenants
			.get_tenant_by_id(&user.tenant_id)
			.await?
			.ok_or(AuthError::PrincipalNotFound)?;

		if !tenant.is_active() {
			tracing::debug!(tenant_id = %tenant.id, status = %tenant.status, "rejected principal of inactive tenant");
			return Err(AuthError::TenantInactive);
		}

		Ok(Principal {
			user_id: user.id,
			tenant_id: user.tenant_id,
			email: user.email,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use trellis_server_auth::credential::{issue, CredentialClaims};
	use trellis_server_auth::tenant::Tenant;
	use trellis_server_auth::types::TenantStatus;
	use trellis_server_auth::user::User;
	use trellis_server_db::tenant::TenantRepository;
	use trellis_server_db::testing::create_test_pool_with_schema;
	use trellis_server_db::user::UserRepository;

	struct Fixture {
		resolver: IdentityResolver,
		tenants: TenantRepository,
		users: UserRepository,
		key: CredentialKey,
		tenant: Tenant,
		user: User,
	}

	async fn make_fixture() -> Fixture {
		let pool = create_test_pool_with_schema().await;
		let tenants = TenantRepository::new(pool.clone());
		let users = UserRepository::new(pool.clone());

		let tenant = Tenant::new("Acme");
		tenants.create_tenant(&tenant).await.unwrap();
		let user = User::new(tenant.id, "Alice", "alice@x.com");
		users.create_user(&user).await.unwrap();

		let key = CredentialKey::generate();
		let resolver = IdentityResolver::new(
			key.clone(),
			Arc::new(users.clone()),
			Arc::new(tenants.clone()),
		);

		Fixture {
			resolver,
			tenants,
			users,
			key,
			tenant,
			user,
		}
	}

	fn make_token(fx: &Fixture, ttl_hours: i64) -> String {
		let claims = CredentialClaims::new(fx.user.id, fx.tenant.id, &fx.user.email, ttl_hours);
		issue(&claims, &fx.key).unwrap()
	}

	#[tokio::test]
	async fn authenticates_valid_credential() {
		let fx = make_fixture().await;
		let token = make_token(&fx, 1);

		let principal = fx.resolver.authenticate(&token).await.unwrap();
		assert_eq!(principal.user_id, fx.user.id);
		assert_eq!(principal.tenant_id, fx.tenant.id);
		assert_eq!(principal.email, "alice@x.com");
	}

	#[tokio::test]
	async fn rejects_garbage_token() {
		let fx = make_fixture().await;
		let err = fx.resolver.authenticate("ts_junk").await.unwrap_err();
		assert!(matches!(err, AuthError::InvalidCredential));
	}

	#[tokio::test]
	async fn rejects_expired_token() {
		let fx = make_fixture().await;
		let token = make_token(&fx, -1);
		let err = fx.resolver.authenticate(&token).await.unwrap_err();
		assert!(matches!(err, AuthError::ExpiredCredential));
	}

	#[tokio::test]
	async fn rejects_deleted_user() {
		let fx = make_fixture().await;
		let token = make_token(&fx, 1);
		fx.users.delete_user(&fx.user.id).await.unwrap();

		let err = fx.resolver.authenticate(&token).await.unwrap_err();
		assert!(matches!(err, AuthError::PrincipalNotFound));
	}

	#[tokio::test]
	async fn rejects_suspended_tenant_after_issue() {
		let fx = make_fixture().await;
		// Credential was issued while the tenant was active.
		let token = make_token(&fx, 1);
		fx.tenants
			.set_tenant_status(&fx.tenant.id, TenantStatus::Suspended)
			.await
			.unwrap();

		let err = fx.resolver.authenticate(&token).await.unwrap_err();
		assert!(matches!(err, AuthError::TenantInactive));
	}

	#[tokio::test]
	async fn rejects_cancelled_tenant() {
		let fx = make_fixture().await;
		let token = make_token(&fx, 1);
		fx.tenants
			.set_tenant_status(&fx.tenant.id, TenantStatus::Cancelled)
			.await
			.unwrap();

		let err = fx.resolver.authenticate(&token).await.unwrap_err();
		assert!(matches!(err, AuthError::TenantInactive));
	}

	#[tokio::test]
	async fn principal_email_reflects_store_not_credential() {
		let fx = make_fixture().await;
		// Claims carry a stale email; the store wins.
		let claims = CredentialClaims::new(fx.user.id, fx.tenant.id, "stale@x.com", 1);
		let token = issue(&claims, &fx.key).unwrap();

		let principal = fx.resolver.authenticate(&token).await.unwrap();
		assert_eq!(principal.email, "alice@x.com");
	}
}
