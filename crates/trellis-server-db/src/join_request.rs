// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Join-request repository for database operations.
//!
//! Resolution runs guarded on `status = 'pending'` and reports whether a row
//! was affected, so concurrent accept/decline calls observe exactly one
//! successful resolution.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::join_request::JoinRequest;
use trellis_server_auth::types::{JoinRequestId, JoinRequestStatus, ProjectId, TenantId, UserId};
use trellis_server_auth::user::User;

use crate::error::DbError;
use crate::row::{parse_datetime, parse_enum, parse_opt_datetime, parse_uuid};

#[async_trait]
pub trait JoinRequestStore: Send + Sync {
	async fn create_join_request(&self, request: &JoinRequest) -> Result<(), DbError>;
	async fn get_join_request_by_id(
		&self,
		id: &JoinRequestId,
	) -> Result<Option<JoinRequest>, DbError>;
	async fn has_pending_join_request(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<bool, DbError>;
	async fn resolve_join_request(
		&self,
		id: &JoinRequestId,
		to: JoinRequestStatus,
		resolved_by: &UserId,
	) -> Result<bool, DbError>;
	async fn list_pending_join_requests(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<(JoinRequest, User)>, DbError>;
}

/// Repository for join-request database operations.
#[derive(Clone)]
pub struct JoinRequestRepository {
	pool: SqlitePool,
}

impl JoinRequestRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a new join request.
	///
	/// # Database Constraints
	/// - (`project_id`, `user_id`) must be unique among pending requests
	#[tracing::instrument(skip(self, request), fields(join_request_id = %request.id, project_id = %request.project_id, user_id = %request.user_id))]
	pub async fn create_join_request(&self, request: &JoinRequest) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO join_requests
				(id, tenant_id, project_id, user_id, message, status, created_at, resolved_at, resolved_by)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(request.id.to_string())
		.bind(request.tenant_id.to_string())
		.bind(request.project_id.to_string())
		.bind(request.user_id.to_string())
		.bind(&request.message)
		.bind(request.status.to_string())
		.bind(request.created_at.to_rfc3339())
		.bind(request.resolved_at.map(|d| d.to_rfc3339()))
		.bind(request.resolved_by.map(|u| u.to_string()))
		.execute(&self.pool)
		.await?;

		tracing::debug!(join_request_id = %request.id, project_id = %request.project_id, user_id = %request.user_id, "join request created");
		Ok(())
	}

	/// Get a join request by ID.
	#[tracing::instrument(skip(self), fields(join_request_id = %id))]
	pub async fn get_join_request_by_id(
		&self,
		id: &JoinRequestId,
	) -> Result<Option<JoinRequest>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, tenant_id, project_id, user_id, message, status, created_at, resolved_at, resolved_by
			FROM join_requests
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_join_request(&r)).transpose()
	}

	/// Check if a user has a pending join request for a project.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, user_id = %user_id))]
	pub async fn has_pending_join_request(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<bool, DbError> {
		let row: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM join_requests
			WHERE project_id = ? AND user_id = ? AND status = 'pending'
			"#,
		)
		.bind(project_id.to_string())
		.bind(user_id.to_string())
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0 > 0)
	}

	/// Resolve a pending join request.
	///
	/// # Returns
	/// `true` if the request was pending and is now resolved; `false` if it
	/// was absent or already resolved (a concurrent caller won).
	#[tracing::instrument(skip(self), fields(join_request_id = %id, to = %to, resolved_by = %resolved_by))]
	pub async fn resolve_join_request(
		&self,
		id: &JoinRequestId,
		to: JoinRequestStatus,
		resolved_by: &UserId,
	) -> Result<bool, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE join_requests
			SET status = ?, resolved_at = ?, resolved_by = ?
			WHERE id = ? AND status = 'pending'
			"#,
		)
		.bind(to.to_string())
		.bind(&now)
		.bind(resolved_by.to_string())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let resolved = result.rows_affected() > 0;
		if resolved {
			tracing::debug!(join_request_id = %id, to = %to, "join request resolved");
		}
		Ok(resolved)
	}

	/// List pending join requests for a project with requester info.
	///
	/// # Returns
	/// List of (join_request, user) tuples ordered by creation date.
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn list_pending_join_requests(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<(JoinRequest, User)>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT
				jr.id, jr.tenant_id, jr.project_id, jr.user_id, jr.message, jr.status,
				jr.created_at, jr.resolved_at, jr.resolved_by,
				u.id as u_id, u.tenant_id as u_tenant_id, u.display_name, u.email, u.avatar_url,
				u.created_at as u_created_at, u.updated_at as u_updated_at
			FROM join_requests jr
			INNER JOIN users u ON jr.user_id = u.id
			WHERE jr.project_id = ? AND jr.status = 'pending'
			ORDER BY jr.created_at ASC
			"#,
		)
		.bind(project_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut result = Vec::with_capacity(rows.len());
		for row in &rows {
			let request = self.row_to_join_request(row)?;
			let user = self.row_to_user_prefixed(row)?;
			result.push((request, user));
		}
		tracing::debug!(project_id = %project_id, count = result.len(), "listed pending join requests");
		Ok(result)
	}

	fn row_to_join_request(&self, row: &sqlx::sqlite::SqliteRow) -> Result<JoinRequest, DbError> {
		let id_str: String = row.get("id");
		let tenant_id_str: String = row.get("tenant_id");
		let project_id_str: String = row.get("project_id");
		let user_id_str: String = row.get("user_id");
		let status_str: String = row.get("status");
		let created_at: String = row.get("created_at");
		let resolved_at: Option<String> = row.get("resolved_at");
		let resolved_by: Option<String> = row.get("resolved_by");

		Ok(JoinRequest {
			id: JoinRequestId::new(parse_uuid("join request ID", &id_str)?),
			tenant_id: TenantId::new(parse_uuid("tenant_id", &tenant_id_str)?),
			project_id: ProjectId::new(parse_uuid("project_id", &project_id_str)?),
			user_id: UserId::new(parse_uuid("user_id", &user_id_str)?),
			message: row.get("message"),
			status: parse_enum("status", &status_str)?,
			created_at: parse_datetime("created_at", &created_at)?,
			resolved_at: parse_opt_datetime("resolved_at", resolved_at)?,
			resolved_by: resolved_by
				.map(|v| parse_uuid("resolved_by", &v).map(UserId::new))
				.transpose()?,
		})
	}

	fn row_to_user_prefixed(&self, row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
		let id_str: String = row.get("u_id");
		let tenant_id_str: String = row.get("u_tenant_id");
		let created_at: String = row.get("u_created_at");
		let updated_at: String = row.get("u_updated_at");

		Ok(User {
			id: UserId::new(parse_uuid("user ID", &id_str)?),
			tenant_id: TenantId::new(parse_uuid("tenant_id", &tenant_id_str)?),
			display_name: row.get("display_name"),
			email: row.get("email"),
			avatar_url: row.get("avatar_url"),
			created_at: parse_datetime("created_at", &created_at)?,
			updated_at: parse_datetime("updated_at", &updated_at)?,
		})
	}
}

#[async_trait]
impl JoinRequestStore for JoinRequestRepository {
	async fn create_join_request(&self, request: &JoinRequest) -> Result<(), DbError> {
		self.create_join_request(request).await
	}

	async fn get_join_request_by_id(
		&self,
		id: &JoinRequestId,
	) -> Result<Option<JoinRequest>, DbError> {
		self.get_join_request_by_id(id).await
	}

	async fn has_pending_join_request(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<bool, DbError> {
		self.has_pending_join_request(project_id, user_id).await
	}

	async fn resolve_join_request(
		&self,
		id: &JoinRequestId,
		to: JoinRequestStatus,
		resolved_by: &UserId,
	) -> Result<bool, DbError> {
		self.resolve_join_request(id, to, resolved_by).await
	}

	async fn list_pending_join_requests(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<(JoinRequest, User)>, DbError> {
		self.list_pending_join_requests(project_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::project::ProjectRepository;
	use crate::tenant::TenantRepository;
	use crate::testing::create_test_pool_with_schema;
	use crate::user::UserRepository;
	use trellis_server_auth::project::Project;
	use trellis_server_auth::tenant::Tenant;
	use trellis_server_auth::user::User;

	struct Fixture {
		requests: JoinRequestRepository,
		users: UserRepository,
		project: Project,
		tenant: Tenant,
		creator: User,
	}

	async fn make_fixture() -> Fixture {
		let pool = create_test_pool_with_schema().await;
		let tenants = TenantRepository::new(pool.clone());
		let users = UserRepository::new(pool.clone());
		let projects = ProjectRepository::new(pool.clone());

		let tenant = Tenant::new("Acme");
		tenants.create_tenant(&tenant).await.unwrap();
		let creator = User::new(tenant.id, "Creator", "creator@x.com");
		users.create_user(&creator).await.unwrap();
		let project = Project::new(tenant.id, creator.id, "Apollo", None);
		projects.create_project(&project).await.unwrap();

		Fixture {
			requests: JoinRequestRepository::new(pool),
			users,
			project,
			tenant,
			creator,
		}
	}

	async fn make_requester(fx: &Fixture, email: &str) -> User {
		let user = User::new(fx.tenant.id, "Requester", email);
		fx.users.create_user(&user).await.unwrap();
		user
	}

	#[tokio::test]
	async fn test_create_and_get() {
		let fx = make_fixture().await;
		let requester = make_requester(&fx, "r@x.com").await;
		let request = JoinRequest::new(
			fx.tenant.id,
			fx.project.id,
			requester.id,
			Some("hi".to_string()),
		);
		fx.requests.create_join_request(&request).await.unwrap();

		let fetched = fx
			.requests
			.get_join_request_by_id(&request.id)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(fetched.user_id, requester.id);
		assert_eq!(fetched.message.as_deref(), Some("hi"));
		assert!(fetched.is_pending());
	}

	#[tokio::test]
	async fn test_pending_uniqueness_is_partial() {
		let fx = make_fixture().await;
		let requester = make_requester(&fx, "r@x.com").await;

		let first = JoinRequest::new(fx.tenant.id, fx.project.id, requester.id, None);
		fx.requests.create_join_request(&first).await.unwrap();

		// Second pending request for the same (project, user) conflicts.
		let duplicate = JoinRequest::new(fx.tenant.id, fx.project.id, requester.id, None);
		let err = fx.requests.create_join_request(&duplicate).await.unwrap_err();
		assert!(err.is_unique_violation());

		// After resolution a new request is allowed.
		fx.requests
			.resolve_join_request(&first.id, JoinRequestStatus::Declined, &fx.creator.id)
			.await
			.unwrap();
		let renewed = JoinRequest::new(fx.tenant.id, fx.project.id, requester.id, None);
		fx.requests.create_join_request(&renewed).await.unwrap();
	}

	#[tokio::test]
	async fn test_resolution_is_guarded_on_pending() {
		let fx = make_fixture().await;
		let requester = make_requester(&fx, "r@x.com").await;
		let request = JoinRequest::new(fx.tenant.id, fx.project.id, requester.id, None);
		fx.requests.create_join_request(&request).await.unwrap();

		assert!(fx
			.requests
			.resolve_join_request(&request.id, JoinRequestStatus::Accepted, &fx.creator.id)
			.await
			.unwrap());
		assert!(!fx
			.requests
			.resolve_join_request(&request.id, JoinRequestStatus::Declined, &fx.creator.id)
			.await
			.unwrap());

		let fetched = fx
			.requests
			.get_join_request_by_id(&request.id)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(fetched.status, JoinRequestStatus::Accepted);
		assert_eq!(fetched.resolved_by, Some(fx.creator.id));
		assert!(fetched.resolved_at.is_some());
	}

	#[tokio::test]
	async fn test_has_pending() {
		let fx = make_fixture().await;
		let requester = make_requester(&fx, "r@x.com").await;

		assert!(!fx
			.requests
			.has_pending_join_request(&fx.project.id, &requester.id)
			.await
			.unwrap());

		let request = JoinRequest::new(fx.tenant.id, fx.project.id, requester.id, None);
		fx.requests.create_join_request(&request).await.unwrap();

		assert!(fx
			.requests
			.has_pending_join_request(&fx.project.id, &requester.id)
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn test_list_pending_with_users() {
		let fx = make_fixture().await;
		let r1 = make_requester(&fx, "r1@x.com").await;
		let r2 = make_requester(&fx, "r2@x.com").await;

		fx.requests
			.create_join_request(&JoinRequest::new(
				fx.tenant.id,
				fx.project.id,
				r1.id,
				None,
			))
			.await
			.unwrap();
		let resolved = JoinRequest::new(fx.tenant.id, fx.project.id, r2.id, None);
		fx.requests.create_join_request(&resolved).await.unwrap();
		fx.requests
			.resolve_join_request(&resolved.id, JoinRequestStatus::Declined, &fx.creator.id)
			.await
			.unwrap();

		let listed = fx
			.requests
			.list_pending_join_requests(&fx.project.id)
			.await
			.unwrap();
		assert_eq!(listed.len(), 1);
		assert_eq!(listed[0].1.email, "r1@x.com");
	}
}
