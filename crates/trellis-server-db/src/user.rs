// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User repository for database operations.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::types::{TenantId, UserId};
use trellis_server_auth::user::{normalize_email, User};

use crate::error::DbError;
use crate::row::{parse_datetime, parse_uuid};

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user(&self, user: &User) -> Result<(), DbError>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError>;
	async fn get_user_by_email(
		&self,
		tenant_id: &TenantId,
		email: &str,
	) -> Result<Option<User>, DbError>;
	async fn delete_user(&self, id: &UserId) -> Result<bool, DbError>;
}

/// Repository for user database operations.
///
/// Emails are stored normalized; lookups normalize their input so callers
/// can pass user-typed addresses directly.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a new user.
	///
	/// # Database Constraints
	/// - (`tenant_id`, `email`) must be unique
	/// - `tenant_id` must reference an existing tenant
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id, tenant_id = %user.tenant_id))]
	pub async fn create_user(&self, user: &User) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO users (id, tenant_id, display_name, email, avatar_url, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(user.id.to_string())
		.bind(user.tenant_id.to_string())
		.bind(&user.display_name)
		.bind(normalize_email(&user.email))
		.bind(&user.avatar_url)
		.bind(user.created_at.to_rfc3339())
		.bind(user.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_id = %user.id, "user created");
		Ok(())
	}

	/// Get a user by ID.
	///
	/// # Returns
	/// `None` if no user exists with this ID.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, tenant_id, display_name, email, avatar_url, created_at, updated_at
			FROM users
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_user(&r)).transpose()
	}

	/// Get a user by email within a tenant.
	///
	/// The same email can exist in other tenants as distinct users; this
	/// lookup never crosses the tenant boundary.
	#[tracing::instrument(skip(self, email), fields(tenant_id = %tenant_id))]
	pub async fn get_user_by_email(
		&self,
		tenant_id: &TenantId,
		email: &str,
	) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, tenant_id, display_name, email, avatar_url, created_at, updated_at
			FROM users
			WHERE tenant_id = ? AND email = ?
			"#,
		)
		.bind(tenant_id.to_string())
		.bind(normalize_email(email))
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_user(&r)).transpose()
	}

	/// Delete a user.
	///
	/// # Returns
	/// `true` if a user was deleted, `false` if not found.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn delete_user(&self, id: &UserId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM users
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(user_id = %id, "user deleted");
		}
		Ok(deleted)
	}

	fn row_to_user(&self, row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
		let id_str: String = row.get("id");
		let tenant_id_str: String = row.get("tenant_id");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

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
impl UserStore for UserRepository {
	async fn create_user(&self, user: &User) -> Result<(), DbError> {
		self.create_user(user).await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		self.get_user_by_id(id).await
	}

	async fn get_user_by_email(
		&self,
		tenant_id: &TenantId,
		email: &str,
	) -> Result<Option<User>, DbError> {
		self.get_user_by_email(tenant_id, email).await
	}

	async fn delete_user(&self, id: &UserId) -> Result<bool, DbError> {
		self.delete_user(id).await
	}
}
