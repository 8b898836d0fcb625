// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenant repository for database operations.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::tenant::Tenant;
use trellis_server_auth::types::{TenantId, TenantStatus};

use crate::error::DbError;
use crate::row::{parse_datetime, parse_enum, parse_uuid};

#[async_trait]
pub trait TenantStore: Send + Sync {
	async fn create_tenant(&self, tenant: &Tenant) -> Result<(), DbError>;
	async fn get_tenant_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DbError>;
	async fn set_tenant_status(&self, id: &TenantId, status: TenantStatus) -> Result<(), DbError>;
	async fn delete_tenant(&self, id: &TenantId) -> Result<bool, DbError>;
}

/// Repository for tenant database operations.
#[derive(Clone)]
pub struct TenantRepository {
	pool: SqlitePool,
}

impl TenantRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a new tenant.
	#[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id))]
	pub async fn create_tenant(&self, tenant: &Tenant) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO tenants (id, name, status, plan, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(tenant.id.to_string())
		.bind(&tenant.name)
		.bind(tenant.status.to_string())
		.bind(tenant.plan.to_string())
		.bind(tenant.created_at.to_rfc3339())
		.bind(tenant.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(tenant_id = %tenant.id, "tenant created");
		Ok(())
	}

	/// Get a tenant by ID.
	///
	/// # Returns
	/// `None` if no tenant exists with this ID.
	#[tracing::instrument(skip(self), fields(tenant_id = %id))]
	pub async fn get_tenant_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, status, plan, created_at, updated_at
			FROM tenants
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_tenant(&r)).transpose()
	}

	/// Set a tenant's lifecycle status.
	///
	/// Suspending or cancelling takes effect on the next authenticated
	/// request from any of the tenant's users.
	#[tracing::instrument(skip(self), fields(tenant_id = %id, status = %status))]
	pub async fn set_tenant_status(
		&self,
		id: &TenantId,
		status: TenantStatus,
	) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE tenants
			SET status = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(status.to_string())
		.bind(&now)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(tenant_id = %id, status = %status, "tenant status updated");
		Ok(())
	}

	/// Delete a tenant. Cascades to users, projects, and everything below.
	///
	/// # Returns
	/// `true` if a tenant was deleted, `false` if not found.
	#[tracing::instrument(skip(self), fields(tenant_id = %id))]
	pub async fn delete_tenant(&self, id: &TenantId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM tenants
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(tenant_id = %id, "tenant deleted");
		}
		Ok(deleted)
	}

	fn row_to_tenant(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Tenant, DbError> {
		let id_str: String = row.get("id");
		let status_str: String = row.get("status");
		let plan_str: String = row.get("plan");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

		Ok(Tenant {
			id: TenantId::new(parse_uuid("tenant ID", &id_str)?),
			name: row.get("name"),
			status: parse_enum("status", &status_str)?,
			plan: parse_enum("plan", &plan_str)?,
			created_at: parse_datetime("created_at", &created_at)?,
			updated_at: parse_datetime("updated_at", &updated_at)?,
		})
	}
}

#[async_trait]
impl TenantStore for TenantRepository {
	async fn create_tenant(&self, tenant: &Tenant) -> Result<(), DbError> {
		self.create_tenant(tenant).await
	}

	async fn get_tenant_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DbError> {
		self.get_tenant_by_id(id).await
	}

	async fn set_tenant_status(&self, id: &TenantId, status: TenantStatus) -> Result<(), DbError> {
		self.set_tenant_status(id, status).await
	}

	async fn delete_tenant(&self, id: &TenantId) -> Result<bool, DbError> {
		self.delete_tenant(id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool_with_schema;

	async fn make_repo() -> TenantRepository {
		TenantRepository::new(create_test_pool_with_schema().await)
	}

	#[tokio::test]
	async fn test_create_and_get_tenant() {
		let repo = make_repo().await;
		let tenant = Tenant::new("Acme");

		repo.create_tenant(&tenant).await.unwrap();

		let fetched = repo.get_tenant_by_id(&tenant.id).await.unwrap().unwrap();
		assert_eq!(fetched.id, tenant.id);
		assert_eq!(fetched.name, "Acme");
		assert_eq!(fetched.status, TenantStatus::Active);
	}

	#[tokio::test]
	async fn test_get_tenant_not_found() {
		let repo = make_repo().await;
		let result = repo.get_tenant_by_id(&TenantId::generate()).await.unwrap();
		assert!(result.is_none());
	}

	#[tokio::test]
	async fn test_set_status() {
		let repo = make_repo().await;
		let tenant = Tenant::new("Acme");
		repo.create_tenant(&tenant).await.unwrap();

		repo.set_tenant_status(&tenant.id, TenantStatus::Suspended)
			.await
			.unwrap();

		let fetched = repo.get_tenant_by_id(&tenant.id).await.unwrap().unwrap();
		assert_eq!(fetched.status, TenantStatus::Suspended);
		assert!(!fetched.is_active());
	}

	#[tokio::test]
	async fn test_delete_tenant() {
		let repo = make_repo().await;
		let tenant = Tenant::new("Acme");
		repo.create_tenant(&tenant).await.unwrap();

		assert!(repo.delete_tenant(&tenant.id).await.unwrap());
		assert!(repo.get_tenant_by_id(&tenant.id).await.unwrap().is_none());
		assert!(!repo.delete_tenant(&tenant.id).await.unwrap());
	}
}
