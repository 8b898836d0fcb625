// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project repository for database operations.
//!
//! This module provides database access for project management including:
//! - Project CRUD operations
//! - Membership management (the authoritative access-control edges)
//! - Join-code lookup for social discovery

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::project::{Project, ProjectMember};
use trellis_server_auth::types::{MemberId, ProjectId, ProjectRole, TenantId, UserId};
use trellis_server_auth::user::User;

use crate::error::DbError;
use crate::row::{parse_datetime, parse_enum, parse_uuid};

#[async_trait]
pub trait ProjectStore: Send + Sync {
	async fn create_project(&self, project: &Project) -> Result<(), DbError>;
	async fn get_project_by_id(&self, id: &ProjectId) -> Result<Option<Project>, DbError>;
	async fn get_project_by_join_code(&self, code: &str) -> Result<Option<Project>, DbError>;
	async fn join_code_exists(&self, code: &str) -> Result<bool, DbError>;
	async fn delete_project(&self, id: &ProjectId) -> Result<bool, DbError>;
	async fn list_projects_for_user(&self, user_id: &UserId) -> Result<Vec<Project>, DbError>;
	async fn add_member(&self, member: &ProjectMember) -> Result<(), DbError>;
	async fn get_membership(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
		tenant_id: &TenantId,
	) -> Result<Option<ProjectMember>, DbError>;
	async fn update_member_role(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
		role: ProjectRole,
	) -> Result<bool, DbError>;
	async fn remove_member(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<bool, DbError>;
	async fn list_members(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<(ProjectMember, User)>, DbError>;
	async fn find_explicit_owner(
		&self,
		project_id: &ProjectId,
	) -> Result<Option<ProjectMember>, DbError>;
}

/// Repository for project database operations.
///
/// Manages projects and their membership edges. All IDs are UUIDs stored as
/// strings in SQLite.
#[derive(Clone)]
pub struct ProjectRepository {
	pool: SqlitePool,
}

impl ProjectRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Project CRUD
	// =========================================================================

	/// Create a new project.
	///
	/// # Database Constraints
	/// - `id` must be unique
	/// - `join_code` must be unique across all projects
	#[tracing::instrument(skip(self, project), fields(project_id = %project.id, tenant_id = %project.tenant_id))]
	pub async fn create_project(&self, project: &Project) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO projects (id, tenant_id, name, description, status, join_code, created_by, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(project.id.to_string())
		.bind(project.tenant_id.to_string())
		.bind(&project.name)
		.bind(&project.description)
		.bind(project.status.to_string())
		.bind(&project.join_code)
		.bind(project.created_by.to_string())
		.bind(project.created_at.to_rfc3339())
		.bind(project.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(project_id = %project.id, "project created");
		Ok(())
	}

	/// Get a project by ID.
	///
	/// # Returns
	/// `None` if no project exists with this ID.
	#[tracing::instrument(skip(self), fields(project_id = %id))]
	pub async fn get_project_by_id(&self, id: &ProjectId) -> Result<Option<Project>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, tenant_id, name, description, status, join_code, created_by, created_at, updated_at
			FROM projects
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_project(&r)).transpose()
	}

	/// Get a project by its join code.
	///
	/// Join-code lookup deliberately crosses tenant boundaries: any
	/// authenticated user may discover a project summary by code. The
	/// same-tenant rule is enforced when a join request is created, not here.
	#[tracing::instrument(skip(self, code))]
	pub async fn get_project_by_join_code(&self, code: &str) -> Result<Option<Project>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, tenant_id, name, description, status, join_code, created_by, created_at, updated_at
			FROM projects
			WHERE join_code = ?
			"#,
		)
		.bind(code)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_project(&r)).transpose()
	}

	/// Check whether a join code is already taken.
	#[tracing::instrument(skip(self, code))]
	pub async fn join_code_exists(&self, code: &str) -> Result<bool, DbError> {
		let row: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM projects
			WHERE join_code = ?
			"#,
		)
		.bind(code)
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0 > 0)
	}

	/// Delete a project. Cascades to members, invitations, join requests,
	/// and activity.
	///
	/// # Returns
	/// `true` if a project was deleted, `false` if not found.
	#[tracing::instrument(skip(self), fields(project_id = %id))]
	pub async fn delete_project(&self, id: &ProjectId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM projects
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(project_id = %id, "project deleted");
		}
		Ok(deleted)
	}

	/// List projects a user is an explicit member of, ordered by name.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn list_projects_for_user(
		&self,
		user_id: &UserId,
	) -> Result<Vec<Project>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT p.id, p.tenant_id, p.name, p.description, p.status, p.join_code, p.created_by, p.created_at, p.updated_at
			FROM projects p
			INNER JOIN project_members m ON p.id = m.project_id
			WHERE m.user_id = ?
			ORDER BY p.name ASC
			"#,
		)
		.bind(user_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let projects: Result<Vec<_>, _> = rows.iter().map(|r| self.row_to_project(r)).collect();
		let projects = projects?;
		tracing::debug!(user_id = %user_id, count = projects.len(), "listed projects for user");
		Ok(projects)
	}

	// =========================================================================
	// Memberships
	// =========================================================================

	/// Add a member to a project.
	///
	/// # Database Constraints
	/// - (`project_id`, `user_id`) must be unique. This constraint, not the
	///   caller's pre-checks, is what guarantees membership uniqueness under
	///   concurrent invitation and join-request acceptance.
	#[tracing::instrument(skip(self, member), fields(project_id = %member.project_id, user_id = %member.user_id, role = %member.role))]
	pub async fn add_member(&self, member: &ProjectMember) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO project_members (id, tenant_id, project_id, user_id, role, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(member.id.to_string())
		.bind(member.tenant_id.to_string())
		.bind(member.project_id.to_string())
		.bind(member.user_id.to_string())
		.bind(member.role.to_string())
		.bind(member.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(project_id = %member.project_id, user_id = %member.user_id, role = %member.role, "member added to project");
		Ok(())
	}

	/// Get a membership for a user in a project.
	///
	/// The tenant id participates in the predicate so a membership row can
	/// never be observed across a tenant boundary.
	///
	/// # Returns
	/// `None` if the user is not an explicit member.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, user_id = %user_id))]
	pub async fn get_membership(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
		tenant_id: &TenantId,
	) -> Result<Option<ProjectMember>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, tenant_id, project_id, user_id, role, created_at
			FROM project_members
			WHERE project_id = ? AND user_id = ? AND tenant_id = ?
			"#,
		)
		.bind(project_id.to_string())
		.bind(user_id.to_string())
		.bind(tenant_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_member(&r)).transpose()
	}

	/// Update a member's role.
	///
	/// # Returns
	/// `true` if a membership row was updated, `false` if not found.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, user_id = %user_id, role = %role))]
	pub async fn update_member_role(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
		role: ProjectRole,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE project_members
			SET role = ?
			WHERE project_id = ? AND user_id = ?
			"#,
		)
		.bind(role.to_string())
		.bind(project_id.to_string())
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		let updated = result.rows_affected() > 0;
		if updated {
			tracing::debug!(project_id = %project_id, user_id = %user_id, role = %role, "member role updated");
		}
		Ok(updated)
	}

	/// Remove a member from a project.
	///
	/// # Returns
	/// `true` if a member was removed, `false` if not found.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, user_id = %user_id))]
	pub async fn remove_member(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM project_members
			WHERE project_id = ? AND user_id = ?
			"#,
		)
		.bind(project_id.to_string())
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		let removed = result.rows_affected() > 0;
		if removed {
			tracing::debug!(project_id = %project_id, user_id = %user_id, "member removed from project");
		}
		Ok(removed)
	}

	/// List all members of a project with their user info.
	///
	/// # Returns
	/// List of (membership, user) tuples ordered by join date.
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn list_members(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<(ProjectMember, User)>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT
				m.id, m.tenant_id, m.project_id, m.user_id, m.role, m.created_at,
				u.id as u_id, u.tenant_id as u_tenant_id, u.display_name, u.email, u.avatar_url,
				u.created_at as u_created_at, u.updated_at as u_updated_at
			FROM project_members m
			INNER JOIN users u ON m.user_id = u.id
			WHERE m.project_id = ?
			ORDER BY m.created_at ASC
			"#,
		)
		.bind(project_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut result = Vec::with_capacity(rows.len());
		for row in &rows {
			let member = self.row_to_member(row)?;
			let user = self.row_to_user_prefixed(row)?;
			result.push((member, user));
		}
		tracing::debug!(project_id = %project_id, count = result.len(), "listed project members");
		Ok(result)
	}

	/// Find the explicit Owner-role member of a project, if one exists.
	///
	/// Callers needing "the owner" fall back to the project's `created_by`
	/// when this returns `None`, mirroring the access resolver's creator
	/// fallback.
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn find_explicit_owner(
		&self,
		project_id: &ProjectId,
	) -> Result<Option<ProjectMember>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, tenant_id, project_id, user_id, role, created_at
			FROM project_members
			WHERE project_id = ? AND role = 'owner'
			ORDER BY created_at ASC
			LIMIT 1
			"#,
		)
		.bind(project_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_member(&r)).transpose()
	}

	// =========================================================================
	// Helpers
	// =========================================================================

	fn row_to_project(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Project, DbError> {
		let id_str: String = row.get("id");
		let tenant_id_str: String = row.get("tenant_id");
		let status_str: String = row.get("status");
		let created_by_str: String = row.get("created_by");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

		Ok(Project {
			id: ProjectId::new(parse_uuid("project ID", &id_str)?),
			tenant_id: TenantId::new(parse_uuid("tenant_id", &tenant_id_str)?),
			name: row.get("name"),
			description: row.get("description"),
			status: parse_enum("status", &status_str)?,
			join_code: row.get("join_code"),
			created_by: UserId::new(parse_uuid("created_by", &created_by_str)?),
			created_at: parse_datetime("created_at", &created_at)?,
			updated_at: parse_datetime("updated_at", &updated_at)?,
		})
	}

	fn row_to_member(&self, row: &sqlx::sqlite::SqliteRow) -> Result<ProjectMember, DbError> {
		let id_str: String = row.get("id");
		let tenant_id_str: String = row.get("tenant_id");
		let project_id_str: String = row.get("project_id");
		let user_id_str: String = row.get("user_id");
		let role_str: String = row.get("role");
		let created_at: String = row.get("created_at");

		Ok(ProjectMember {
			id: MemberId::new(parse_uuid("member ID", &id_str)?),
			tenant_id: TenantId::new(parse_uuid("tenant_id", &tenant_id_str)?),
			project_id: ProjectId::new(parse_uuid("project_id", &project_id_str)?),
			user_id: UserId::new(parse_uuid("user_id", &user_id_str)?),
			role: parse_enum("role", &role_str)?,
			created_at: parse_datetime("created_at", &created_at)?,
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
impl ProjectStore for ProjectRepository {
	async fn create_project(&self, project: &Project) -> Result<(), DbError> {
		self.create_project(project).await
	}

	async fn get_project_by_id(&self, id: &ProjectId) -> Result<Option<Project>, DbError> {
		self.get_project_by_id(id).await
	}

	async fn get_project_by_join_code(&self, code: &str) -> Result<Option<Project>, DbError> {
		self.get_project_by_join_code(code).await
	}

	async fn join_code_exists(&self, code: &str) -> Result<bool, DbError> {
		self.join_code_exists(code).await
	}

	async fn delete_project(&self, id: &ProjectId) -> Result<bool, DbError> {
		self.delete_project(id).await
	}

	async fn list_projects_for_user(&self, user_id: &UserId) -> Result<Vec<Project>, DbError> {
		self.list_projects_for_user(user_id).await
	}

	async fn add_member(&self, member: &ProjectMember) -> Result<(), DbError> {
		self.add_member(member).await
	}

	async fn get_membership(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
		tenant_id: &TenantId,
	) -> Result<Option<ProjectMember>, DbError> {
		self.get_membership(project_id, user_id, tenant_id).await
	}

	async fn update_member_role(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
		role: ProjectRole,
	) -> Result<bool, DbError> {
		self.update_member_role(project_id, user_id, role).await
	}

	async fn remove_member(
		&self,
		project_id: &ProjectId,
		user_id: &UserId,
	) -> Result<bool, DbError> {
		self.remove_member(project_id, user_id).await
	}

	async fn list_members(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<(ProjectMember, User)>, DbError> {
		self.list_members(project_id).await
	}

	async fn find_explicit_owner(
		&self,
		project_id: &ProjectId,
	) -> Result<Option<ProjectMember>, DbError> {
		self.find_explicit_owner(project_id).await
	}
}
