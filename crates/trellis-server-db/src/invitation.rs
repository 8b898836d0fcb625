// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Invitation repository for database operations.
//!
//! Invitation rows are never deleted, only transitioned. Every transition
//! runs guarded on `status = 'pending'` and reports whether a row was
//! affected, so two concurrent acceptances of the same token observe exactly
//! one successful transition between them.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::invitation::Invitation;
use trellis_server_auth::types::{InvitationId, InvitationStatus, ProjectId, TenantId, UserId};
use trellis_server_auth::user::normalize_email;

use crate::error::DbError;
use crate::row::{parse_datetime, parse_enum, parse_uuid};

#[async_trait]
pub trait InvitationStore: Send + Sync {
	async fn create_invitation(&self, invitation: &Invitation) -> Result<(), DbError>;
	async fn get_invitation_by_id(
		&self,
		id: &InvitationId,
	) -> Result<Option<Invitation>, DbError>;
	async fn get_invitation_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<Invitation>, DbError>;
	async fn has_pending_invitation(
		&self,
		project_id: &ProjectId,
		email: &str,
	) -> Result<bool, DbError>;
	async fn transition_invitation(
		&self,
		id: &InvitationId,
		to: InvitationStatus,
	) -> Result<bool, DbError>;
	async fn list_pending_invitations(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<Invitation>, DbError>;
}

/// Repository for invitation database operations.
#[derive(Clone)]
pub struct InvitationRepository {
	pool: SqlitePool,
}

impl InvitationRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a new invitation.
	///
	/// # Database Constraints
	/// - `token_hash` must be unique
	/// - (`project_id`, `email`) must be unique among pending invitations
	#[tracing::instrument(skip(self, invitation), fields(invitation_id = %invitation.id, project_id = %invitation.project_id))]
	pub async fn create_invitation(&self, invitation: &Invitation) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO project_invitations
				(id, tenant_id, project_id, email, role, status, invited_by, token_hash, created_at, expires_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(invitation.id.to_string())
		.bind(invitation.tenant_id.to_string())
		.bind(invitation.project_id.to_string())
		.bind(&invitation.email)
		.bind(invitation.role.to_string())
		.bind(invitation.status.to_string())
		.bind(invitation.invited_by.to_string())
		// Note: token_hash is intentionally not logged
		.bind(&invitation.token_hash)
		.bind(invitation.created_at.to_rfc3339())
		.bind(invitation.expires_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(invitation_id = %invitation.id, project_id = %invitation.project_id, "invitation created");
		Ok(())
	}

	/// Get an invitation by ID.
	#[tracing::instrument(skip(self), fields(invitation_id = %id))]
	pub async fn get_invitation_by_id(
		&self,
		id: &InvitationId,
	) -> Result<Option<Invitation>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, tenant_id, project_id, email, role, status, invited_by, token_hash, created_at, expires_at
			FROM project_invitations
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_invitation(&r)).transpose()
	}

	/// Get an invitation by token hash.
	///
	/// # Returns
	/// `None` if no invitation exists with this hash.
	#[tracing::instrument(skip(self, token_hash))]
	pub async fn get_invitation_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<Invitation>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, tenant_id, project_id, email, role, status, invited_by, token_hash, created_at, expires_at
			FROM project_invitations
			WHERE token_hash = ?
			"#,
		)
		.bind(token_hash)
		.fetch_optional(&self.pool)
		.await?;

		let result = row.map(|r| self.row_to_invitation(&r)).transpose()?;
		if let Some(ref inv) = result {
			tracing::debug!(invitation_id = %inv.id, project_id = %inv.project_id, "invitation found by token hash");
		}
		Ok(result)
	}

	/// Check if a pending invitation already targets `(project, email)`.
	#[tracing::instrument(skip(self, email), fields(project_id = %project_id))]
	pub async fn has_pending_invitation(
		&self,
		project_id: &ProjectId,
		email: &str,
	) -> Result<bool, DbError> {
		let row: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM project_invitations
			WHERE project_id = ? AND email = ? AND status = 'pending'
			"#,
		)
		.bind(project_id.to_string())
		.bind(normalize_email(email))
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0 > 0)
	}

	/// Transition a pending invitation to a terminal status.
	///
	/// # Returns
	/// `true` if the invitation was pending and is now transitioned; `false`
	/// if it was absent or already terminal (a concurrent caller won the
	/// transition, or expiry already fired).
	#[tracing::instrument(skip(self), fields(invitation_id = %id, to = %to))]
	pub async fn transition_invitation(
		&self,
		id: &InvitationId,
		to: InvitationStatus,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE project_invitations
			SET status = ?
			WHERE id = ? AND status = 'pending'
			"#,
		)
		.bind(to.to_string())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let transitioned = result.rows_affected() > 0;
		if transitioned {
			tracing::debug!(invitation_id = %id, to = %to, "invitation transitioned");
		}
		Ok(transitioned)
	}

	/// List pending, unexpired invitations for a project.
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn list_pending_invitations(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<Invitation>, DbError> {
		let now = Utc::now().to_rfc3339();
		let rows = sqlx::query(
			r#"
			SELECT id, tenant_id, project_id, email, role, status, invited_by, token_hash, created_at, expires_at
			FROM project_invitations
			WHERE project_id = ? AND status = 'pending' AND expires_at > ?
			ORDER BY created_at DESC
			"#,
		)
		.bind(project_id.to_string())
		.bind(&now)
		.fetch_all(&self.pool)
		.await?;

		let invitations: Result<Vec<_>, _> =
			rows.iter().map(|r| self.row_to_invitation(r)).collect();
		let invitations = invitations?;
		tracing::debug!(project_id = %project_id, count = invitations.len(), "listed pending invitations");
		Ok(invitations)
	}

	fn row_to_invitation(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Invitation, DbError> {
		let id_str: String = row.get("id");
		let tenant_id_str: String = row.get("tenant_id");
		let project_id_str: String = row.get("project_id");
		let role_str: String = row.get("role");
		let status_str: String = row.get("status");
		let invited_by_str: String = row.get("invited_by");
		let created_at: String = row.get("created_at");
		let expires_at: String = row.get("expires_at");

		Ok(Invitation {
			id: InvitationId::new(parse_uuid("invitation ID", &id_str)?),
			tenant_id: TenantId::new(parse_uuid("tenant_id", &tenant_id_str)?),
			project_id: ProjectId::new(parse_uuid("project_id", &project_id_str)?),
			email: row.get("email"),
			role: parse_enum("role", &role_str)?,
			status: parse_enum("status", &status_str)?,
			invited_by: UserId::new(parse_uuid("invited_by", &invited_by_str)?),
			token_hash: row.get("token_hash"),
			created_at: parse_datetime("created_at", &created_at)?,
			expires_at: parse_datetime("expires_at", &expires_at)?,
		})
	}
}

#[async_trait]
impl InvitationStore for InvitationRepository {
	async fn create_invitation(&self, invitation: &Invitation) -> Result<(), DbError> {
		self.create_invitation(invitation).await
	}

	async fn get_invitation_by_id(
		&self,
		id: &InvitationId,
	) -> Result<Option<Invitation>, DbError> {
		self.get_invitation_by_id(id).await
	}

	async fn get_invitation_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<Invitation>, DbError> {
		self.get_invitation_by_token_hash(token_hash).await
	}

	async fn has_pending_invitation(
		&self,
		project_id: &ProjectId,
		email: &str,
	) -> Result<bool, DbError> {
		self.has_pending_invitation(project_id, email).await
	}

	async fn transition_invitation(
		&self,
		id: &InvitationId,
		to: InvitationStatus,
	) -> Result<bool, DbError> {
		self.transition_invitation(id, to).await
	}

	async fn list_pending_invitations(
		&self,
		project_id: &ProjectId,
	) -> Result<Vec<Invitation>, DbError> {
		self.list_pending_invitations(project_id).await
	}
}
