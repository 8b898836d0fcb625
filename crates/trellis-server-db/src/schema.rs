// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema initialization.
//!
//! Creates the tables and indexes the authorization core depends on. Two
//! constraints are load-bearing rather than hygienic:
//!
//! - `UNIQUE(project_id, user_id)` on `project_members` is the backstop for
//!   concurrent membership creation; application-level check-then-insert is
//!   racy on its own.
//! - The partial unique indexes on pending invitations and pending join
//!   requests enforce the one-pending-per-target invariants while leaving
//!   resolved rows free to accumulate.
//!
//! Cascade deletes flow tenant -> users/projects and project -> members/
//! invitations/join requests/activity, so deleting a project or tenant
//! removes its access-control edges atomically.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

/// Create all tables and indexes if they do not exist.
#[tracing::instrument(skip(pool))]
pub async fn init_schema(pool: &SqlitePool) -> Result<(), DbError> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS tenants (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL,
			status TEXT NOT NULL DEFAULT 'active',
			plan TEXT NOT NULL DEFAULT 'free',
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS users (
			id TEXT PRIMARY KEY,
			tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
			display_name TEXT NOT NULL,
			email TEXT NOT NULL,
			avatar_url TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL,
			UNIQUE(tenant_id, email)
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS projects (
			id TEXT PRIMARY KEY,
			tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
			name TEXT NOT NULL,
			description TEXT,
			status TEXT NOT NULL DEFAULT 'active',
			join_code TEXT NOT NULL UNIQUE,
			created_by TEXT NOT NULL,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS project_members (
			id TEXT PRIMARY KEY,
			tenant_id TEXT NOT NULL,
			project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
			user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
			role TEXT NOT NULL,
			created_at TEXT NOT NULL,
			UNIQUE(project_id, user_id)
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS project_invitations (
			id TEXT PRIMARY KEY,
			tenant_id TEXT NOT NULL,
			project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
			email TEXT NOT NULL,
			role TEXT NOT NULL,
			status TEXT NOT NULL DEFAULT 'pending',
			invited_by TEXT NOT NULL,
			token_hash TEXT NOT NULL UNIQUE,
			created_at TEXT NOT NULL,
			expires_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	// Uniqueness only constrains pending invitations: a project may
	// re-invite an email whose earlier invitation was accepted, declined,
	// or expired.
	sqlx::query(
		r#"
		CREATE UNIQUE INDEX IF NOT EXISTS idx_invitations_pending_target
		ON project_invitations(project_id, email)
		WHERE status = 'pending'
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS join_requests (
			id TEXT PRIMARY KEY,
			tenant_id TEXT NOT NULL,
			project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
			user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
			message TEXT,
			status TEXT NOT NULL DEFAULT 'pending',
			created_at TEXT NOT NULL,
			resolved_at TEXT,
			resolved_by TEXT
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE UNIQUE INDEX IF NOT EXISTS idx_join_requests_pending_target
		ON join_requests(project_id, user_id)
		WHERE status = 'pending'
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS notifications (
			id TEXT PRIMARY KEY,
			tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
			user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
			kind TEXT NOT NULL,
			payload TEXT NOT NULL,
			read INTEGER NOT NULL DEFAULT 0,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS activity_log (
			id TEXT PRIMARY KEY,
			tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
			project_id TEXT REFERENCES projects(id) ON DELETE CASCADE,
			actor_user_id TEXT,
			event_type TEXT NOT NULL,
			details TEXT NOT NULL,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	tracing::debug!("schema initialized");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn init_schema_is_idempotent() {
		let pool = create_test_pool().await;
		init_schema(&pool).await.unwrap();
		init_schema(&pool).await.unwrap();
	}

	#[tokio::test]
	async fn pending_invitation_uniqueness_is_partial() {
		let pool = create_test_pool().await;
		init_schema(&pool).await.unwrap();

		sqlx::query("INSERT INTO tenants (id, name, status, plan, created_at, updated_at) VALUES ('t', 'T', 'active', 'free', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')")
			.execute(&pool)
			.await
			.unwrap();
		sqlx::query("INSERT INTO projects (id, tenant_id, name, status, join_code, created_by, created_at, updated_at) VALUES ('p', 't', 'P', 'active', 'ABC234', 'u', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')")
			.execute(&pool)
			.await
			.unwrap();

		let insert = |id: &str, status: &str| {
			let pool = pool.clone();
			let id = id.to_string();
			let status = status.to_string();
			async move {
				sqlx::query(
					r#"
					INSERT INTO project_invitations
						(id, tenant_id, project_id, email, role, status, invited_by, token_hash, created_at, expires_at)
					VALUES (?, 't', 'p', 'a@x.com', 'member', ?, 'u', ?, '2026-01-01T00:00:00Z', '2026-01-08T00:00:00Z')
					"#,
				)
				.bind(&id)
				.bind(&status)
				.bind(format!("hash-{id}"))
				.execute(&pool)
				.await
			}
		};

		insert("i1", "accepted").await.unwrap();
		insert("i2", "pending").await.unwrap();
		// A second pending invitation for the same (project, email) violates
		// the partial index; a resolved one does not.
		assert!(insert("i3", "pending").await.is_err());
		insert("i4", "declined").await.unwrap();
	}

	#[tokio::test]
	async fn membership_uniqueness_is_total() {
		let pool = create_test_pool().await;
		init_schema(&pool).await.unwrap();

		sqlx::query("INSERT INTO tenants (id, name, status, plan, created_at, updated_at) VALUES ('t', 'T', 'active', 'free', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')")
			.execute(&pool)
			.await
			.unwrap();
		sqlx::query("INSERT INTO users (id, tenant_id, display_name, email, created_at, updated_at) VALUES ('u', 't', 'U', 'u@x.com', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')")
			.execute(&pool)
			.await
			.unwrap();
		sqlx::query("INSERT INTO projects (id, tenant_id, name, status, join_code, created_by, created_at, updated_at) VALUES ('p', 't', 'P', 'active', 'ABC234', 'u', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')")
			.execute(&pool)
			.await
			.unwrap();

		let insert = |id: &str, role: &str| {
			let pool = pool.clone();
			let id = id.to_string();
			let role = role.to_string();
			async move {
				sqlx::query(
					"INSERT INTO project_members (id, tenant_id, project_id, user_id, role, created_at) VALUES (?, 't', 'p', 'u', ?, '2026-01-01T00:00:00Z')",
				)
				.bind(&id)
				.bind(&role)
				.execute(&pool)
				.await
			}
		};

		insert("m1", "owner").await.unwrap();
		assert!(insert("m2", "member").await.is_err());
	}
}
