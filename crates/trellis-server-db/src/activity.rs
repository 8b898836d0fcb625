// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Activity-log repository for database operations.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::activity::{ActivityEntry, ActivityError, ActivityRecorder};
use trellis_server_auth::types::{ActivityId, ProjectId, TenantId, UserId};

use crate::error::DbError;
use crate::row::{parse_datetime, parse_uuid};

#[async_trait]
pub trait ActivityStore: Send + Sync {
	async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), DbError>;
	async fn list_activity_for_project(
		&self,
		project_id: &ProjectId,
		limit: i32,
	) -> Result<Vec<ActivityEntry>, DbError>;
}

/// Repository for activity-log database operations.
#[derive(Clone)]
pub struct ActivityRepository {
	pool: SqlitePool,
}

impl ActivityRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Append an activity entry.
	#[tracing::instrument(skip(self, entry), fields(activity_id = %entry.id, event_type = %entry.event_type))]
	pub async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), DbError> {
		let details = serde_json::to_string(&entry.details)?;
		sqlx::query(
			r#"
			INSERT INTO activity_log (id, tenant_id, project_id, actor_user_id, event_type, details, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(entry.id.to_string())
		.bind(entry.tenant_id.to_string())
		.bind(entry.project_id.map(|p| p.to_string()))
		.bind(entry.actor_user_id.map(|u| u.to_string()))
		.bind(entry.event_type.to_string())
		.bind(details)
		.bind(entry.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(activity_id = %entry.id, "activity recorded");
		Ok(())
	}

	/// List recent activity for a project, newest first.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, limit))]
	pub async fn list_activity_for_project(
		&self,
		project_id: &ProjectId,
		limit: i32,
	) -> Result<Vec<ActivityEntry>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, tenant_id, project_id, actor_user_id, event_type, details, created_at
			FROM activity_log
			WHERE project_id = ?
			ORDER BY created_at DESC
			LIMIT ?
			"#,
		)
		.bind(project_id.to_string())
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;

		let entries: Result<Vec<_>, _> = rows.iter().map(|r| self.row_to_entry(r)).collect();
		let entries = entries?;
		tracing::debug!(project_id = %project_id, count = entries.len(), "listed activity");
		Ok(entries)
	}

	fn row_to_entry(&self, row: &sqlx::sqlite::SqliteRow) -> Result<ActivityEntry, DbError> {
		let id_str: String = row.get("id");
		let tenant_id_str: String = row.get("tenant_id");
		let project_id_str: Option<String> = row.get("project_id");
		let actor_str: Option<String> = row.get("actor_user_id");
		let event_type_str: String = row.get("event_type");
		let details_str: String = row.get("details");
		let created_at: String = row.get("created_at");

		let event_type = serde_json::from_value(serde_json::Value::String(event_type_str))
			.map_err(|e| DbError::Internal(format!("Invalid event_type: {e}")))?;

		Ok(ActivityEntry {
			id: ActivityId::new(parse_uuid("activity ID", &id_str)?),
			tenant_id: TenantId::new(parse_uuid("tenant_id", &tenant_id_str)?),
			project_id: project_id_str
				.map(|v| parse_uuid("project_id", &v).map(ProjectId::new))
				.transpose()?,
			actor_user_id: actor_str
				.map(|v| parse_uuid("actor_user_id", &v).map(UserId::new))
				.transpose()?,
			event_type,
			details: serde_json::from_str(&details_str)?,
			created_at: parse_datetime("created_at", &created_at)?,
		})
	}
}

#[async_trait]
impl ActivityStore for ActivityRepository {
	async fn record_activity(&self, entry: &ActivityEntry) -> Result<(), DbError> {
		self.record_activity(entry).await
	}

	async fn list_activity_for_project(
		&self,
		project_id: &ProjectId,
		limit: i32,
	) -> Result<Vec<ActivityEntry>, DbError> {
		self.list_activity_for_project(project_id, limit).await
	}
}

#[async_trait]
impl ActivityRecorder for ActivityRepository {
	async fn record(&self, entry: ActivityEntry) -> Result<(), ActivityError> {
		self.record_activity(&entry)
			.await
			.map_err(|e| ActivityError(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::project::ProjectRepository;
	use crate::tenant::TenantRepository;
	use crate::testing::create_test_pool_with_schema;
	use crate::user::UserRepository;
	use trellis_server_auth::activity::ActivityEventType;
	use trellis_server_auth::project::Project;
	use trellis_server_auth::tenant::Tenant;
	use trellis_server_auth::user::User;

	async fn make_fixture() -> (ActivityRepository, Tenant, Project, User) {
		let pool = create_test_pool_with_schema().await;
		let tenants = TenantRepository::new(pool.clone());
		let users = UserRepository::new(pool.clone());
		let projects = ProjectRepository::new(pool.clone());

		let tenant = Tenant::new("Acme");
		tenants.create_tenant(&tenant).await.unwrap();
		let user = User::new(tenant.id, "Alice", "alice@x.com");
		users.create_user(&user).await.unwrap();
		let project = Project::new(tenant.id, user.id, "Apollo", None);
		projects.create_project(&project).await.unwrap();

		(ActivityRepository::new(pool), tenant, project, user)
	}

	#[tokio::test]
	async fn test_record_and_list() {
		let (repo, tenant, project, user) = make_fixture().await;

		let entry = ActivityEntry::builder(tenant.id, ActivityEventType::ProjectCreated)
			.project(project.id)
			.actor(user.id)
			.details(serde_json::json!({"name": "Apollo"}))
			.build();
		repo.record_activity(&entry).await.unwrap();

		let listed = repo
			.list_activity_for_project(&project.id, 10)
			.await
			.unwrap();
		assert_eq!(listed.len(), 1);
		assert_eq!(listed[0].event_type, ActivityEventType::ProjectCreated);
		assert_eq!(listed[0].actor_user_id, Some(user.id));
		assert_eq!(listed[0].details["name"], "Apollo");
	}

	#[tokio::test]
	async fn test_recorder_trait_records() {
		let (repo, tenant, project, _user) = make_fixture().await;
		let entry = ActivityEntry::builder(tenant.id, ActivityEventType::MemberAdded)
			.project(project.id)
			.build();
		ActivityRecorder::record(&repo, entry).await.unwrap();

		let listed = repo
			.list_activity_for_project(&project.id, 10)
			.await
			.unwrap();
		assert_eq!(listed.len(), 1);
	}
}
