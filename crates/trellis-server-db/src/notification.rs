// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notification repository for database operations.
//!
//! Implements the core's [`NotificationSink`] so the effect queue can write
//! straight to persistence.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::notification::{Notification, NotificationError, NotificationSink};
use trellis_server_auth::types::{NotificationId, TenantId, UserId};

use crate::error::DbError;
use crate::row::{parse_datetime, parse_enum, parse_uuid};

#[async_trait]
pub trait NotificationStore: Send + Sync {
	async fn create_notification(&self, notification: &Notification) -> Result<(), DbError>;
	async fn list_notifications_for_user(
		&self,
		user_id: &UserId,
		unread_only: bool,
	) -> Result<Vec<Notification>, DbError>;
	async fn mark_notification_read(&self, id: &NotificationId) -> Result<bool, DbError>;
	async fn count_unread(&self, user_id: &UserId) -> Result<i64, DbError>;
}

/// Repository for notification database operations.
#[derive(Clone)]
pub struct NotificationRepository {
	pool: SqlitePool,
}

impl NotificationRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Append a notification.
	#[tracing::instrument(skip(self, notification), fields(notification_id = %notification.id, user_id = %notification.user_id, kind = %notification.kind))]
	pub async fn create_notification(&self, notification: &Notification) -> Result<(), DbError> {
		let payload = serde_json::to_string(&notification.payload)?;
		sqlx::query(
			r#"
			INSERT INTO notifications (id, tenant_id, user_id, kind, payload, read, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(notification.id.to_string())
		.bind(notification.tenant_id.to_string())
		.bind(notification.user_id.to_string())
		.bind(notification.kind.to_string())
		.bind(payload)
		.bind(notification.read as i32)
		.bind(notification.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(notification_id = %notification.id, "notification created");
		Ok(())
	}

	/// List notifications for a user, newest first.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, unread_only))]
	pub async fn list_notifications_for_user(
		&self,
		user_id: &UserId,
		unread_only: bool,
	) -> Result<Vec<Notification>, DbError> {
		let query = if unread_only {
			r#"
			SELECT id, tenant_id, user_id, kind, payload, read, created_at
			FROM notifications
			WHERE user_id = ? AND read = 0
			ORDER BY created_at DESC
			"#
		} else {
			r#"
			SELECT id, tenant_id, user_id, kind, payload, read, created_at
			FROM notifications
			WHERE user_id = ?
			ORDER BY created_at DESC
			"#
		};

		let rows = sqlx::query(query)
			.bind(user_id.to_string())
			.fetch_all(&self.pool)
			.await?;

		let notifications: Result<Vec<_>, _> =
			rows.iter().map(|r| self.row_to_notification(r)).collect();
		let notifications = notifications?;
		tracing::debug!(user_id = %user_id, count = notifications.len(), "listed notifications");
		Ok(notifications)
	}

	/// Mark a notification as read.
	///
	/// # Returns
	/// `true` if a notification was updated, `false` if not found.
	#[tracing::instrument(skip(self), fields(notification_id = %id))]
	pub async fn mark_notification_read(&self, id: &NotificationId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE notifications
			SET read = 1
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	/// Count unread notifications for a user.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn count_unread(&self, user_id: &UserId) -> Result<i64, DbError> {
		let row: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM notifications
			WHERE user_id = ? AND read = 0
			"#,
		)
		.bind(user_id.to_string())
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0)
	}

	fn row_to_notification(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Notification, DbError> {
		let id_str: String = row.get("id");
		let tenant_id_str: String = row.get("tenant_id");
		let user_id_str: String = row.get("user_id");
		let kind_str: String = row.get("kind");
		let payload_str: String = row.get("payload");
		let read: i32 = row.get("read");
		let created_at: String = row.get("created_at");

		Ok(Notification {
			id: NotificationId::new(parse_uuid("notification ID", &id_str)?),
			tenant_id: TenantId::new(parse_uuid("tenant_id", &tenant_id_str)?),
			user_id: UserId::new(parse_uuid("user_id", &user_id_str)?),
			kind: parse_enum("kind", &kind_str)?,
			payload: serde_json::from_str(&payload_str)?,
			read: read != 0,
			created_at: parse_datetime("created_at", &created_at)?,
		})
	}
}

#[async_trait]
impl NotificationStore for NotificationRepository {
	async fn create_notification(&self, notification: &Notification) -> Result<(), DbError> {
		self.create_notification(notification).await
	}

	async fn list_notifications_for_user(
		&self,
		user_id: &UserId,
		unread_only: bool,
	) -> Result<Vec<Notification>, DbError> {
		self.list_notifications_for_user(user_id, unread_only).await
	}

	async fn mark_notification_read(&self, id: &NotificationId) -> Result<bool, DbError> {
		self.mark_notification_read(id).await
	}

	async fn count_unread(&self, user_id: &UserId) -> Result<i64, DbError> {
		self.count_unread(user_id).await
	}
}

#[async_trait]
impl NotificationSink for NotificationRepository {
	async fn deliver(&self, notification: Notification) -> Result<(), NotificationError> {
		self.create_notification(&notification)
			.await
			.map_err(|e| NotificationError(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tenant::TenantRepository;
	use crate::testing::create_test_pool_with_schema;
	use crate::user::UserRepository;
	use trellis_server_auth::notification::NotificationKind;
	use trellis_server_auth::tenant::Tenant;
	use trellis_server_auth::user::User;

	async fn make_fixture() -> (NotificationRepository, User) {
		let pool = create_test_pool_with_schema().await;
		let tenants = TenantRepository::new(pool.clone());
		let users = UserRepository::new(pool.clone());
		let tenant = Tenant::new("Acme");
		tenants.create_tenant(&tenant).await.unwrap();
		let user = User::new(tenant.id, "Alice", "alice@x.com");
		users.create_user(&user).await.unwrap();
		(NotificationRepository::new(pool), user)
	}

	fn make_notification(user: &User, kind: NotificationKind) -> Notification {
		Notification::new(
			user.tenant_id,
			user.id,
			kind,
			serde_json::json!({"project": "Apollo"}),
		)
	}

	#[tokio::test]
	async fn test_create_and_list() {
		let (repo, user) = make_fixture().await;
		let notification = make_notification(&user, NotificationKind::JoinRequestReceived);
		repo.create_notification(&notification).await.unwrap();

		let listed = repo
			.list_notifications_for_user(&user.id, false)
			.await
			.unwrap();
		assert_eq!(listed.len(), 1);
		assert_eq!(listed[0].kind, NotificationKind::JoinRequestReceived);
		assert_eq!(listed[0].payload["project"], "Apollo");
		assert!(!listed[0].read);
	}

	#[tokio::test]
	async fn test_mark_read_and_count() {
		let (repo, user) = make_fixture().await;
		let n1 = make_notification(&user, NotificationKind::JoinRequestAccepted);
		let n2 = make_notification(&user, NotificationKind::InvitationAccepted);
		repo.create_notification(&n1).await.unwrap();
		repo.create_notification(&n2).await.unwrap();

		assert_eq!(repo.count_unread(&user.id).await.unwrap(), 2);
		assert!(repo.mark_notification_read(&n1.id).await.unwrap());
		assert_eq!(repo.count_unread(&user.id).await.unwrap(), 1);

		let unread = repo
			.list_notifications_for_user(&user.id, true)
			.await
			.unwrap();
		assert_eq!(unread.len(), 1);
		assert_eq!(unread[0].id, n2.id);
	}

	#[tokio::test]
	async fn test_sink_delivers() {
		let (repo, user) = make_fixture().await;
		let notification = make_notification(&user, NotificationKind::MemberAdded);
		NotificationSink::deliver(&repo, notification).await.unwrap();
		assert_eq!(repo.count_unread(&user.id).await.unwrap(), 1);
	}
}
