// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notification types and the delivery sink interface.
//!
//! Notifications are an append-only record of events relevant to one user,
//! carrying a read/unread flag. The core only ever writes them through the
//! post-commit effect queue; delivery failure is logged and never fails the
//! primary operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{NotificationId, TenantId, UserId};

/// Kinds of events a user can be notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
	/// A join request was created for a project the recipient owns.
	JoinRequestReceived,
	/// The recipient's join request was accepted.
	JoinRequestAccepted,
	/// The recipient's join request was declined.
	JoinRequestDeclined,
	/// An invitation the recipient issued was accepted.
	InvitationAccepted,
	/// The recipient was added to a project.
	MemberAdded,
	/// The recipient was removed from a project.
	MemberRemoved,
}

impl std::fmt::Display for NotificationKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			NotificationKind::JoinRequestReceived => "join_request_received",
			NotificationKind::JoinRequestAccepted => "join_request_accepted",
			NotificationKind::JoinRequestDeclined => "join_request_declined",
			NotificationKind::InvitationAccepted => "invitation_accepted",
			NotificationKind::MemberAdded => "member_added",
			NotificationKind::MemberRemoved => "member_removed",
		};
		write!(f, "{s}")
	}
}

impl std::str::FromStr for NotificationKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"join_request_received" => Ok(NotificationKind::JoinRequestReceived),
			"join_request_accepted" => Ok(NotificationKind::JoinRequestAccepted),
			"join_request_declined" => Ok(NotificationKind::JoinRequestDeclined),
			"invitation_accepted" => Ok(NotificationKind::InvitationAccepted),
			"member_added" => Ok(NotificationKind::MemberAdded),
			"member_removed" => Ok(NotificationKind::MemberRemoved),
			other => Err(format!("unknown notification kind: {other}")),
		}
	}
}

/// A notification addressed to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
	/// Unique identifier for this notification.
	pub id: NotificationId,

	/// The recipient's tenant.
	pub tenant_id: TenantId,

	/// The recipient.
	pub user_id: UserId,

	/// What happened.
	pub kind: NotificationKind,

	/// Event-specific details (project name, requester profile, ...).
	pub payload: serde_json::Value,

	/// Whether the recipient has seen this notification.
	pub read: bool,

	/// When the notification was created.
	pub created_at: DateTime<Utc>,
}

impl Notification {
	/// Creates a new unread notification.
	pub fn new(
		tenant_id: TenantId,
		user_id: UserId,
		kind: NotificationKind,
		payload: serde_json::Value,
	) -> Self {
		Self {
			id: NotificationId::generate(),
			tenant_id,
			user_id,
			kind,
			payload,
			read: false,
			created_at: Utc::now(),
		}
	}
}

/// Error delivering a notification. Always caught and logged at the call
/// site, never propagated into the primary operation's result.
#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// Write sink for notifications.
///
/// The core fires notifications post-commit and does not await delivery
/// guarantees beyond the sink's own persistence.
#[async_trait]
pub trait NotificationSink: Send + Sync {
	async fn deliver(&self, notification: Notification) -> Result<(), NotificationError>;
}
