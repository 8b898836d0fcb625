// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Activity logging for membership and lifecycle events.
//!
//! The activity log is an append-only record of what happened in a project:
//! creations, membership changes, invitation and join-request transitions.
//! The core writes entries through the post-commit effect queue; a write
//! failure never fails the operation that produced the entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActivityId, ProjectId, TenantId, UserId};

/// Types of events recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEventType {
	// Project lifecycle events
	/// Project was created.
	ProjectCreated,
	/// Project was deleted.
	ProjectDeleted,

	// Membership events
	/// Member was added to a project.
	MemberAdded,
	/// Member was removed from a project.
	MemberRemoved,
	/// Member's role was changed.
	RoleChanged,

	// Invitation events
	/// Invitation was created.
	InvitationCreated,
	/// Invitation was accepted.
	InvitationAccepted,
	/// Invitation was declined.
	InvitationDeclined,
	/// Invitation expired or was cancelled.
	InvitationExpired,

	// Join request events
	/// Join request was created.
	JoinRequestCreated,
	/// Join request was accepted.
	JoinRequestAccepted,
	/// Join request was declined.
	JoinRequestDeclined,
}

impl std::fmt::Display for ActivityEventType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			ActivityEventType::ProjectCreated => "project_created",
			ActivityEventType::ProjectDeleted => "project_deleted",
			ActivityEventType::MemberAdded => "member_added",
			ActivityEventType::MemberRemoved => "member_removed",
			ActivityEventType::RoleChanged => "role_changed",
			ActivityEventType::InvitationCreated => "invitation_created",
			ActivityEventType::InvitationAccepted => "invitation_accepted",
			ActivityEventType::InvitationDeclined => "invitation_declined",
			ActivityEventType::InvitationExpired => "invitation_expired",
			ActivityEventType::JoinRequestCreated => "join_request_created",
			ActivityEventType::JoinRequestAccepted => "join_request_accepted",
			ActivityEventType::JoinRequestDeclined => "join_request_declined",
		};
		write!(f, "{s}")
	}
}

/// An entry in the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
	/// Unique identifier for this entry.
	pub id: ActivityId,
	/// The tenant in which the event occurred.
	pub tenant_id: TenantId,
	/// The project affected, if any.
	pub project_id: Option<ProjectId>,
	/// The user who performed the action (if known).
	pub actor_user_id: Option<UserId>,
	/// The type of event.
	pub event_type: ActivityEventType,
	/// Additional event-specific details.
	pub details: serde_json::Value,
	/// When the event occurred.
	pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
	/// Create a new activity builder for the given event type.
	pub fn builder(tenant_id: TenantId, event_type: ActivityEventType) -> ActivityBuilder {
		ActivityBuilder::new(tenant_id, event_type)
	}
}

/// Builder for constructing activity entries with a fluent API.
#[derive(Debug, Clone)]
pub struct ActivityBuilder {
	tenant_id: TenantId,
	event_type: ActivityEventType,
	project_id: Option<ProjectId>,
	actor_user_id: Option<UserId>,
	details: serde_json::Value,
}

impl ActivityBuilder {
	fn new(tenant_id: TenantId, event_type: ActivityEventType) -> Self {
		Self {
			tenant_id,
			event_type,
			project_id: None,
			actor_user_id: None,
			details: serde_json::Value::Null,
		}
	}

	/// Set the project the event relates to.
	pub fn project(mut self, project_id: ProjectId) -> Self {
		self.project_id = Some(project_id);
		self
	}

	/// Set the acting user.
	pub fn actor(mut self, user_id: UserId) -> Self {
		self.actor_user_id = Some(user_id);
		self
	}

	/// Attach event-specific details.
	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.details = details;
		self
	}

	/// Build the entry, stamping id and timestamp.
	pub fn build(self) -> ActivityEntry {
		ActivityEntry {
			id: ActivityId::generate(),
			tenant_id: self.tenant_id,
			project_id: self.project_id,
			actor_user_id: self.actor_user_id,
			event_type: self.event_type,
			details: self.details,
			created_at: Utc::now(),
		}
	}
}

/// Error recording an activity entry. Caught and logged at the call site.
#[derive(Debug, thiserror::Error)]
#[error("activity recording failed: {0}")]
pub struct ActivityError(pub String);

/// Append-only recorder for activity entries.
#[async_trait]
pub trait ActivityRecorder: Send + Sync {
	async fn record(&self, entry: ActivityEntry) -> Result<(), ActivityError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builder_sets_all_fields() {
		let tenant_id = TenantId::generate();
		let project_id = ProjectId::generate();
		let actor = UserId::generate();

		let entry = ActivityEntry::builder(tenant_id, ActivityEventType::MemberAdded)
			.project(project_id)
			.actor(actor)
			.details(serde_json::json!({"role": "member"}))
			.build();

		assert_eq!(entry.tenant_id, tenant_id);
		assert_eq!(entry.project_id, Some(project_id));
		assert_eq!(entry.actor_user_id, Some(actor));
		assert_eq!(entry.event_type, ActivityEventType::MemberAdded);
		assert_eq!(entry.details["role"], "member");
	}

	#[test]
	fn builder_defaults_are_empty() {
		let entry = ActivityEntry::builder(
			TenantId::generate(),
			ActivityEventType::ProjectCreated,
		)
		.build();

		assert!(entry.project_id.is_none());
		assert!(entry.actor_user_id.is_none());
		assert!(entry.details.is_null());
	}

	#[test]
	fn event_type_display() {
		assert_eq!(
			ActivityEventType::JoinRequestAccepted.to_string(),
			"join_request_accepted"
		);
		assert_eq!(
			ActivityEventType::InvitationExpired.to_string(),
			"invitation_expired"
		);
	}
}
