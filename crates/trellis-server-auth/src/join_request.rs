// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Join-request types.
//!
//! A join request is initiated by a user who discovered a project through its
//! join code and asks to become a member. Unlike invitations, join requests
//! are strictly same-tenant: the requesting user's tenant must equal the
//! project's tenant. Acceptance always grants the `Member` role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{JoinRequestId, JoinRequestStatus, ProjectId, TenantId, UserId};

/// A request to join a project discovered via its join code.
///
/// Unique pending request per `(project_id, user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
	/// Unique identifier for this request.
	pub id: JoinRequestId,

	/// The tenant the target project belongs to (and, by construction, the
	/// requester's tenant).
	pub tenant_id: TenantId,

	/// The project being requested.
	pub project_id: ProjectId,

	/// The requesting user.
	pub user_id: UserId,

	/// Optional message from the requester to the project owner.
	pub message: Option<String>,

	/// Lifecycle status.
	pub status: JoinRequestStatus,

	/// When the request was created.
	pub created_at: DateTime<Utc>,

	/// When the request was accepted or declined.
	pub resolved_at: Option<DateTime<Utc>>,

	/// The admin or owner who resolved the request.
	pub resolved_by: Option<UserId>,
}

impl JoinRequest {
	/// Creates a new pending join request.
	pub fn new(
		tenant_id: TenantId,
		project_id: ProjectId,
		user_id: UserId,
		message: Option<String>,
	) -> Self {
		Self {
			id: JoinRequestId::generate(),
			tenant_id,
			project_id,
			user_id,
			message,
			status: JoinRequestStatus::Pending,
			created_at: Utc::now(),
			resolved_at: None,
			resolved_by: None,
		}
	}

	/// Returns true if the request is still awaiting resolution.
	pub fn is_pending(&self) -> bool {
		self.status == JoinRequestStatus::Pending
	}
}

/// Public summary of a project returned by join-code discovery.
///
/// Carries only what a requester needs to decide whether to ask to join:
/// notably not the tenant id and not the member list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectDiscovery {
	/// The discovered project's id (needed to create a request).
	pub project_id: ProjectId,

	/// Display name of the project.
	pub name: String,

	/// Optional description.
	pub description: Option<String>,

	/// Whether the discovering user already holds membership.
	pub is_member: bool,

	/// Whether the discovering user already has a pending join request.
	pub has_pending_request: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_is_pending_and_unresolved() {
		let request = JoinRequest::new(
			TenantId::generate(),
			ProjectId::generate(),
			UserId::generate(),
			Some("let me in".to_string()),
		);
		assert!(request.is_pending());
		assert!(request.resolved_at.is_none());
		assert!(request.resolved_by.is_none());
	}

	#[test]
	fn new_generates_unique_ids() {
		let tenant = TenantId::generate();
		let project = ProjectId::generate();
		let user = UserId::generate();
		let r1 = JoinRequest::new(tenant, project, user, None);
		let r2 = JoinRequest::new(tenant, project, user, None);
		assert_ne!(r1.id, r2.id);
	}

	#[test]
	fn resolved_request_is_not_pending() {
		let mut request = JoinRequest::new(
			TenantId::generate(),
			ProjectId::generate(),
			UserId::generate(),
			None,
		);
		request.status = JoinRequestStatus::Declined;
		assert!(!request.is_pending());
	}

	#[test]
	fn discovery_serializes_without_tenant_id() {
		let discovery = ProjectDiscovery {
			project_id: ProjectId::generate(),
			name: "Apollo".to_string(),
			description: None,
			is_member: false,
			has_pending_request: true,
		};
		let json = serde_json::to_string(&discovery).unwrap();
		assert!(!json.contains("tenant"));
		assert!(json.contains("\"has_pending_request\":true"));
	}
}
