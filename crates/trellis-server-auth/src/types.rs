// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for authentication and authorization.
//!
//! This module defines the foundational types used throughout the auth system:
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs for different entity types
//!   ([`UserId`], [`TenantId`], [`ProjectId`], etc.) preventing accidental mixing
//! - **[`ProjectRole`]**: the closed project-scoped role enumeration that every
//!   permission predicate matches exhaustively
//! - **Status enums**: lifecycle states for tenants, projects, invitations, and
//!   join requests
//!
//! All ID types implement transparent serde serialization (as UUID strings) and
//! provide conversion to/from [`uuid::Uuid`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(TenantId, "Unique identifier for a tenant.");
define_id_type!(ProjectId, "Unique identifier for a project.");
define_id_type!(MemberId, "Unique identifier for a project membership record.");
define_id_type!(InvitationId, "Unique identifier for an invitation.");
define_id_type!(JoinRequestId, "Unique identifier for a join request.");
define_id_type!(NotificationId, "Unique identifier for a notification.");
define_id_type!(ActivityId, "Unique identifier for an activity log entry.");

// =============================================================================
// Project Roles
// =============================================================================

/// Roles within a project.
///
/// This is a closed enumeration: permission predicates match it exhaustively
/// so adding a role forces every predicate site to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
	/// Full project control, can delete the project.
	Owner,
	/// Manage members, invitations, and join requests; cannot delete.
	Admin,
	/// Standard read/write access.
	Member,
	/// Read-only access.
	Viewer,
}

impl ProjectRole {
	/// Returns all available project roles.
	pub fn all() -> &'static [ProjectRole] {
		&[
			ProjectRole::Owner,
			ProjectRole::Admin,
			ProjectRole::Member,
			ProjectRole::Viewer,
		]
	}

	/// Returns true if this role has at least the permissions of the given role.
	pub fn has_permission_of(&self, other: &ProjectRole) -> bool {
		matches!(
			(self, other),
			(ProjectRole::Owner, _)
				| (
					ProjectRole::Admin,
					ProjectRole::Admin | ProjectRole::Member | ProjectRole::Viewer
				)
				| (
					ProjectRole::Member,
					ProjectRole::Member | ProjectRole::Viewer
				)
				| (ProjectRole::Viewer, ProjectRole::Viewer)
		)
	}

	/// Returns true if this role may be offered through an invitation.
	///
	/// Ownership is only ever granted by project creation; invitations offer
	/// Admin, Member, or Viewer.
	pub fn is_invitable(&self) -> bool {
		!matches!(self, ProjectRole::Owner)
	}
}

impl fmt::Display for ProjectRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProjectRole::Owner => write!(f, "owner"),
			ProjectRole::Admin => write!(f, "admin"),
			ProjectRole::Member => write!(f, "member"),
			ProjectRole::Viewer => write!(f, "viewer"),
		}
	}
}

impl FromStr for ProjectRole {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"owner" => Ok(ProjectRole::Owner),
			"admin" => Ok(ProjectRole::Admin),
			"member" => Ok(ProjectRole::Member),
			"viewer" => Ok(ProjectRole::Viewer),
			other => Err(format!("unknown project role: {other}")),
		}
	}
}

// =============================================================================
// Tenant Status & Plan
// =============================================================================

/// Lifecycle status of a tenant.
///
/// Suspended and cancelled tenants block all authenticated operations for
/// their users; the check runs on every request, not just at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
	/// Normal operation.
	Active,
	/// Temporarily blocked (e.g., billing hold).
	Suspended,
	/// Permanently closed.
	Cancelled,
}

impl TenantStatus {
	/// Returns true if users of this tenant may perform authenticated operations.
	pub fn is_active(&self) -> bool {
		matches!(self, TenantStatus::Active)
	}
}

impl fmt::Display for TenantStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TenantStatus::Active => write!(f, "active"),
			TenantStatus::Suspended => write!(f, "suspended"),
			TenantStatus::Cancelled => write!(f, "cancelled"),
		}
	}
}

impl FromStr for TenantStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"active" => Ok(TenantStatus::Active),
			"suspended" => Ok(TenantStatus::Suspended),
			"cancelled" => Ok(TenantStatus::Cancelled),
			other => Err(format!("unknown tenant status: {other}")),
		}
	}
}

/// Subscription plan of a tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantPlan {
	/// Default plan at signup.
	#[default]
	Free,
	Pro,
	Enterprise,
}

impl fmt::Display for TenantPlan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TenantPlan::Free => write!(f, "free"),
			TenantPlan::Pro => write!(f, "pro"),
			TenantPlan::Enterprise => write!(f, "enterprise"),
		}
	}
}

impl FromStr for TenantPlan {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"free" => Ok(TenantPlan::Free),
			"pro" => Ok(TenantPlan::Pro),
			"enterprise" => Ok(TenantPlan::Enterprise),
			other => Err(format!("unknown tenant plan: {other}")),
		}
	}
}

// =============================================================================
// Project Status
// =============================================================================

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
	#[default]
	Active,
	OnHold,
	Completed,
	Archived,
}

impl fmt::Display for ProjectStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProjectStatus::Active => write!(f, "active"),
			ProjectStatus::OnHold => write!(f, "on_hold"),
			ProjectStatus::Completed => write!(f, "completed"),
			ProjectStatus::Archived => write!(f, "archived"),
		}
	}
}

impl FromStr for ProjectStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"active" => Ok(ProjectStatus::Active),
			"on_hold" => Ok(ProjectStatus::OnHold),
			"completed" => Ok(ProjectStatus::Completed),
			"archived" => Ok(ProjectStatus::Archived),
			other => Err(format!("unknown project status: {other}")),
		}
	}
}

// =============================================================================
// Invitation Status
// =============================================================================

/// Lifecycle status of an invitation.
///
/// `Pending` is the only non-terminal state; accepted, declined, and expired
/// invitations never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
	Pending,
	Accepted,
	Declined,
	Expired,
}

impl InvitationStatus {
	/// Returns true if no further transition is allowed out of this state.
	pub fn is_terminal(&self) -> bool {
		!matches!(self, InvitationStatus::Pending)
	}
}

impl fmt::Display for InvitationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			InvitationStatus::Pending => write!(f, "pending"),
			InvitationStatus::Accepted => write!(f, "accepted"),
			InvitationStatus::Declined => write!(f, "declined"),
			InvitationStatus::Expired => write!(f, "expired"),
		}
	}
}

impl FromStr for InvitationStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(InvitationStatus::Pending),
			"accepted" => Ok(InvitationStatus::Accepted),
			"declined" => Ok(InvitationStatus::Declined),
			"expired" => Ok(InvitationStatus::Expired),
			other => Err(format!("unknown invitation status: {other}")),
		}
	}
}

// =============================================================================
// Join Request Status
// =============================================================================

/// Lifecycle status of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestStatus {
	Pending,
	Accepted,
	Declined,
}

impl JoinRequestStatus {
	/// Returns true if no further transition is allowed out of this state.
	pub fn is_terminal(&self) -> bool {
		!matches!(self, JoinRequestStatus::Pending)
	}
}

impl fmt::Display for JoinRequestStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			JoinRequestStatus::Pending => write!(f, "pending"),
			JoinRequestStatus::Accepted => write!(f, "accepted"),
			JoinRequestStatus::Declined => write!(f, "declined"),
		}
	}
}

impl FromStr for JoinRequestStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(JoinRequestStatus::Pending),
			"accepted" => Ok(JoinRequestStatus::Accepted),
			"declined" => Ok(JoinRequestStatus::Declined),
			other => Err(format!("unknown join request status: {other}")),
		}
	}
}
