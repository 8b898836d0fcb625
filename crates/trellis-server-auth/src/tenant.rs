// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenant domain model.
//!
//! A tenant is the isolation boundary grouping users, projects, and data.
//! Every other entity carries a tenant id that must equal the tenant id of
//! the authenticated principal acting on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{TenantId, TenantPlan, TenantStatus};

/// An isolated organization within Trellis.
///
/// Created at signup (one per signup unless joining an existing tenant).
/// Suspending or cancelling a tenant blocks all authenticated operations for
/// its users on the very next request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
	/// Unique identifier for this tenant.
	pub id: TenantId,

	/// Display name of the organization.
	pub name: String,

	/// Lifecycle status; only `Active` tenants may operate.
	pub status: TenantStatus,

	/// Subscription plan.
	pub plan: TenantPlan,

	/// When the tenant was created.
	pub created_at: DateTime<Utc>,

	/// When the tenant was last updated.
	pub updated_at: DateTime<Utc>,
}

impl Tenant {
	/// Creates a new active tenant on the free plan.
	pub fn new(name: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			id: TenantId::generate(),
			name: name.into(),
			status: TenantStatus::Active,
			plan: TenantPlan::Free,
			created_at: now,
			updated_at: now,
		}
	}

	/// Returns true if users of this tenant may perform authenticated operations.
	pub fn is_active(&self) -> bool {
		self.status.is_active()
	}
}
