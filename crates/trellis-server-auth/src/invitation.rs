// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Invitation types and token handling.
//!
//! An invitation is an email-targeted, token-bearing, time-boxed offer to
//! join a project at a proposed role. The token is a capability: it is
//! generated from 128 bits of randomness, shown once to the inviter/invitee,
//! and only its SHA-256 digest is stored. Lookups go through the digest, so
//! a database leak does not leak usable invitation links.
//!
//! Expiry is enforced lazily at read time; no background sweep is required
//! for correctness.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{InvitationId, InvitationStatus, ProjectId, ProjectRole, TenantId, UserId};
use crate::user::normalize_email;

/// Prefix identifying a Trellis invitation token.
pub const INVITATION_TOKEN_PREFIX: &str = "ti_";

/// Days an invitation stays acceptable after creation.
pub const INVITATION_EXPIRY_DAYS: i64 = 7;

/// An email-targeted offer to join a project.
///
/// Unique pending invitation per `(project_id, email)`; rows are never
/// deleted, only transitioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
	/// Unique identifier for this invitation.
	pub id: InvitationId,

	/// The tenant the target project belongs to.
	pub tenant_id: TenantId,

	/// The project the invitee is offered to join.
	pub project_id: ProjectId,

	/// Target email, stored normalized (trimmed, lowercased).
	pub email: String,

	/// The role offered; never `Owner`.
	pub role: ProjectRole,

	/// Lifecycle status.
	pub status: InvitationStatus,

	/// The user who issued the invitation.
	pub invited_by: UserId,

	/// SHA-256 digest of the invitation token. The plaintext token is never
	/// stored or logged.
	pub token_hash: String,

	/// When the invitation was created.
	pub created_at: DateTime<Utc>,

	/// When the invitation stops being acceptable.
	pub expires_at: DateTime<Utc>,
}

impl Invitation {
	/// Creates a new pending invitation and returns it together with the
	/// plaintext token to embed in the invitation email.
	pub fn new(
		tenant_id: TenantId,
		project_id: ProjectId,
		email: &str,
		role: ProjectRole,
		invited_by: UserId,
	) -> (Self, String) {
		let token = generate_invitation_token();
		let now = Utc::now();
		let invitation = Self {
			id: InvitationId::generate(),
			tenant_id,
			project_id,
			email: normalize_email(email),
			role,
			status: InvitationStatus::Pending,
			invited_by,
			token_hash: hash_invitation_token(&token),
			created_at: now,
			expires_at: now + Duration::days(INVITATION_EXPIRY_DAYS),
		};
		(invitation, token)
	}

	/// Returns true if the invitation is past its expiry at `now`.
	///
	/// A pending-but-expired invitation is observed as expired by the next
	/// lookup, which also persists the transition.
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		now > self.expires_at
	}

	/// Returns true if the given principal email matches the invitation
	/// target, case-insensitively.
	pub fn is_addressed_to(&self, email: &str) -> bool {
		self.email == normalize_email(email)
	}
}

/// Generate a fresh invitation token: `ti_` followed by 32 hex characters
/// (128 bits of randomness). Treated as a capability, not an identifier.
pub fn generate_invitation_token() -> String {
	let mut bytes = [0u8; 16];
	rand::thread_rng().fill_bytes(&mut bytes);
	format!("{INVITATION_TOKEN_PREFIX}{}", hex::encode(bytes))
}

/// Compute the storage digest of an invitation token.
pub fn hash_invitation_token(token: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::collections::HashSet;

	fn make_invitation(email: &str) -> (Invitation, String) {
		Invitation::new(
			TenantId::generate(),
			ProjectId::generate(),
			email,
			ProjectRole::Member,
			UserId::generate(),
		)
	}

	mod invitation {
		use super::*;

		#[test]
		fn new_is_pending_and_expires_in_seven_days() {
			let (invitation, _) = make_invitation("bob@example.com");
			assert_eq!(invitation.status, InvitationStatus::Pending);
			assert_eq!(
				invitation.expires_at,
				invitation.created_at + Duration::days(INVITATION_EXPIRY_DAYS)
			);
		}

		#[test]
		fn new_normalizes_target_email() {
			let (invitation, _) = make_invitation(" Bob@Example.COM ");
			assert_eq!(invitation.email, "bob@example.com");
		}

		#[test]
		fn new_stores_hash_not_token() {
			let (invitation, token) = make_invitation("bob@example.com");
			assert_ne!(invitation.token_hash, token);
			assert_eq!(invitation.token_hash, hash_invitation_token(&token));
		}

		#[test]
		fn is_addressed_to_ignores_case() {
			let (invitation, _) = make_invitation("bob@example.com");
			assert!(invitation.is_addressed_to("BOB@EXAMPLE.COM"));
			assert!(invitation.is_addressed_to("  bob@example.com "));
			assert!(!invitation.is_addressed_to("eve@example.com"));
		}

		#[test]
		fn expiry_boundary_is_exclusive() {
			let (invitation, _) = make_invitation("bob@example.com");
			assert!(!invitation.is_expired(invitation.expires_at));
			assert!(invitation.is_expired(invitation.expires_at + Duration::seconds(1)));
		}
	}

	mod token {
		use super::*;

		#[test]
		fn token_has_prefix_and_length() {
			let token = generate_invitation_token();
			assert!(token.starts_with(INVITATION_TOKEN_PREFIX));
			assert_eq!(token.len(), INVITATION_TOKEN_PREFIX.len() + 32);
		}

		#[test]
		fn tokens_are_unique() {
			let tokens: HashSet<String> =
				(0..1000).map(|_| generate_invitation_token()).collect();
			assert_eq!(tokens.len(), 1000);
		}

		#[test]
		fn hash_is_stable_hex_sha256() {
			let digest = hash_invitation_token("ti_00000000000000000000000000000000");
			assert_eq!(digest.len(), 64);
			assert_eq!(digest, hash_invitation_token("ti_00000000000000000000000000000000"));
		}

		proptest! {
				#[test]
				fn distinct_tokens_hash_distinctly(a in "ti_[0-9a-f]{32}", b in "ti_[0-9a-f]{32}") {
						prop_assume!(a != b);
						prop_assert_ne!(hash_invitation_token(&a), hash_invitation_token(&b));
				}
		}
	}
}
