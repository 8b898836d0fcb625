// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Signed bearer credentials and the authenticated [`Principal`].
//!
//! A credential is an opaque, time-limited token issued at login and carried
//! on every request:
//!
//! ```text
//! ts_<payload-hex>.<mac-hex>
//! ```
//!
//! The payload is the JSON-serialized [`CredentialClaims`]; the MAC is
//! HMAC-SHA256 over the payload bytes. Verification checks the MAC in
//! constant time, then expiry, and only then exposes the claims. The core
//! needs nothing more from the scheme than tamper-evidence and expiry;
//! everything else about the principal is re-resolved from the store on
//! every request.
//!
//! # Security Notes
//!
//! - Token values are never logged.
//! - The signing key is zeroized on drop.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::AuthError;
use crate::types::{TenantId, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Prefix identifying a Trellis session credential.
pub const SESSION_TOKEN_PREFIX: &str = "ts_";

/// Environment variable holding the hex-encoded signing key.
pub const SIGNING_KEY_ENV_VAR: &str = "TRELLIS_SERVER_AUTH_SIGNING_KEY";

/// Default credential lifetime.
pub const CREDENTIAL_TTL_HOURS: i64 = 24;

/// An authenticated actor, resolved from a credential and re-checked against
/// live store state.
///
/// Passed explicitly as an argument through every core call; the core never
/// threads an ambient "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
	/// The authenticated user.
	pub user_id: UserId,
	/// The tenant the user belongs to.
	pub tenant_id: TenantId,
	/// The user's email, as stored (used for invitation email matching).
	pub email: String,
}

/// The claims encoded inside a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
	pub user_id: UserId,
	pub tenant_id: TenantId,
	pub email: String,
	pub expires_at: DateTime<Utc>,
}

impl CredentialClaims {
	/// Create claims for the given identity expiring `ttl_hours` from now.
	pub fn new(
		user_id: UserId,
		tenant_id: TenantId,
		email: impl Into<String>,
		ttl_hours: i64,
	) -> Self {
		Self {
			user_id,
			tenant_id,
			email: email.into(),
			expires_at: Utc::now() + Duration::hours(ttl_hours),
		}
	}

	/// Returns true if the claims are past their expiry at `now`.
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		now > self.expires_at
	}
}

/// Key used to sign and verify session credentials.
///
/// The raw bytes are zeroized when the key is dropped and are never printed
/// by the `Debug` implementation.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CredentialKey(Vec<u8>);

impl std::fmt::Debug for CredentialKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "CredentialKey(..)")
	}
}

impl CredentialKey {
	/// Minimum accepted key length in bytes.
	pub const MIN_LEN: usize = 32;

	/// Create a key from raw bytes.
	///
	/// # Errors
	/// Returns `AuthError::Configuration` if the key is shorter than
	/// [`Self::MIN_LEN`].
	pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AuthError> {
		if bytes.len() < Self::MIN_LEN {
			return Err(AuthError::Configuration(format!(
				"signing key must be at least {} bytes, got {}",
				Self::MIN_LEN,
				bytes.len()
			)));
		}
		Ok(Self(bytes))
	}

	/// Generate a fresh random key.
	pub fn generate() -> Self {
		use rand::RngCore;
		let mut bytes = vec![0u8; Self::MIN_LEN];
		rand::thread_rng().fill_bytes(&mut bytes);
		Self(bytes)
	}

	/// Load the key from the environment.
	///
	/// Reads `TRELLIS_SERVER_AUTH_SIGNING_KEY` as a hex string.
	///
	/// # Errors
	/// Returns `AuthError::Configuration` if the variable is missing, not
	/// valid hex, or too short.
	pub fn from_env() -> Result<Self, AuthError> {
		let raw = std::env::var(SIGNING_KEY_ENV_VAR).map_err(|e| {
			AuthError::Configuration(format!("{SIGNING_KEY_ENV_VAR} is required: {e}"))
		})?;
		let bytes = hex::decode(raw.trim()).map_err(|e| {
			AuthError::Configuration(format!("{SIGNING_KEY_ENV_VAR} must be hex: {e}"))
		})?;
		Self::from_bytes(bytes)
	}

	fn mac(&self, payload: &[u8]) -> HmacSha256 {
		let mut mac =
			HmacSha256::new_from_slice(&self.0).expect("HMAC accepts keys of any length");
		mac.update(payload);
		mac
	}
}

/// Issue a signed credential for the given claims.
pub fn issue(claims: &CredentialClaims, key: &CredentialKey) -> Result<String, AuthError> {
	let payload = serde_json::to_vec(claims)
		.map_err(|e| AuthError::Configuration(format!("claims serialization failed: {e}")))?;
	let tag = key.mac(&payload).finalize().into_bytes();
	Ok(format!(
		"{SESSION_TOKEN_PREFIX}{}.{}",
		hex::encode(&payload),
		hex::encode(tag)
	))
}

/// Verify a credential and return its claims.
///
/// Validation order is fixed: structure, MAC (constant-time), then expiry.
/// Structural and MAC failures report `InvalidCredential`; a valid but stale
/// token reports `ExpiredCredential`.
pub fn verify(
	token: &str,
	key: &CredentialKey,
	now: DateTime<Utc>,
) -> Result<CredentialClaims, AuthError> {
	let body = token
		.strip_prefix(SESSION_TOKEN_PREFIX)
		.ok_or(AuthError::InvalidCredential)?;
	let (payload_hex, mac_hex) = body.split_once('.').ok_or(AuthError::InvalidCredential)?;

	let payload = hex::decode(payload_hex).map_err(|_| AuthError::InvalidCredential)?;
	let tag = hex::decode(mac_hex).map_err(|_| AuthError::InvalidCredential)?;

	key.mac(&payload)
		.verify_slice(&tag)
		.map_err(|_| AuthError::InvalidCredential)?;

	let claims: CredentialClaims =
		serde_json::from_slice(&payload).map_err(|_| AuthError::InvalidCredential)?;

	if claims.is_expired(now) {
		return Err(AuthError::ExpiredCredential);
	}

	Ok(claims)
}
