// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Email templates and the mail-sender interface.
//!
//! The core emits invitation emails through the [`MailSender`] trait; the
//! SMTP transport itself is an external collaborator. Sending is
//! fire-and-forget: a failure is logged and never rolls back the operation
//! that requested it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::types::ProjectRole;

/// TLS mode for SMTP connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
	/// No TLS (plain text connection).
	None,
	/// STARTTLS upgrade after connecting.
	StartTls,
	/// Direct TLS connection.
	#[default]
	Tls,
}

impl TlsMode {
	/// Parse TLS mode from environment variable value.
	///
	/// - "true" or "tls" -> Tls
	/// - "starttls" -> StartTls
	/// - "false" or "none" -> None
	pub fn from_env_value(value: &str) -> Result<Self, AuthError> {
		match value.to_lowercase().as_str() {
			"true" | "tls" => Ok(TlsMode::Tls),
			"starttls" => Ok(TlsMode::StartTls),
			"false" | "none" => Ok(TlsMode::None),
			_ => Err(AuthError::Configuration(format!(
				"Invalid TRELLIS_SERVER_SMTP_TLS value: '{value}'. Expected: true, tls, starttls, false, none"
			))),
		}
	}
}

/// SMTP configuration for sending emails.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
	/// SMTP server hostname.
	pub host: String,
	/// SMTP server port.
	pub port: u16,
	/// Optional username for SMTP authentication.
	pub username: Option<String>,
	/// Optional password for SMTP authentication.
	pub password: Option<String>,
	/// From address for outgoing emails.
	pub from_address: String,
	/// TLS mode for the connection.
	pub tls_mode: TlsMode,
}

impl SmtpConfig {
	/// Load SMTP configuration from environment variables.
	///
	/// Returns `Ok(None)` if SMTP is not configured (TRELLIS_SERVER_SMTP_HOST
	/// not set). Returns `Err` if configuration is incomplete or invalid.
	///
	/// Environment variables:
	/// - `TRELLIS_SERVER_SMTP_HOST` - SMTP server hostname (required)
	/// - `TRELLIS_SERVER_SMTP_PORT` - SMTP server port (default: 587)
	/// - `TRELLIS_SERVER_SMTP_USERNAME` - Username for authentication (optional)
	/// - `TRELLIS_SERVER_SMTP_PASSWORD` - Password for authentication (optional)
	/// - `TRELLIS_SERVER_SMTP_FROM` - From address (required if host is set)
	/// - `TRELLIS_SERVER_SMTP_TLS` - TLS mode: true/tls, starttls, false/none (default: tls)
	pub fn from_env() -> Result<Option<Self>, AuthError> {
		let host = match std::env::var("TRELLIS_SERVER_SMTP_HOST") {
			Ok(h) if !h.is_empty() => h,
			Ok(_) => return Ok(None),
			Err(std::env::VarError::NotPresent) => return Ok(None),
			Err(e) => {
				return Err(AuthError::Configuration(format!(
					"Failed to read TRELLIS_SERVER_SMTP_HOST: {e}"
				)))
			}
		};

		let port = match std::env::var("TRELLIS_SERVER_SMTP_PORT") {
			Ok(p) => p.parse::<u16>().map_err(|e| {
				AuthError::Configuration(format!("Invalid TRELLIS_SERVER_SMTP_PORT: {e}"))
			})?,
			Err(std::env::VarError::NotPresent) => 587,
			Err(e) => {
				return Err(AuthError::Configuration(format!(
					"Failed to read TRELLIS_SERVER_SMTP_PORT: {e}"
				)))
			}
		};

		let from_address = std::env::var("TRELLIS_SERVER_SMTP_FROM").map_err(|e| {
			AuthError::Configuration(format!(
				"TRELLIS_SERVER_SMTP_FROM is required when TRELLIS_SERVER_SMTP_HOST is set: {e}"
			))
		})?;

		if from_address.is_empty() {
			return Err(AuthError::Configuration(
				"TRELLIS_SERVER_SMTP_FROM cannot be empty".to_string(),
			));
		}

		let username = std::env::var("TRELLIS_SERVER_SMTP_USERNAME")
			.ok()
			.filter(|s| !s.is_empty());

		let password = std::env::var("TRELLIS_SERVER_SMTP_PASSWORD")
			.ok()
			.filter(|s| !s.is_empty());

		let tls_mode = match std::env::var("TRELLIS_SERVER_SMTP_TLS") {
			Ok(v) => TlsMode::from_env_value(&v)?,
			Err(std::env::VarError::NotPresent) => TlsMode::Tls,
			Err(e) => {
				return Err(AuthError::Configuration(format!(
					"Failed to read TRELLIS_SERVER_SMTP_TLS: {e}"
				)))
			}
		};

		Ok(Some(Self {
			host,
			port,
			username,
			password,
			from_address,
			tls_mode,
		}))
	}

	/// Check if authentication credentials are configured.
	pub fn has_auth(&self) -> bool {
		self.username.is_some() && self.password.is_some()
	}
}

/// Email templates the core can render.
#[derive(Debug, Clone)]
pub enum EmailTemplate {
	/// Project invitation email.
	ProjectInvitation {
		/// Name of the project.
		project_name: String,
		/// Display name of the person who sent the invitation.
		inviter_name: String,
		/// The role being offered.
		role: ProjectRole,
		/// Invitation token to embed in the acceptance link.
		token: String,
	},
}

impl EmailTemplate {
	/// Render the subject line.
	pub fn subject(&self) -> String {
		match self {
			EmailTemplate::ProjectInvitation {
				project_name,
				inviter_name,
				..
			} => format!("{inviter_name} invited you to join {project_name} on Trellis"),
		}
	}

	/// Render the plain text body.
	pub fn body_text(&self) -> String {
		match self {
			EmailTemplate::ProjectInvitation {
				project_name,
				inviter_name,
				role,
				token,
			} => format!(
				"{inviter_name} has invited you to join the project \"{project_name}\" as {role}.\n\n\
				 Accept the invitation:\n\
				 https://trellis.example.com/invitations/{token}\n\n\
				 This invitation expires in 7 days.\n"
			),
		}
	}
}

/// Error sending an email. Always caught and logged at the call site.
#[derive(Debug, thiserror::Error)]
#[error("mail send failed: {0}")]
pub struct MailError(pub String);

/// Outgoing mail interface.
#[async_trait]
pub trait MailSender: Send + Sync {
	async fn send(&self, to: &str, template: &EmailTemplate) -> Result<(), MailError>;
}

/// A [`MailSender`] that logs instead of sending.
///
/// Used when SMTP is unconfigured (development) and as the default test
/// double; the recipient address is logged, the token is not.
#[derive(Debug, Clone, Default)]
pub struct LoggingMailer;

#[async_trait]
impl MailSender for LoggingMailer {
	async fn send(&self, to: &str, template: &EmailTemplate) -> Result<(), MailError> {
		tracing::info!(to = %to, subject = %template.subject(), "mail send skipped (no transport configured)");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	mod tls_mode {
		use super::*;

		#[test]
		fn parses_known_values() {
			assert_eq!(TlsMode::from_env_value("true").unwrap(), TlsMode::Tls);
			assert_eq!(TlsMode::from_env_value("TLS").unwrap(), TlsMode::Tls);
			assert_eq!(
				TlsMode::from_env_value("starttls").unwrap(),
				TlsMode::StartTls
			);
			assert_eq!(TlsMode::from_env_value("none").unwrap(), TlsMode::None);
			assert_eq!(TlsMode::from_env_value("false").unwrap(), TlsMode::None);
		}

		#[test]
		fn rejects_unknown_values() {
			assert!(TlsMode::from_env_value("maybe").is_err());
		}
	}

	mod templates {
		use super::*;

		fn invitation_template() -> EmailTemplate {
			EmailTemplate::ProjectInvitation {
				project_name: "Apollo".to_string(),
				inviter_name: "Alice".to_string(),
				role: ProjectRole::Viewer,
				token: "ti_0123456789abcdef0123456789abcdef".to_string(),
			}
		}

		#[test]
		fn subject_names_project_and_inviter() {
			let subject = invitation_template().subject();
			assert!(subject.contains("Apollo"));
			assert!(subject.contains("Alice"));
		}

		#[test]
		fn body_carries_token_and_role() {
			let body = invitation_template().body_text();
			assert!(body.contains("ti_0123456789abcdef0123456789abcdef"));
			assert!(body.contains("viewer"));
			assert!(body.contains("7 days"));
		}
	}

	mod logging_mailer {
		use super::*;

		#[tokio::test]
		async fn send_always_succeeds() {
			let mailer = LoggingMailer;
			let template = EmailTemplate::ProjectInvitation {
				project_name: "P".to_string(),
				inviter_name: "A".to_string(),
				role: ProjectRole::Member,
				token: "ti_x".to_string(),
			};
			assert!(mailer.send("b@x.com", &template).await.is_ok());
		}
	}
}
