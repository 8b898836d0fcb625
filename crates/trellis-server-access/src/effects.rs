// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Post-commit side-effect dispatch.
//!
//! Lifecycle operations accumulate [`SideEffect`] values while they run and
//! hand them to [`EffectQueue::dispatch`] only after their primary state
//! transition has committed. Dispatch failures are logged at `warn!` and
//! swallowed: mail, notifications, and activity share a failure domain that
//! is strictly separate from the transition they describe.

use std::sync::Arc;

use trellis_server_auth::activity::{ActivityEntry, ActivityRecorder};
use trellis_server_auth::email::{EmailTemplate, MailSender};
use trellis_server_auth::notification::{Notification, NotificationSink};

/// A side effect to dispatch after the primary transition commits.
#[derive(Debug)]
pub enum SideEffect {
	/// Send an email.
	Mail {
		to: String,
		template: EmailTemplate,
	},
	/// Deliver a notification.
	Notify { notification: Notification },
	/// Record an activity entry.
	Activity { entry: ActivityEntry },
}

/// Dispatches accumulated side effects to their sinks.
#[derive(Clone)]
pub struct EffectQueue {
	mailer: Arc<dyn MailSender>,
	notifications: Arc<dyn NotificationSink>,
	activity: Arc<dyn ActivityRecorder>,
}

impl EffectQueue {
	/// Create a queue over the given sinks.
	pub fn new(
		mailer: Arc<dyn MailSender>,
		notifications: Arc<dyn NotificationSink>,
		activity: Arc<dyn ActivityRecorder>,
	) -> Self {
		Self {
			mailer,
			notifications,
			activity,
		}
	}

	/// Dispatch all effects in order. Never fails; each sink error is logged
	/// and the remaining effects still run.
	pub async fn dispatch(&self, effects: Vec<SideEffect>) {
		for effect in effects {
			match effect {
				SideEffect::Mail { to, template } => {
					if let Err(e) = self.mailer.send(&to, &template).await {
						tracing::warn!(error = %e, to = %to, "mail side effect failed");
					}
				}
				SideEffect::Notify { notification } => {
					let user_id = notification.user_id;
					if let Err(e) = self.notifications.deliver(notification).await {
						tracing::warn!(error = %e, user_id = %user_id, "notification side effect failed");
					}
				}
				SideEffect::Activity { entry } => {
					let event_type = entry.event_type;
					if let Err(e) = self.activity.record(entry).await {
						tracing::warn!(error = %e, event_type = %event_type, "activity side effect failed");
					}
				}
			}
		}
	}
}
