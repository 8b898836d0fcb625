// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the Trellis authorization core.
//!
//! One repository per aggregate, each exposing a `*Store` trait the service
//! layer holds as `Arc<dyn ...>`:
//!
//! - [`tenant::TenantRepository`] / [`tenant::TenantStore`]
//! - [`user::UserRepository`] / [`user::UserStore`]
//! - [`project::ProjectRepository`] / [`project::ProjectStore`]
//! - [`invitation::InvitationRepository`] / [`invitation::InvitationStore`]
//! - [`join_request::JoinRequestRepository`] / [`join_request::JoinRequestStore`]
//! - [`notification::NotificationRepository`] (also the core's `NotificationSink`)
//! - [`activity::ActivityRepository`] (also the core's `ActivityRecorder`)
//!
//! [`schema::init_schema`] creates the tables; the membership uniqueness
//! constraint and the partial pending-uniqueness indexes live there.

pub mod activity;
pub mod error;
pub mod invitation;
pub mod join_request;
pub mod notification;
pub mod pool;
pub mod project;
mod row;
pub mod schema;
pub mod tenant;
pub mod testing;
pub mod user;

pub use error::{DbError, Result};
pub use pool::create_pool;
pub use schema::init_schema;
