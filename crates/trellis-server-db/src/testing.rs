// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test helpers: in-memory pools with the full schema applied.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::schema::init_schema;

/// Create an in-memory pool. A single connection keeps the shared in-memory
/// database alive for the duration of the test.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.foreign_keys(true)
		.create_if_missing(true);

	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool")
}

/// Create an in-memory pool with the full schema applied.
pub async fn create_test_pool_with_schema() -> SqlitePool {
	let pool = create_test_pool().await;
	init_schema(&pool).await.expect("Failed to init schema");
	pool
}
