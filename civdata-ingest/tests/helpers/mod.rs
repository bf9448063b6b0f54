//! Test Helper Utilities
//!
//! Shared utilities for civdata-ingest integration tests

#![allow(dead_code, unused_imports)]

pub mod adapters;
pub mod dataset;
pub mod db_utils;
pub mod mock_server;

use chrono::{DateTime, TimeZone, Utc};

// Re-export commonly used items
pub use adapters::{FailingAdapter, StaticAdapter};
pub use dataset::DatasetBuilder;
pub use db_utils::{count_rows, create_test_db, get_table_names};
pub use mock_server::spawn_server;

/// Midnight UTC on the given date
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}
