//! # civdata common library
//!
//! Shared code for the civic data reconciliation workspace:
//! - Error type shared by library crates
//! - TOML/ENV configuration loading and path resolution
//! - Lenient date/timestamp parsing for upstream records

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
