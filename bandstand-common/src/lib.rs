//! # Bandstand Common Library
//!
//! Shared code for the Bandstand crates:
//! - Domain models (songs, votes, setlists, members)
//! - Database initialization, migrations and row mapping
//! - Configuration loading and root folder resolution
//! - Quota period and timestamp helpers
//! - Error types

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod models;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use time::QuotaPeriod;
