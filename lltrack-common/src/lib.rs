//! # LoadLock Tracker Common Library
//!
//! Shared code for the lltrack server and command-line scanner:
//! - Database schema and row models
//! - Status catalogue (workflow labels and their display metadata)
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod status;
pub mod time;

pub use error::{Error, Result};
pub use status::{StatusInfo, UnitStatus};
