//! lakeio Common - Shared types and utilities
//!
//! This crate provides the tablet metadata data model, the error type and
//! the configuration structures used across all lakeio components.

pub mod config;
pub mod error;
pub mod types;

pub use config::LakeConfig;
pub use error::{Error, Result};
pub use types::*;
