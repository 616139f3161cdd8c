//! Core data model shared across the gramspect workspace.
//!
//! This crate holds the types that cross crate boundaries:
//! - `config` - engine configuration with serde defaults
//! - `error` - the error taxonomy (kind, category, enrichment)
//! - `reports` - serializable results for every engine operation
//! - `cancel` - cooperative cancellation token

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod cancel;
pub mod config;
pub mod error;
pub mod reports;

pub use cancel::CancelToken;
pub use config::{CacheConfig, EngineConfig, ResourceConfig};
pub use error::{ErrorCategory, ErrorDetail, ErrorKind, Severity, SourceLocation};
