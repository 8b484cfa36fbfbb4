//! CoE Records Common Library
//!
//! Shared code for the CoE records service including:
//! - Configuration management and error handling
//! - Caller identity and JWT validation
//! - Category registry and record/report storage
//! - Ownership predicate and visibility resolution
//! - Aggregation, analytics, account reports and custom reports
//! - Metrics and observability

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod records;
pub mod registry;
pub mod reporting;

// Re-export commonly used types
pub use auth::{Caller, JwtManager, Role};
pub use config::AppConfig;
pub use db::{MemoryStore, Repository, Store};
pub use errors::{AppError, Result};
pub use registry::Category;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
