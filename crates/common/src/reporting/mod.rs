//! Reporting core
//!
//! - Cross-category aggregation and size estimation
//! - Data-usage analytics per table and per user
//! - Activity projection and single-account reports
//! - Custom report persistence with frozen snapshots

pub mod aggregate;
pub mod analytics;
pub mod projection;
pub mod reports;
pub mod size;

pub use aggregate::{aggregate_across_categories, Aggregation, CategoryAggregate};
pub use analytics::{
    data_usage_analytics, table_analytics, user_analytics, AnalyticsSnapshot, TableAnalytics,
    TableStats, UserAnalytics, UserStats,
};
pub use projection::{build_account_report, project, AccountReport, Activity, ProjectionSpec};
pub use reports::{
    build_filter_criteria, create_report, delete_report, get_report, list_reports,
    sanitize_filter_criteria, update_report, CreateReportInput, UpdateReportInput,
};
pub use size::estimate_size;
