//! Storage contracts consumed by the reporting core
//!
//! [`RecordStore`] is the per-category record facade plus user lookups;
//! [`ReportStore`] persists custom reports. The Postgres [`Repository`] and
//! the in-process [`MemoryStore`] both implement them.
//!
//! [`Repository`]: crate::db::Repository
//! [`MemoryStore`]: crate::db::MemoryStore

use crate::db::models::{CustomReport, User};
use crate::db::record::Record;
use crate::errors::Result;
use crate::registry::Category;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// A condition on one business field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    /// Text form of the field equals the text form of `value`
    Equals { field: String, value: Value },
    /// Inclusive text range on an ISO-8601 date field
    Range {
        field: String,
        from: Option<String>,
        to: Option<String>,
    },
}

impl FieldCondition {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            FieldCondition::Equals { field, value } => {
                match (record.field(field).and_then(scalar_text), scalar_text(value)) {
                    (Some(actual), Some(expected)) => actual == expected,
                    _ => false,
                }
            }
            FieldCondition::Range { field, from, to } => {
                let Some(actual) = record.field(field).and_then(scalar_text) else {
                    return false;
                };
                from.as_deref().map_or(true, |f| actual.as_str() >= f)
                    && to.as_deref().map_or(true, |t| actual.as_str() <= t)
            }
        }
    }
}

/// Query over one category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Restrict to records whose normalized owner id equals this user
    pub owner: Option<Uuid>,
    pub conditions: Vec<FieldCondition>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(owner: Uuid) -> Self {
        Self {
            owner: Some(owner),
            conditions: Vec::new(),
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<FieldCondition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    /// In-process evaluation, matching both stored owner shapes
    pub fn matches(&self, record: &Record) -> bool {
        let owner_ok = match self.owner {
            None => true,
            Some(owner) => record.owner.as_ref().is_some_and(|o| o.is_user(owner)),
        };
        owner_ok && self.conditions.iter().all(|c| c.matches(record))
    }
}

/// Text form of a JSON scalar, the way `->>` renders it
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Record repository facade plus account lookups
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn list_users(&self) -> Result<Vec<User>>;

    async fn count_users(&self) -> Result<u64>;

    /// Records of one category matching the filter, newest first
    async fn find_records(&self, category: Category, filter: &RecordFilter) -> Result<Vec<Record>>;

    async fn count_records(&self, category: Category, filter: &RecordFilter) -> Result<u64>;

    async fn find_record(&self, category: Category, id: Uuid) -> Result<Option<Record>>;

    async fn insert_record(&self, record: Record) -> Result<Record>;

    /// Replace a record's business data, returning the stored record
    async fn update_record(&self, record: Record) -> Result<Record>;

    async fn delete_record(&self, category: Category, id: Uuid) -> Result<bool>;
}

/// Custom report persistence
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, report: CustomReport) -> Result<CustomReport>;

    /// Reports newest first; `owner` restricts to one creator
    async fn list_reports(&self, owner: Option<Uuid>) -> Result<Vec<CustomReport>>;

    async fn find_report(&self, id: Uuid) -> Result<Option<CustomReport>>;

    async fn update_report(&self, report: CustomReport) -> Result<CustomReport>;

    async fn delete_report(&self, id: Uuid) -> Result<bool>;
}

/// Everything the gateway needs from storage
pub trait Store: RecordStore + ReportStore {}

impl<T: RecordStore + ReportStore> Store for T {}
