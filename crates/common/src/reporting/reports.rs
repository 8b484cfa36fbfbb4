//! Custom report persistence
//!
//! A custom report is a named, sanitized filter over one category plus the
//! records it matched when it was materialized. The snapshot never follows
//! later changes to those records.

use crate::access::resolve_scope;
use crate::auth::Caller;
use crate::db::models::CustomReport;
use crate::db::{scalar_text, FieldCondition, Record, Store};
use crate::errors::{AppError, Result};
use crate::registry::Category;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Placeholder the UI sends for "no value"
const NOT_APPLICABLE: &str = "N/A";

const RANGE_FROM: &str = "gte";
const RANGE_TO: &str = "lte";

/// Drop criteria whose value is empty, null or `"N/A"`
pub fn sanitize_filter_criteria(raw: &Map<String, Value>) -> Map<String, Value> {
    raw.iter()
        .filter(|(_, value)| match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty() && s != NOT_APPLICABLE,
            _ => true,
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Sanitize raw criteria into the persisted filter for `source`.
///
/// Talks/trainings attended also accept `dateFrom`/`dateTo`, folded into one
/// inclusive range on `date`.
pub fn build_filter_criteria(source: Category, raw: &Map<String, Value>) -> Result<Map<String, Value>> {
    let mut criteria = sanitize_filter_criteria(raw);

    if source == Category::TalkTrainingConference {
        let from = criteria.remove("dateFrom");
        let to = criteria.remove("dateTo");
        if from.is_some() || to.is_some() {
            let mut range = Map::new();
            for (bound, value) in [(RANGE_FROM, from), (RANGE_TO, to)] {
                let Some(value) = value else { continue };
                if !value.is_string() {
                    return Err(AppError::InvalidFilter {
                        field: "date".to_string(),
                        message: format!("{} must be a date string", bound),
                    });
                }
                range.insert(bound.to_string(), value);
            }
            criteria.insert("date".to_string(), Value::Object(range));
        }
    }

    Ok(criteria)
}

/// Translate persisted criteria into repository conditions
pub fn criteria_to_filter(criteria: &Map<String, Value>) -> Result<Vec<FieldCondition>> {
    criteria
        .iter()
        .map(|(field, value)| match value {
            Value::Object(range) => range_condition(field, range),
            other if scalar_text(other).is_some() => Ok(FieldCondition::Equals {
                field: field.clone(),
                value: other.clone(),
            }),
            _ => Err(AppError::InvalidFilter {
                field: field.clone(),
                message: "expected a scalar value or a gte/lte range".to_string(),
            }),
        })
        .collect()
}

fn range_condition(field: &str, range: &Map<String, Value>) -> Result<FieldCondition> {
    let invalid = |message: &str| AppError::InvalidFilter {
        field: field.to_string(),
        message: message.to_string(),
    };

    if range.is_empty() || range.keys().any(|k| k != RANGE_FROM && k != RANGE_TO) {
        return Err(invalid("range accepts only gte and lte"));
    }

    let bound = |key: &str| -> Result<Option<String>> {
        match range.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(invalid("range bounds must be strings")),
        }
    };

    Ok(FieldCondition::Range {
        field: field.to_string(),
        from: bound(RANGE_FROM)?,
        to: bound(RANGE_TO)?,
    })
}

/// Hex SHA-256 of the serialized snapshot
pub fn snapshot_digest(report_data: &Value) -> Result<String> {
    let bytes = serde_json::to_vec(report_data)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1))]
    pub source_type: String,

    #[serde(default)]
    pub filter_criteria: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReportInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    /// New criteria; re-materializes the snapshot when present
    pub filter_criteria: Option<Map<String, Value>>,
}

/// A freshly run report query
#[derive(Debug, Clone)]
struct Materialized {
    filter_criteria: Value,
    report_data: Value,
    record_count: i32,
    snapshot_digest: String,
}

/// Run the single category query for `criteria` under the caller's scope
async fn materialize<S>(
    store: &S,
    caller: &Caller,
    source: Category,
    raw: &Map<String, Value>,
) -> Result<Materialized>
where
    S: Store + ?Sized,
{
    let criteria = build_filter_criteria(source, raw)?;
    let filter = resolve_scope(caller, None)
        .filter()
        .with_conditions(criteria_to_filter(&criteria)?);

    let records = store.find_records(source, &filter).await?;
    let report_data = Value::Array(records.iter().map(Record::to_document).collect());
    let record_count = i32::try_from(records.len()).map_err(|_| AppError::Internal {
        message: "report snapshot too large".to_string(),
    })?;

    Ok(Materialized {
        filter_criteria: Value::Object(criteria),
        snapshot_digest: snapshot_digest(&report_data)?,
        report_data,
        record_count,
    })
}

/// Create and persist a report
pub async fn create_report<S>(store: &S, caller: &Caller, input: CreateReportInput) -> Result<CustomReport>
where
    S: Store + ?Sized,
{
    input.validate()?;

    let source = Category::from_source_type(&input.source_type).ok_or_else(|| {
        AppError::UnknownSourceType {
            name: input.source_type.clone(),
        }
    })?;

    let snapshot = materialize(store, caller, source, &input.filter_criteria).await?;
    let now = Utc::now().into();

    let report = store
        .insert_report(CustomReport {
            id: Uuid::new_v4(),
            title: input.title,
            created_by: caller.id,
            source_type: input.source_type,
            filter_criteria: snapshot.filter_criteria,
            report_data: snapshot.report_data,
            record_count: snapshot.record_count,
            snapshot_digest: snapshot.snapshot_digest,
            created_at: now,
            updated_at: now,
        })
        .await?;

    crate::metrics::record_report_created(&report.source_type, report.record_count);
    info!(
        report_id = %report.id,
        source_type = %report.source_type,
        records = report.record_count,
        "Custom report created"
    );

    Ok(report)
}

/// Reports visible to the caller, newest first
pub async fn list_reports<S>(store: &S, caller: &Caller) -> Result<Vec<CustomReport>>
where
    S: Store + ?Sized,
{
    let owner = if caller.is_director() { None } else { Some(caller.id) };
    store.list_reports(owner).await
}

/// One report, if the caller is its creator or a director
pub async fn get_report<S>(store: &S, caller: &Caller, id: Uuid) -> Result<CustomReport>
where
    S: Store + ?Sized,
{
    let report = store
        .find_report(id)
        .await?
        .ok_or_else(|| AppError::ReportNotFound { id: id.to_string() })?;

    if caller.is_director() || report.is_owned_by(caller.id) {
        Ok(report)
    } else {
        Err(AppError::forbidden("Not allowed to access this report"))
    }
}

/// Rename a report and optionally re-materialize it with new criteria
pub async fn update_report<S>(
    store: &S,
    caller: &Caller,
    id: Uuid,
    input: UpdateReportInput,
) -> Result<CustomReport>
where
    S: Store + ?Sized,
{
    input.validate()?;
    let mut report = get_report(store, caller, id).await?;

    if let Some(title) = input.title {
        report.title = title;
    }

    if let Some(raw) = input.filter_criteria {
        let source = Category::from_source_type(&report.source_type).ok_or_else(|| {
            AppError::UnknownSourceType {
                name: report.source_type.clone(),
            }
        })?;
        let snapshot = materialize(store, caller, source, &raw).await?;
        report.filter_criteria = snapshot.filter_criteria;
        report.report_data = snapshot.report_data;
        report.record_count = snapshot.record_count;
        report.snapshot_digest = snapshot.snapshot_digest;
        info!(report_id = %id, records = report.record_count, "Custom report refreshed");
    }

    report.updated_at = Utc::now().into();
    store.update_report(report).await
}

pub async fn delete_report<S>(store: &S, caller: &Caller, id: Uuid) -> Result<()>
where
    S: Store + ?Sized,
{
    get_report(store, caller, id).await?;

    if store.delete_report(id).await? {
        info!(report_id = %id, "Custom report deleted");
        Ok(())
    } else {
        Err(AppError::ReportNotFound { id: id.to_string() })
    }
}
