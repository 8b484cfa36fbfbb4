//! Activity projection and single-account reports
//!
//! Every category carries a declarative [`ProjectionSpec`] in the registry.
//! One generic projector turns any record into an [`Activity`]; the account
//! report merges the activities of all projected categories into a single
//! timeline, newest first.

use crate::auth::Caller;
use crate::db::models::User;
use crate::db::{scalar_text, Record, RecordFilter, RecordStore};
use crate::errors::{AppError, Result};
use crate::registry::Category;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Keys of the activity shape itself; extras never overwrite them
const RESERVED_KEYS: [&str; 6] = ["id", "type", "title", "date", "status", "role"];

/// Where an activity's title comes from
#[derive(Debug, Clone, Copy)]
pub enum TitleRule {
    Field(&'static str),
    /// Fixed prefix followed by a field value
    Prefixed(&'static str, &'static str),
}

/// Where an activity's date comes from; falls back to `createdAt`
#[derive(Debug, Clone, Copy)]
pub enum DateRule {
    /// An ISO-8601 date or timestamp field
    Field(&'static str),
    /// January 1st of a year field
    YearStart(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub enum StatusRule {
    Fixed(&'static str),
    /// A field value, or the default when missing or blank
    FieldOr(&'static str, &'static str),
}

/// Role resolution: `other_field` when `field` equals `other_marker`
#[derive(Debug, Clone, Copy)]
pub struct RoleRule {
    pub field: &'static str,
    pub other_field: &'static str,
    pub other_marker: &'static str,
}

/// Per-category projection profile
#[derive(Debug)]
pub struct ProjectionSpec {
    pub activity_type: &'static str,
    pub title: TitleRule,
    pub date: DateRule,
    pub status: StatusRule,
    pub role: Option<RoleRule>,
    /// Extras copied in both profiles
    pub summary_fields: &'static [&'static str],
    /// Extras copied only in the detailed profile
    pub detailed_fields: &'static [&'static str],
}

impl ProjectionSpec {
    /// Field names copied as extras for the given profile, in order
    pub fn fields(&self, detailed: bool) -> impl Iterator<Item = &'static str> + '_ {
        let extra: &'static [&'static str] = if detailed { self.detailed_fields } else { &[] };
        self.summary_fields.iter().chain(extra.iter()).copied()
    }
}

/// A record normalized into the common timeline shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

fn text_field(record: &Record, name: &str) -> Option<String> {
    record
        .field(name)
        .and_then(scalar_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse an RFC 3339 timestamp, a naive timestamp or a plain date
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// January 1st of a numeric or textual year
pub fn year_start(value: &Value) -> Option<DateTime<Utc>> {
    let year = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Project one record with the category's profile
pub fn project(record: &Record, spec: &ProjectionSpec, detailed: bool) -> Activity {
    let title = match spec.title {
        TitleRule::Field(field) => text_field(record, field).unwrap_or_else(|| "Untitled".to_string()),
        TitleRule::Prefixed(prefix, field) => format!(
            "{}{}",
            prefix,
            text_field(record, field).unwrap_or_else(|| "Unknown".to_string())
        ),
    };

    let date = match spec.date {
        DateRule::Field(field) => record.field(field).and_then(parse_date),
        DateRule::YearStart(field) => record.field(field).and_then(year_start),
    }
    .unwrap_or(record.created_at);

    let status = match spec.status {
        StatusRule::Fixed(status) => status.to_string(),
        StatusRule::FieldOr(field, default) => {
            text_field(record, field).unwrap_or_else(|| default.to_string())
        }
    };

    let role = spec.role.and_then(|rule| {
        let role = text_field(record, rule.field)?;
        if role.eq_ignore_ascii_case(rule.other_marker) {
            text_field(record, rule.other_field).or(Some(role))
        } else {
            Some(role)
        }
    });

    let mut extras = Map::new();
    for field in spec.fields(detailed) {
        if RESERVED_KEYS.contains(&field) {
            continue;
        }
        if let Some(value) = record.field(field) {
            extras.insert(field.to_string(), value.clone());
        }
    }

    Activity {
        id: record.id,
        activity_type: spec.activity_type.to_string(),
        title,
        date,
        status,
        role,
        extras,
    }
}

/// Account section of the report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl From<&User> for AccountInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name(),
            email: user.email.clone(),
            role: user.role.clone(),
            uid: user.uid.clone(),
            contact: user.contact.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// Owned record count per category key
    pub counts: BTreeMap<&'static str, u64>,
    pub total_activities: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReport {
    pub account: AccountInfo,
    pub summary: ReportSummary,
    pub all_activities: Vec<Activity>,
    pub detailed: bool,
    pub generated_at: DateTime<Utc>,
}

/// Build the activity report of one account.
///
/// Counts run as a separate parallel pass from the fetches. The legacy
/// system-wide category has no projection and is left out.
pub async fn build_account_report<S>(
    store: &S,
    caller: &Caller,
    target_user_id: Uuid,
    detailed: bool,
) -> Result<AccountReport>
where
    S: RecordStore + ?Sized,
{
    caller.require_self_or_director(target_user_id)?;

    let user = store
        .find_user(target_user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound {
            id: target_user_id.to_string(),
        })?;

    let start = Instant::now();
    let filter = RecordFilter::owned_by(target_user_id);
    let projected: Vec<_> = Category::projected().collect();

    let counts = try_join_all(projected.iter().map(|(category, _)| {
        let filter = &filter;
        async move { Ok::<_, AppError>((category.key(), store.count_records(*category, filter).await?)) }
    }));
    let fetches = try_join_all(projected.iter().map(|(category, spec)| {
        let filter = &filter;
        async move {
            let records = store.find_records(*category, filter).await?;
            debug!(category = %category, records = records.len(), "Projected category");
            Ok::<_, AppError>(
                records
                    .iter()
                    .map(|record| project(record, spec, detailed))
                    .collect::<Vec<_>>(),
            )
        }
    }));
    let (counts, fetched) = futures::try_join!(counts, fetches)?;

    let counts: BTreeMap<&'static str, u64> = counts.into_iter().collect();
    let total_activities: u64 = counts.values().sum();

    let mut all_activities: Vec<Activity> = fetched.into_iter().flatten().collect();
    all_activities.sort_by(|a, b| b.date.cmp(&a.date));

    crate::metrics::record_account_report(
        start.elapsed().as_secs_f64(),
        detailed,
        all_activities.len(),
    );
    info!(
        account = %target_user_id,
        activities = all_activities.len(),
        detailed,
        "Account report generated"
    );

    Ok(AccountReport {
        account: AccountInfo::from(&user),
        summary: ReportSummary {
            counts,
            total_activities,
        },
        all_activities,
        detailed,
        generated_at: Utc::now(),
    })
}
