//! Data-usage analytics
//!
//! Record counts and serialized sizes per table and per user, built on the
//! cross-category aggregation. Sizes are rendered in kilobytes.

use crate::auth::Caller;
use crate::db::models::User;
use crate::db::{RecordFilter, RecordStore};
use crate::errors::{AppError, Result};
use crate::registry::Category;
use crate::reporting::aggregate::{aggregate_across_categories, CategoryAggregate};
use crate::reporting::size::{average_kilobytes, estimate_size, to_kilobytes};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Count and size of one table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStats {
    pub count: u64,
    /// Kilobytes
    pub total_size: f64,
    /// Kilobytes per record
    pub average_size: f64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub system_wide: bool,
}

impl TableStats {
    fn from_bytes(count: u64, total_bytes: u64, system_wide: bool) -> Self {
        Self {
            count,
            total_size: to_kilobytes(total_bytes),
            average_size: average_kilobytes(total_bytes, count),
            system_wide,
        }
    }

    fn from_aggregate(agg: &CategoryAggregate) -> Self {
        Self::from_bytes(agg.count(), agg.total_bytes, agg.system_wide)
    }
}

/// Per-user totals across all owner-scoped tables
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub total_records: u64,
    /// Kilobytes
    pub total_size: f64,
    pub table_breakdown: BTreeMap<&'static str, TableStats>,
}

/// Whole-system usage
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub total_users: u64,
    pub total_records: u64,
    /// Kilobytes
    pub total_data_size: f64,
    /// Kilobytes per record
    pub average_record_size: f64,
    pub table_stats: BTreeMap<&'static str, TableStats>,
    pub user_stats: Vec<UserStats>,
    pub created_at: DateTime<Utc>,
}

/// One user's share of a single table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTableStats {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub count: u64,
    pub total_size: f64,
    pub average_size: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableAnalytics {
    pub table_name: &'static str,
    pub display_name: &'static str,
    #[serde(flatten)]
    pub stats: TableStats,
    /// Empty for system-wide tables
    pub user_breakdown: Vec<UserTableStats>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub total_records: u64,
    pub total_size: f64,
    pub average_record_size: f64,
    /// Owner-scoped tables; counts sum to `total_records`
    pub table_stats: BTreeMap<&'static str, TableStats>,
    /// System-wide tables, reported as whole-table totals
    pub system_wide: BTreeMap<&'static str, TableStats>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tally {
    count: u64,
    bytes: u64,
}

impl Tally {
    fn add(&mut self, bytes: u64) {
        self.count += 1;
        self.bytes += bytes;
    }
}

/// Full usage snapshot. Director only.
pub async fn data_usage_analytics<S>(store: &S, caller: &Caller) -> Result<AnalyticsSnapshot>
where
    S: RecordStore + ?Sized,
{
    caller.require_director()?;

    let users = store.list_users().await?;
    let aggregation = aggregate_across_categories(store, None).await?;

    let mut table_stats = BTreeMap::new();
    // owner key -> category key -> tally
    let mut by_owner: HashMap<String, BTreeMap<&'static str, Tally>> = HashMap::new();

    for agg in &aggregation.per_category {
        table_stats.insert(agg.category.key(), TableStats::from_aggregate(agg));
        if agg.system_wide {
            continue;
        }
        for record in &agg.records {
            if let Some(owner) = &record.owner {
                by_owner
                    .entry(owner.key())
                    .or_default()
                    .entry(agg.category.key())
                    .or_default()
                    .add(estimate_size(record));
            }
        }
    }

    let mut user_stats: Vec<UserStats> = users
        .iter()
        .map(|user| {
            let tallies = by_owner.remove(&user.id.to_string()).unwrap_or_default();
            user_stats_from(user, tallies)
        })
        .collect();
    user_stats.sort_by(|a, b| b.total_size.total_cmp(&a.total_size));

    Ok(AnalyticsSnapshot {
        total_users: users.len() as u64,
        total_records: aggregation.total_count,
        total_data_size: to_kilobytes(aggregation.total_bytes),
        average_record_size: average_kilobytes(aggregation.total_bytes, aggregation.total_count),
        table_stats,
        user_stats,
        created_at: Utc::now(),
    })
}

fn user_stats_from(user: &User, tallies: BTreeMap<&'static str, Tally>) -> UserStats {
    let total_records: u64 = tallies.values().map(|t| t.count).sum();
    let total_bytes: u64 = tallies.values().map(|t| t.bytes).sum();
    let table_breakdown = Category::ALL
        .into_iter()
        .filter(|c| !c.is_system_wide())
        .map(|c| {
            let stats = tallies
                .get(c.key())
                .map(|t| TableStats::from_bytes(t.count, t.bytes, false))
                .unwrap_or_else(|| TableStats::from_bytes(0, 0, false));
            (c.key(), stats)
        })
        .collect();

    UserStats {
        user_id: user.id,
        name: user.full_name(),
        email: user.email.clone(),
        total_records,
        total_size: to_kilobytes(total_bytes),
        table_breakdown,
    }
}

/// Usage of one table with a per-user breakdown. Director only.
pub async fn table_analytics<S>(store: &S, caller: &Caller, table_name: &str) -> Result<TableAnalytics>
where
    S: RecordStore + ?Sized,
{
    caller.require_director()?;

    let category = Category::from_key(table_name).ok_or_else(|| AppError::NotFound {
        resource_type: "table".to_string(),
        id: table_name.to_string(),
    })?;

    let records = store.find_records(category, &RecordFilter::all()).await?;
    let total_bytes: u64 = records.iter().map(estimate_size).sum();
    let system_wide = category.is_system_wide();

    let user_breakdown = if system_wide {
        Vec::new()
    } else {
        let names: HashMap<String, String> = store
            .list_users()
            .await?
            .iter()
            .map(|u| (u.id.to_string(), u.full_name()))
            .collect();

        let mut tallies: BTreeMap<String, (Option<String>, Tally)> = BTreeMap::new();
        for record in &records {
            let Some(owner) = &record.owner else { continue };
            let key = owner.key();
            let name = names.get(&key).cloned().or_else(|| owner.name.clone());
            tallies
                .entry(key)
                .or_insert_with(|| (name, Tally::default()))
                .1
                .add(estimate_size(record));
        }

        let mut breakdown: Vec<UserTableStats> = tallies
            .into_iter()
            .map(|(user_id, (name, tally))| UserTableStats {
                user_id,
                name,
                count: tally.count,
                total_size: to_kilobytes(tally.bytes),
                average_size: average_kilobytes(tally.bytes, tally.count),
            })
            .collect();
        breakdown.sort_by(|a, b| b.count.cmp(&a.count));
        breakdown
    };

    Ok(TableAnalytics {
        table_name: category.key(),
        display_name: category.display_name(),
        stats: TableStats::from_bytes(records.len() as u64, total_bytes, system_wide),
        user_breakdown,
        created_at: Utc::now(),
    })
}

/// Usage of one account. Director or the account itself.
pub async fn user_analytics<S>(store: &S, caller: &Caller, user_id: Uuid) -> Result<UserAnalytics>
where
    S: RecordStore + ?Sized,
{
    caller.require_self_or_director(user_id)?;

    let user = store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound {
            id: user_id.to_string(),
        })?;

    let aggregation = aggregate_across_categories(store, Some(user_id)).await?;
    let (system_wide, table_stats): (BTreeMap<_, _>, BTreeMap<_, _>) = aggregation
        .per_category
        .iter()
        .map(|agg| (agg.category.key(), TableStats::from_aggregate(agg)))
        .partition(|(_, stats)| stats.system_wide);

    Ok(UserAnalytics {
        user_id,
        name: user.full_name(),
        email: user.email,
        total_records: aggregation.total_count,
        total_size: to_kilobytes(aggregation.total_bytes),
        average_record_size: average_kilobytes(aggregation.total_bytes, aggregation.total_count),
        table_stats,
        system_wide,
        created_at: Utc::now(),
    })
}
