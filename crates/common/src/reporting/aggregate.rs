//! Cross-category aggregation
//!
//! Walks the whole registry, fetching each category either for one owner or
//! for everyone, and totals record counts and serialized sizes. A failed read
//! of any category fails the whole aggregation.

use crate::db::{Record, RecordFilter, RecordStore};
use crate::errors::{AppError, Result};
use crate::registry::Category;
use crate::reporting::size::estimate_size;
use futures::future::try_join_all;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Records fetched from one category
#[derive(Debug, Clone)]
pub struct CategoryAggregate {
    pub category: Category,
    pub records: Vec<Record>,
    pub total_bytes: u64,
    /// Fetched without an owner filter because the category has no owner
    pub system_wide: bool,
}

impl CategoryAggregate {
    fn new(category: Category, records: Vec<Record>, system_wide: bool) -> Self {
        let total_bytes = records.iter().map(estimate_size).sum();
        Self {
            category,
            records,
            total_bytes,
            system_wide,
        }
    }

    pub fn count(&self) -> u64 {
        self.records.len() as u64
    }
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    /// One entry per registry category, in registry order, empty ones included
    pub per_category: Vec<CategoryAggregate>,
    pub total_count: u64,
    pub total_bytes: u64,
}

impl Aggregation {
    pub fn get(&self, category: Category) -> Option<&CategoryAggregate> {
        self.per_category.iter().find(|agg| agg.category == category)
    }
}

/// Aggregate every category, optionally restricted to one owner.
///
/// The system-wide legacy category is always fetched unfiltered. When an
/// owner is given it is reported but not counted toward the totals, since
/// its records belong to nobody.
pub async fn aggregate_across_categories<S>(store: &S, owner: Option<Uuid>) -> Result<Aggregation>
where
    S: RecordStore + ?Sized,
{
    let start = Instant::now();

    let per_category = try_join_all(Category::ALL.into_iter().map(|category| async move {
        let system_wide = category.is_system_wide();
        let filter = match owner {
            Some(owner) if !system_wide => RecordFilter::owned_by(owner),
            _ => RecordFilter::all(),
        };
        let records = store.find_records(category, &filter).await?;
        debug!(category = %category, records = records.len(), "Aggregated category");
        Ok::<_, AppError>(CategoryAggregate::new(category, records, system_wide))
    }))
    .await?;

    let counted = per_category
        .iter()
        .filter(|agg| owner.is_none() || !agg.system_wide);
    let (total_count, total_bytes) = counted.fold((0, 0), |(count, bytes), agg| {
        (count + agg.count(), bytes + agg.total_bytes)
    });

    crate::metrics::record_aggregation(
        start.elapsed().as_secs_f64(),
        if owner.is_some() { "owner" } else { "all" },
        total_count,
    );

    Ok(Aggregation {
        per_category,
        total_count,
        total_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::*;
    use crate::db::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_store_yields_zeroed_entries() {
        let store = MemoryStore::new();
        let aggregation = aggregate_across_categories(&store, None).await.unwrap();

        assert_eq!(aggregation.per_category.len(), Category::ALL.len());
        assert_eq!(aggregation.total_count, 0);
        assert_eq!(aggregation.total_bytes, 0);
        for agg in &aggregation.per_category {
            assert_eq!(agg.count(), 0);
        }
    }

    #[tokio::test]
    async fn test_totals_match_categories() {
        let store = MemoryStore::new();
        let ada = store.insert_user(user("Ada", "researcher")).await;
        let bob = store.insert_user(user("Bob", "researcher")).await;
        record(&store, Category::Publication, &ada, json!({"title": "A"})).await;
        record(&store, Category::Competition, &ada, json!({"competitionName": "B"})).await;
        record(&store, Category::Event, &bob, json!({"activity": "C"})).await;
        system_record(&store, Category::Training, json!({"name": "Fire drill"})).await;

        let all = aggregate_across_categories(&store, None).await.unwrap();
        assert_eq!(all.total_count, 4);
        assert_eq!(all.per_category.iter().map(|a| a.count()).sum::<u64>(), 4);
        assert_eq!(all.per_category.iter().map(|a| a.total_bytes).sum::<u64>(), all.total_bytes);

        let mine = aggregate_across_categories(&store, Some(ada.id)).await.unwrap();
        assert_eq!(mine.total_count, 2);
        assert_eq!(mine.get(Category::Event).unwrap().count(), 0);

        // Legacy trainings are reported system-wide but not attributed to Ada
        let trainings = mine.get(Category::Training).unwrap();
        assert!(trainings.system_wide);
        assert_eq!(trainings.count(), 1);
    }

    #[tokio::test]
    async fn test_any_failed_read_fails_everything() {
        let store = MemoryStore::new();
        store.fail_reads(Category::LocalCollaboration).await;

        let err = aggregate_across_categories(&store, None).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
