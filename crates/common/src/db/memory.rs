//! In-process store
//!
//! Backs local development (`database.url = "memory"`) and tests. Evaluates
//! filters with the same semantics as the Postgres repository.

use crate::db::models::{CustomReport, User};
use crate::db::owner::OwnerRef;
use crate::db::record::Record;
use crate::db::store::{RecordFilter, RecordStore, ReportStore};
use crate::errors::{AppError, Result};
use crate::registry::Category;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DbErr;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<Uuid, User>,
    records: Vec<Record>,
    reports: Vec<CustomReport>,
    failing: HashSet<Category>,
}

impl MemoryState {
    fn check(&self, category: Category) -> Result<()> {
        if self.failing.contains(&category) {
            return Err(AppError::Database(DbErr::Custom(format!(
                "read from {} failed",
                category.key()
            ))));
        }
        Ok(())
    }
}

/// Store holding everything in process memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account
    pub async fn insert_user(&self, user: User) -> User {
        let mut state = self.state.write().await;
        state.users.insert(user.id, user.clone());
        user
    }

    /// Make every read of `category` fail until cleared
    #[cfg(test)]
    pub(crate) async fn fail_reads(&self, category: Category) {
        self.state.write().await.failing.insert(category);
    }

    #[cfg(test)]
    pub(crate) async fn clear_failures(&self) {
        self.state.write().await.failing.clear();
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.state.read().await.users.len() as u64)
    }

    async fn find_records(&self, category: Category, filter: &RecordFilter) -> Result<Vec<Record>> {
        let state = self.state.read().await;
        state.check(category)?;

        let mut records: Vec<Record> = state
            .records
            .iter()
            .filter(|r| r.category == category && filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn count_records(&self, category: Category, filter: &RecordFilter) -> Result<u64> {
        let state = self.state.read().await;
        state.check(category)?;

        Ok(state
            .records
            .iter()
            .filter(|r| r.category == category && filter.matches(r))
            .count() as u64)
    }

    async fn find_record(&self, category: Category, id: Uuid) -> Result<Option<Record>> {
        let state = self.state.read().await;
        state.check(category)?;

        Ok(state
            .records
            .iter()
            .find(|r| r.category == category && r.id == id)
            .cloned())
    }

    async fn insert_record(&self, mut record: Record) -> Result<Record> {
        // Round-trip the owner through its stored shape, as a database would
        record.owner = record.stored_owner().as_ref().and_then(OwnerRef::from_stored);
        self.state.write().await.records.push(record.clone());
        Ok(record)
    }

    async fn update_record(&self, record: Record) -> Result<Record> {
        let mut state = self.state.write().await;
        let stored = state
            .records
            .iter_mut()
            .find(|r| r.category == record.category && r.id == record.id)
            .ok_or_else(|| AppError::RecordNotFound {
                id: record.id.to_string(),
            })?;

        stored.data = record.data;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_record(&self, category: Category, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.records.len();
        state.records.retain(|r| !(r.category == category && r.id == id));
        Ok(state.records.len() < before)
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: CustomReport) -> Result<CustomReport> {
        self.state.write().await.reports.push(report.clone());
        Ok(report)
    }

    async fn list_reports(&self, owner: Option<Uuid>) -> Result<Vec<CustomReport>> {
        let state = self.state.read().await;
        let mut reports: Vec<CustomReport> = state
            .reports
            .iter()
            .filter(|r| owner.map_or(true, |o| r.is_owned_by(o)))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn find_report(&self, id: Uuid) -> Result<Option<CustomReport>> {
        Ok(self
            .state
            .read()
            .await
            .reports
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn update_report(&self, report: CustomReport) -> Result<CustomReport> {
        let mut state = self.state.write().await;
        let stored = state
            .reports
            .iter_mut()
            .find(|r| r.id == report.id)
            .ok_or_else(|| AppError::ReportNotFound {
                id: report.id.to_string(),
            })?;

        *stored = report.clone();
        Ok(report)
    }

    async fn delete_report(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.reports.len();
        state.reports.retain(|r| r.id != id);
        Ok(state.reports.len() < before)
    }
}

/// Fixtures shared by tests across the crate
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::{Map, Value};

    pub fn user(first: &str, role: &str) -> User {
        let now = Utc::now().into();
        User {
            id: Uuid::new_v4(),
            email: format!("{}@coe.edu", first.to_lowercase()),
            role: role.to_string(),
            first_name: first.to_string(),
            last_name: "Tester".to_string(),
            uid: None,
            contact: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    /// Insert a record owned by `owner` in the category's stored shape
    pub async fn record(store: &MemoryStore, category: Category, owner: &User, data: Value) -> Record {
        let record = Record::new(category, Some(OwnerRef::from_user(owner)), object(data));
        store.insert_record(record).await.unwrap()
    }

    pub async fn system_record(store: &MemoryStore, category: Category, data: Value) -> Record {
        store
            .insert_record(Record::new(category, None, object(data)))
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::db::store::FieldCondition;
    use serde_json::json;

    #[tokio::test]
    async fn test_owner_filter_matches_both_shapes() {
        let store = MemoryStore::new();
        let ada = store.insert_user(user("Ada", "researcher")).await;
        let bob = store.insert_user(user("Bob", "researcher")).await;

        // Publication stores a bare id, Internship an embedded snapshot
        record(&store, Category::Publication, &ada, json!({"title": "P1"})).await;
        record(&store, Category::Internship, &ada, json!({"applicantName": "I1"})).await;
        record(&store, Category::Publication, &bob, json!({"title": "P2"})).await;

        let mine = RecordFilter::owned_by(ada.id);
        assert_eq!(store.count_records(Category::Publication, &mine).await.unwrap(), 1);
        assert_eq!(store.count_records(Category::Internship, &mine).await.unwrap(), 1);
        assert_eq!(
            store.count_records(Category::Publication, &RecordFilter::all()).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_field_conditions() {
        let store = MemoryStore::new();
        let ada = store.insert_user(user("Ada", "researcher")).await;
        record(&store, Category::Publication, &ada, json!({"hecCategory": "W", "year": 2023})).await;
        record(&store, Category::Publication, &ada, json!({"hecCategory": "X", "year": 2022})).await;

        let filter = RecordFilter::all().with_conditions(vec![FieldCondition::Equals {
            field: "year".into(),
            value: json!("2023"),
        }]);
        let found = store.find_records(Category::Publication, &filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].data["hecCategory"], "W");
    }

    #[tokio::test]
    async fn test_date_range_condition() {
        let store = MemoryStore::new();
        let ada = store.insert_user(user("Ada", "researcher")).await;
        for date in ["2024-01-10", "2024-02-15", "2024-03-20"] {
            record(&store, Category::TalkTrainingConference, &ada, json!({"date": date})).await;
        }
        record(&store, Category::TalkTrainingConference, &ada, json!({"title": "undated"})).await;

        let filter = RecordFilter::all().with_conditions(vec![FieldCondition::Range {
            field: "date".into(),
            from: Some("2024-02-01".into()),
            to: None,
        }]);
        assert_eq!(
            store.count_records(Category::TalkTrainingConference, &filter).await.unwrap(),
            2
        );
    }

    #[test]
    fn test_users_listed_oldest_first() {
        let store = MemoryStore::new();
        let first = tokio_test::block_on(store.insert_user(user("Ada", "researcher")));
        let second = tokio_test::block_on(store.insert_user(user("Bob", "director")));

        let users = tokio_test::block_on(store.list_users()).unwrap();
        assert_eq!(users.len(), 2);
        assert!(users[0].created_at <= users[1].created_at);
        assert!(users.iter().any(|u| u.id == first.id));
        assert!(users.iter().any(|u| u.id == second.id));
        assert_eq!(tokio_test::block_on(store.count_users()).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryStore::new();
        store.fail_reads(Category::Patent).await;
        assert!(store.find_records(Category::Patent, &RecordFilter::all()).await.is_err());
        assert!(store.find_records(Category::Event, &RecordFilter::all()).await.is_ok());

        store.clear_failures().await;
        assert!(store.find_records(Category::Patent, &RecordFilter::all()).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_and_delete_record() {
        let store = MemoryStore::new();
        let ada = store.insert_user(user("Ada", "researcher")).await;
        let mut rec = record(&store, Category::Event, &ada, json!({"activity": "Seminar"})).await;

        rec.data.insert("activity".into(), json!("Keynote"));
        let updated = store.update_record(rec.clone()).await.unwrap();
        assert_eq!(updated.data["activity"], "Keynote");

        assert!(store.delete_record(Category::Event, rec.id).await.unwrap());
        assert!(!store.delete_record(Category::Event, rec.id).await.unwrap());
        assert!(store.find_record(Category::Event, rec.id).await.unwrap().is_none());
    }
}
