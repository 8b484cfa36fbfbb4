//! Per-category record CRUD
//!
//! One generic service over the category registry. Listing applies the
//! visibility scope, single-record access goes through the ownership
//! predicate, and the system-wide legacy category is readable by everyone but
//! writable only by directors.

use crate::access::{ensure_record_access, resolve_scope};
use crate::auth::Caller;
use crate::db::{strip_system_keys, OwnerRef, Record, RecordFilter, RecordStore};
use crate::errors::{AppError, Result};
use crate::registry::{Category, OwnerField};
use crate::reporting::reports::{criteria_to_filter, sanitize_filter_criteria};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

/// Listing parameters
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub only_mine: Option<bool>,
    /// Exact-match field filters; empty and `"N/A"` values are ignored
    pub filters: Map<String, Value>,
}

fn ensure_can_write(caller: &Caller, record: &Record) -> Result<()> {
    if record.category.is_system_wide() {
        caller.require_director()
    } else {
        ensure_record_access(caller, record)
    }
}

fn ensure_can_read(caller: &Caller, record: &Record) -> Result<()> {
    if record.category.is_system_wide() {
        Ok(())
    } else {
        ensure_record_access(caller, record)
    }
}

/// Records of a category visible to the caller, newest first
pub async fn list_records<S>(
    store: &S,
    caller: &Caller,
    category: Category,
    query: &ListQuery,
) -> Result<Vec<Record>>
where
    S: RecordStore + ?Sized,
{
    let base = if category.is_system_wide() {
        RecordFilter::all()
    } else {
        resolve_scope(caller, query.only_mine).filter()
    };
    let conditions = criteria_to_filter(&sanitize_filter_criteria(&query.filters))?;

    store
        .find_records(category, &base.with_conditions(conditions))
        .await
}

async fn load<S>(store: &S, category: Category, id: Uuid) -> Result<Record>
where
    S: RecordStore + ?Sized,
{
    store
        .find_record(category, id)
        .await?
        .ok_or_else(|| AppError::RecordNotFound { id: id.to_string() })
}

pub async fn get_record<S>(store: &S, caller: &Caller, category: Category, id: Uuid) -> Result<Record>
where
    S: RecordStore + ?Sized,
{
    let record = load(store, category, id).await?;
    ensure_can_read(caller, &record)?;
    Ok(record)
}

/// Owner reference stamped on new records, in the category's shape
async fn owner_for<S>(store: &S, caller: &Caller, category: Category) -> Result<Option<OwnerRef>>
where
    S: RecordStore + ?Sized,
{
    Ok(match category.owner_field() {
        OwnerField::Absent => None,
        OwnerField::Reference => Some(OwnerRef::id_only(caller.id)),
        OwnerField::Snapshot => Some(match store.find_user(caller.id).await? {
            Some(user) => OwnerRef::from_user(&user),
            None => OwnerRef {
                email: caller.email.clone(),
                ..OwnerRef::id_only(caller.id)
            },
        }),
    })
}

pub async fn create_record<S>(
    store: &S,
    caller: &Caller,
    category: Category,
    data: Map<String, Value>,
) -> Result<Record>
where
    S: RecordStore + ?Sized,
{
    if category.is_system_wide() {
        caller.require_director()?;
    }

    let owner = owner_for(store, caller, category).await?;
    let record = store.insert_record(Record::new(category, owner, data)).await?;

    info!(category = %category, record_id = %record.id, "Record created");
    Ok(record)
}

/// Merge `changes` into the record's business fields
pub async fn update_record<S>(
    store: &S,
    caller: &Caller,
    category: Category,
    id: Uuid,
    changes: Map<String, Value>,
) -> Result<Record>
where
    S: RecordStore + ?Sized,
{
    let mut record = load(store, category, id).await?;
    ensure_can_write(caller, &record)?;

    record.data.extend(strip_system_keys(changes));
    let record = store.update_record(record).await?;

    info!(category = %category, record_id = %id, "Record updated");
    Ok(record)
}

pub async fn delete_record<S>(store: &S, caller: &Caller, category: Category, id: Uuid) -> Result<()>
where
    S: RecordStore + ?Sized,
{
    let record = load(store, category, id).await?;
    ensure_can_write(caller, &record)?;

    if !store.delete_record(category, id).await? {
        return Err(AppError::RecordNotFound { id: id.to_string() });
    }

    info!(category = %category, record_id = %id, "Record deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::*;
    use crate::db::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_contributor_lists_only_own_events() {
        let store = MemoryStore::new();
        let a = store.insert_user(user("Ada", "researcher")).await;
        let b = store.insert_user(user("Bob", "researcher")).await;
        record(&store, Category::Event, &a, json!({"activity": "A1"})).await;
        record(&store, Category::Event, &a, json!({"activity": "A2"})).await;
        let theirs = record(&store, Category::Event, &b, json!({"activity": "B1"})).await;

        let caller = Caller::contributor(a.id);
        let listed = list_records(&store, &caller, Category::Event, &ListQuery::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|r| r.owner.as_ref().unwrap().is_user(a.id)));

        let err = get_record(&store, &caller, Category::Event, theirs.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
        assert_eq!(err.status_code().as_u16(), 403);
    }

    #[tokio::test]
    async fn test_director_only_mine_toggle() {
        let store = MemoryStore::new();
        let director = store.insert_user(user("Dee", "director")).await;
        let a = store.insert_user(user("Ada", "researcher")).await;
        record(&store, Category::Event, &director, json!({"activity": "Mine"})).await;
        record(&store, Category::Event, &a, json!({"activity": "Hers"})).await;

        let caller = Caller::director(director.id);
        let everything = list_records(&store, &caller, Category::Event, &ListQuery::default())
            .await
            .unwrap();
        assert_eq!(everything.len(), 2);

        let only_mine = ListQuery {
            only_mine: Some(true),
            ..Default::default()
        };
        let mine = list_records(&store, &caller, Category::Event, &only_mine).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].data["activity"], "Mine");
    }

    #[tokio::test]
    async fn test_list_with_field_filters() {
        let store = MemoryStore::new();
        let a = store.insert_user(user("Ada", "researcher")).await;
        record(&store, Category::Publication, &a, json!({"hecCategory": "W"})).await;
        record(&store, Category::Publication, &a, json!({"hecCategory": "X"})).await;

        let query = ListQuery {
            only_mine: None,
            filters: object(json!({"hecCategory": "W", "year": "N/A"})),
        };
        let found = list_records(&store, &Caller::contributor(a.id), Category::Publication, &query)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_create_stamps_owner_shape() {
        let store = MemoryStore::new();
        let a = store.insert_user(user("Ada", "researcher")).await;
        let caller = Caller::contributor(a.id);

        let patent = create_record(&store, &caller, Category::Patent, object(json!({"title": "Valve"})))
            .await
            .unwrap();
        assert_eq!(patent.to_document()["createdBy"], json!(a.id.to_string()));

        let competition = create_record(
            &store,
            &caller,
            Category::Competition,
            object(json!({"competitionName": "Hackathon", "createdBy": "forged"})),
        )
        .await
        .unwrap();
        let doc = competition.to_document();
        assert_eq!(doc["createdBy"]["id"], json!(a.id.to_string()));
        assert_eq!(doc["createdBy"]["email"], json!(a.email));
    }

    #[tokio::test]
    async fn test_update_and_delete_guarded_by_owner() {
        let store = MemoryStore::new();
        let a = store.insert_user(user("Ada", "researcher")).await;
        let b = store.insert_user(user("Bob", "researcher")).await;
        let rec = record(&store, Category::Funding, &a, json!({"projectTitle": "Grid", "amount": 10})).await;

        let bob = Caller::contributor(b.id);
        let err = update_record(&store, &bob, Category::Funding, rec.id, object(json!({"amount": 99})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
        let err = delete_record(&store, &bob, Category::Funding, rec.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let ada = Caller::contributor(a.id);
        let updated = update_record(&store, &ada, Category::Funding, rec.id, object(json!({"amount": 20})))
            .await
            .unwrap();
        assert_eq!(updated.data["amount"], 20);
        assert_eq!(updated.data["projectTitle"], "Grid");

        let director = Caller::director(Uuid::new_v4());
        delete_record(&store, &director, Category::Funding, rec.id).await.unwrap();
        let err = get_record(&store, &ada, Category::Funding, rec.id).await.unwrap_err();
        assert!(matches!(err, AppError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_system_wide_trainings() {
        let store = MemoryStore::new();
        let a = store.insert_user(user("Ada", "researcher")).await;
        let contributor = Caller::contributor(a.id);
        let director = Caller::director(Uuid::new_v4());

        let err = create_record(&store, &contributor, Category::Training, object(json!({"name": "Safety"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let training = create_record(&store, &director, Category::Training, object(json!({"name": "Safety"})))
            .await
            .unwrap();
        assert!(training.owner.is_none());

        let listed = list_records(&store, &contributor, Category::Training, &ListQuery::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(get_record(&store, &contributor, Category::Training, training.id).await.is_ok());
        assert!(delete_record(&store, &contributor, Category::Training, training.id)
            .await
            .is_err());
    }
}
