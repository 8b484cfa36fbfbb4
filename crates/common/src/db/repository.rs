//! Postgres repository
//!
//! SeaORM-backed implementation of [`RecordStore`] and [`ReportStore`].
//! Owner filters match both stored `createdBy` shapes in SQL.

use crate::db::models::*;
use crate::db::record::Record;
use crate::db::store::{scalar_text, FieldCondition, RecordFilter, RecordStore, ReportStore};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::registry::Category;
use async_trait::async_trait;
use sea_orm::sea_query::{Condition, Expr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select, Set,
};
use serde_json::Value;
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }
}

/// Matches `created_by` stored either as a bare id string or as `{id, ...}`
fn owner_condition(owner: Uuid) -> Condition {
    let id = owner.to_string();
    Condition::any()
        .add(Expr::cust_with_values(
            "jsonb_typeof(created_by) = 'string' AND lower(created_by #>> '{}') = ?",
            [id.clone()],
        ))
        .add(Expr::cust_with_values(
            "lower(coalesce(created_by ->> 'id', created_by ->> '_id')) = ?",
            [id],
        ))
}

fn field_condition(condition: &FieldCondition) -> Condition {
    match condition {
        FieldCondition::Equals { field, value } => match scalar_text(value) {
            Some(text) => Condition::all().add(Expr::cust_with_values(
                "data ->> ? = ?",
                [field.clone(), text],
            )),
            // Non-scalar values never match, same as the in-process evaluation
            None => Condition::all().add(Expr::cust("FALSE")),
        },
        FieldCondition::Range { field, from, to } => {
            let mut cond = Condition::all();
            if let Some(from) = from {
                cond = cond.add(Expr::cust_with_values(
                    "data ->> ? >= ?",
                    [field.clone(), from.clone()],
                ));
            }
            if let Some(to) = to {
                cond = cond.add(Expr::cust_with_values(
                    "data ->> ? <= ?",
                    [field.clone(), to.clone()],
                ));
            }
            cond.add(Expr::cust_with_values("data ->> ? IS NOT NULL", [field.clone()]))
        }
    }
}

fn record_query(category: Category, filter: &RecordFilter) -> Select<RecordEntity> {
    let mut query = RecordEntity::find().filter(RecordColumn::Category.eq(category.key()));

    if let Some(owner) = filter.owner {
        query = query.filter(owner_condition(owner));
    }

    for condition in &filter.conditions {
        query = query.filter(field_condition(condition));
    }

    query
}

fn report_active_model(report: CustomReport) -> CustomReportActiveModel {
    CustomReportActiveModel {
        id: Set(report.id),
        title: Set(report.title),
        created_by: Set(report.created_by),
        source_type: Set(report.source_type),
        filter_criteria: Set(report.filter_criteria),
        report_data: Set(report.report_data),
        record_count: Set(report.record_count),
        snapshot_digest: Set(report.snapshot_digest),
        created_at: Set(report.created_at),
        updated_at: Set(report.updated_at),
    }
}

#[async_trait]
impl RecordStore for Repository {
    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        UserEntity::find()
            .order_by_asc(UserColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn count_users(&self) -> Result<u64> {
        UserEntity::find()
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Record Operations
    // ========================================================================

    async fn find_records(&self, category: Category, filter: &RecordFilter) -> Result<Vec<Record>> {
        record_query(category, filter)
            .order_by_desc(RecordColumn::CreatedAt)
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(Record::from_row)
            .collect()
    }

    async fn count_records(&self, category: Category, filter: &RecordFilter) -> Result<u64> {
        record_query(category, filter)
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_record(&self, category: Category, id: Uuid) -> Result<Option<Record>> {
        RecordEntity::find_by_id(id)
            .filter(RecordColumn::Category.eq(category.key()))
            .one(self.read_conn())
            .await?
            .map(Record::from_row)
            .transpose()
    }

    async fn insert_record(&self, record: Record) -> Result<Record> {
        let row = RecordActiveModel {
            id: Set(record.id),
            category: Set(record.category.key().to_string()),
            created_by: Set(record.stored_owner()),
            data: Set(Value::Object(record.data)),
            created_at: Set(record.created_at.into()),
            updated_at: Set(record.updated_at.into()),
        };

        Record::from_row(row.insert(self.write_conn()).await?)
    }

    async fn update_record(&self, record: Record) -> Result<Record> {
        let mut row: RecordActiveModel = RecordEntity::find_by_id(record.id)
            .filter(RecordColumn::Category.eq(record.category.key()))
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::RecordNotFound {
                id: record.id.to_string(),
            })?
            .into();

        row.data = Set(Value::Object(record.data));
        row.updated_at = Set(chrono::Utc::now().into());

        Record::from_row(row.update(self.write_conn()).await?)
    }

    async fn delete_record(&self, category: Category, id: Uuid) -> Result<bool> {
        let result = RecordEntity::delete_many()
            .filter(RecordColumn::Id.eq(id))
            .filter(RecordColumn::Category.eq(category.key()))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl ReportStore for Repository {
    async fn insert_report(&self, report: CustomReport) -> Result<CustomReport> {
        report_active_model(report)
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn list_reports(&self, owner: Option<Uuid>) -> Result<Vec<CustomReport>> {
        let mut query = CustomReportEntity::find();
        if let Some(owner) = owner {
            query = query.filter(CustomReportColumn::CreatedBy.eq(owner));
        }

        query
            .order_by_desc(CustomReportColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_report(&self, id: Uuid) -> Result<Option<CustomReport>> {
        CustomReportEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn update_report(&self, report: CustomReport) -> Result<CustomReport> {
        let id = report.id;
        report_active_model(report)
            .update(self.write_conn())
            .await
            .map_err(|e| match e {
                sea_orm::DbErr::RecordNotUpdated => AppError::ReportNotFound { id: id.to_string() },
                other => other.into(),
            })
    }

    async fn delete_report(&self, id: Uuid) -> Result<bool> {
        let result = CustomReportEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
