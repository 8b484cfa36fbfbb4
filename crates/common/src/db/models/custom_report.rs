//! Custom report entity: a saved filter plus its point-in-time result snapshot

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "custom_reports")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    pub created_by: Uuid,

    /// Report source type, e.g. `Publications`
    #[sea_orm(column_type = "Text")]
    pub source_type: String,

    /// Sanitized criteria as persisted
    #[sea_orm(column_type = "JsonBinary")]
    pub filter_criteria: Json,

    /// Matching records at creation (or last refresh) time
    #[sea_orm(column_type = "JsonBinary")]
    pub report_data: Json,

    pub record_count: i32,

    /// SHA-256 hex of the serialized snapshot
    #[sea_orm(column_type = "Text")]
    pub snapshot_digest: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
