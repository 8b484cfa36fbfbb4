//! Category record entity
//!
//! Every category shares one table keyed by `category`. Business fields live
//! in `data`; `created_by` keeps whatever owner shape the category stores.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Registry key, e.g. `publications`
    #[sea_orm(column_type = "Text")]
    pub category: String,

    /// Bare id string, embedded snapshot object, or NULL for system-wide rows
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub created_by: Option<Json>,

    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
