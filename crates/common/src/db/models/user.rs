//! User account entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::auth::Role;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub email: String,

    /// `director` or any contributor role name
    #[sea_orm(column_type = "Text")]
    pub role: String,

    #[sea_orm(column_type = "Text")]
    pub first_name: String,

    #[sea_orm(column_type = "Text")]
    pub last_name: String,

    /// Institutional identifier
    #[sea_orm(column_type = "Text", nullable)]
    pub uid: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub contact: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn role(&self) -> Role {
        Role::from(self.role.as_str())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::custom_report::Entity")]
    CustomReports,
}

impl Related<super::custom_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CustomReports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
