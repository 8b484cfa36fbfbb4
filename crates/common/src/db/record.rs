//! Domain view of a category record

use crate::db::models::RecordRow;
use crate::db::owner::OwnerRef;
use crate::errors::{AppError, Result};
use crate::registry::Category;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Keys owned by the record itself; business data may not shadow them
pub const SYSTEM_KEYS: [&str; 4] = ["id", "createdBy", "createdAt", "updatedAt"];

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: Uuid,
    pub category: Category,
    pub owner: Option<OwnerRef>,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// New record stamped with the current time
    pub fn new(category: Category, owner: Option<OwnerRef>, data: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            category,
            owner,
            data: strip_system_keys(data),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }

    /// Stored `createdBy` value in the category's shape
    pub fn stored_owner(&self) -> Option<Value> {
        self.owner
            .as_ref()
            .and_then(|owner| owner.to_stored(self.category.owner_field()))
    }

    /// The record as one flat document, the form used for snapshots and sizing
    pub fn to_document(&self) -> Value {
        let mut doc = Map::with_capacity(self.data.len() + SYSTEM_KEYS.len());
        doc.insert("id".to_string(), Value::String(self.id.to_string()));
        for (key, value) in &self.data {
            doc.insert(key.clone(), value.clone());
        }
        if let Some(owner) = self.stored_owner() {
            doc.insert("createdBy".to_string(), owner);
        }
        doc.insert("createdAt".to_string(), Value::String(self.created_at.to_rfc3339()));
        doc.insert("updatedAt".to_string(), Value::String(self.updated_at.to_rfc3339()));
        Value::Object(doc)
    }

    /// Convert a database row, normalizing the owner reference
    pub fn from_row(row: RecordRow) -> Result<Self> {
        let category = Category::from_key(&row.category).ok_or_else(|| AppError::Internal {
            message: format!("Record {} has unknown category '{}'", row.id, row.category),
        })?;
        let data = match row.data {
            Value::Object(map) => map,
            other => {
                return Err(AppError::Internal {
                    message: format!("Record {} data is not an object: {}", row.id, other),
                })
            }
        };

        Ok(Self {
            id: row.id,
            category,
            owner: row.created_by.as_ref().and_then(OwnerRef::from_stored),
            data,
            created_at: row.created_at.with_timezone(&Utc),
            updated_at: row.updated_at.with_timezone(&Utc),
        })
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

/// Drop keys that would shadow record system fields
pub fn strip_system_keys(mut data: Map<String, Value>) -> Map<String, Value> {
    for key in SYSTEM_KEYS {
        data.remove(key);
    }
    data.remove("_id");
    data
}
