//! Normalized owner reference
//!
//! Older categories store `createdBy` as a bare user id, newer ones as an
//! embedded `{id, name, email}` snapshot. Both shapes are read into
//! [`OwnerRef`] at the repository boundary and written back per the
//! category's [`OwnerField`].

use crate::db::models::User;
use crate::registry::OwnerField;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl OwnerRef {
    /// Bare reference carrying only the id
    pub fn id_only(id: Uuid) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            email: None,
        }
    }

    /// Snapshot of a user account
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: Some(user.full_name()),
            email: Some(user.email.clone()),
        }
    }

    /// Read either stored shape. Returns `None` for missing or malformed values.
    pub fn from_stored(value: &Value) -> Option<Self> {
        match value {
            Value::String(id) => non_empty(id).map(|id| Self {
                id,
                name: None,
                email: None,
            }),
            Value::Object(map) => {
                let id = map
                    .get("id")
                    .or_else(|| map.get("_id"))
                    .and_then(Value::as_str)
                    .and_then(non_empty)?;
                Some(Self {
                    id,
                    name: map.get("name").and_then(Value::as_str).map(String::from),
                    email: map.get("email").and_then(Value::as_str).map(String::from),
                })
            }
            _ => None,
        }
    }

    /// Render in the shape a category stores
    pub fn to_stored(&self, field: OwnerField) -> Option<Value> {
        match field {
            OwnerField::Reference => Some(Value::String(self.id.clone())),
            OwnerField::Snapshot => Some(json!({
                "id": self.id,
                "name": self.name,
                "email": self.email,
            })),
            OwnerField::Absent => None,
        }
    }

    /// String comparison against a user id
    pub fn is_user(&self, user_id: Uuid) -> bool {
        self.id.eq_ignore_ascii_case(&user_id.to_string())
    }

    /// Normalized key for grouping by owner
    pub fn key(&self) -> String {
        self.id.to_ascii_lowercase()
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_bare_id() {
        let id = Uuid::new_v4();
        let owner = OwnerRef::from_stored(&json!(id.to_string())).unwrap();
        assert!(owner.is_user(id));
        assert_eq!(owner.name, None);
    }

    #[test]
    fn test_reads_embedded_snapshot() {
        let id = Uuid::new_v4();
        let stored = json!({"id": id.to_string(), "name": "Ada Lovelace", "email": "ada@coe.edu"});
        let owner = OwnerRef::from_stored(&stored).unwrap();
        assert!(owner.is_user(id));
        assert_eq!(owner.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(owner.email.as_deref(), Some("ada@coe.edu"));
    }

    #[test]
    fn test_malformed_values_fail_closed() {
        assert!(OwnerRef::from_stored(&Value::Null).is_none());
        assert!(OwnerRef::from_stored(&json!("")).is_none());
        assert!(OwnerRef::from_stored(&json!(42)).is_none());
        assert!(OwnerRef::from_stored(&json!({"name": "no id"})).is_none());
        assert!(OwnerRef::from_stored(&json!({"id": 7})).is_none());
    }

    #[test]
    fn test_comparison_ignores_case() {
        let id = Uuid::new_v4();
        let owner = OwnerRef::from_stored(&json!(id.to_string().to_uppercase())).unwrap();
        assert!(owner.is_user(id));
        assert!(!owner.is_user(Uuid::new_v4()));
    }

    #[test]
    fn test_stored_shapes() {
        let owner = OwnerRef {
            id: "abc".into(),
            name: Some("A".into()),
            email: None,
        };
        assert_eq!(owner.to_stored(OwnerField::Reference), Some(json!("abc")));
        assert_eq!(
            owner.to_stored(OwnerField::Snapshot),
            Some(json!({"id": "abc", "name": "A", "email": null}))
        );
        assert_eq!(owner.to_stored(OwnerField::Absent), None);
    }
}
