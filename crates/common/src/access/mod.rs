//! Ownership predicate and visibility resolution
//!
//! `can_access` guards reads and writes of a single record; `resolve_scope`
//! decides whether a listing is filtered to the caller's own records.

use crate::auth::Caller;
use crate::db::{OwnerRef, Record, RecordFilter};
use crate::errors::{AppError, Result};
use uuid::Uuid;

/// Whether `caller` may view or mutate something owned by `owner`.
///
/// Directors always may. Anyone else only when the normalized owner id equals
/// their own; a missing owner fails closed.
pub fn can_access(caller: &Caller, owner: Option<&OwnerRef>) -> bool {
    caller.is_director() || owner.is_some_and(|o| o.is_user(caller.id))
}

pub fn can_access_record(caller: &Caller, record: &Record) -> bool {
    can_access(caller, record.owner.as_ref())
}

/// Fail with 403 unless the caller may access the record
pub fn ensure_record_access(caller: &Caller, record: &Record) -> Result<()> {
    if can_access_record(caller, record) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Not allowed to access {} record {}",
            record.category.display_name(),
            record.id
        )))
    }
}

/// Which records a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Everything,
    OwnedBy(Uuid),
}

impl Scope {
    pub fn owner(&self) -> Option<Uuid> {
        match self {
            Scope::Everything => None,
            Scope::OwnedBy(id) => Some(*id),
        }
    }

    /// Base filter for a repository query
    pub fn filter(&self) -> RecordFilter {
        match self {
            Scope::Everything => RecordFilter::all(),
            Scope::OwnedBy(id) => RecordFilter::owned_by(*id),
        }
    }
}

/// Directors see everything unless they explicitly ask for only their own
/// records; everyone else is always filtered to their own.
pub fn resolve_scope(caller: &Caller, only_mine: Option<bool>) -> Scope {
    if caller.is_director() && only_mine != Some(true) {
        Scope::Everything
    } else {
        Scope::OwnedBy(caller.id)
    }
}
