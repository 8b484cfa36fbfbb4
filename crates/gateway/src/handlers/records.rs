//! Per-category record handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::AppState;
use coe_common::{
    auth::Caller,
    db::Record,
    errors::{AppError, Result},
    records::{self, ListQuery},
    registry::Category,
};

/// Query parameter toggling a director's view to their own records
const ONLY_MINE_PARAM: &str = "onlyMine";

fn category(key: &str) -> Result<Category> {
    Category::from_key(key).ok_or_else(|| AppError::NotFound {
        resource_type: "category".to_string(),
        id: key.to_string(),
    })
}

/// Split `onlyMine` from the remaining exact-match filters
fn list_query(mut params: HashMap<String, String>) -> Result<ListQuery> {
    let only_mine = match params.remove(ONLY_MINE_PARAM).as_deref() {
        None | Some("") => None,
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(other) => {
            return Err(AppError::InvalidArgument {
                message: format!("{} must be true or false, got '{}'", ONLY_MINE_PARAM, other),
            })
        }
    };

    let filters: Map<String, Value> = params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    Ok(ListQuery { only_mine, filters })
}

/// GET /records/{category}
pub async fn list_records(
    State(state): State<AppState>,
    caller: Caller,
    Path(key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Record>>> {
    let category = category(&key)?;
    let query = list_query(params)?;
    let records = records::list_records(&*state.store, &caller, category, &query).await?;
    Ok(Json(records))
}

/// POST /records/{category}
pub async fn create_record(
    State(state): State<AppState>,
    caller: Caller,
    Path(key): Path<String>,
    Json(data): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Record>)> {
    let category = category(&key)?;
    let record = records::create_record(&*state.store, &caller, category, data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /records/{category}/{id}
pub async fn get_record(
    State(state): State<AppState>,
    caller: Caller,
    Path((key, id)): Path<(String, Uuid)>,
) -> Result<Json<Record>> {
    let category = category(&key)?;
    let record = records::get_record(&*state.store, &caller, category, id).await?;
    Ok(Json(record))
}

/// PUT /records/{category}/{id}
pub async fn update_record(
    State(state): State<AppState>,
    caller: Caller,
    Path((key, id)): Path<(String, Uuid)>,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Json<Record>> {
    let category = category(&key)?;
    let record = records::update_record(&*state.store, &caller, category, id, changes).await?;
    Ok(Json(record))
}

/// DELETE /records/{category}/{id}
pub async fn delete_record(
    State(state): State<AppState>,
    caller: Caller,
    Path((key, id)): Path<(String, Uuid)>,
) -> Result<StatusCode> {
    let category = category(&key)?;
    records::delete_record(&*state.store, &caller, category, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
