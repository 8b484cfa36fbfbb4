//! Data-usage analytics handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::AppState;
use coe_common::{
    auth::Caller,
    errors::Result,
    reporting::{self, AnalyticsSnapshot, TableAnalytics, UserAnalytics},
};

/// GET /analytics/data-usage (director only)
pub async fn data_usage(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<AnalyticsSnapshot>> {
    let snapshot = reporting::data_usage_analytics(&*state.store, &caller).await?;
    Ok(Json(snapshot))
}

/// GET /analytics/data-usage/table/{table_name} (director only)
pub async fn table_usage(
    State(state): State<AppState>,
    caller: Caller,
    Path(table_name): Path<String>,
) -> Result<Json<TableAnalytics>> {
    let analytics = reporting::table_analytics(&*state.store, &caller, &table_name).await?;
    Ok(Json(analytics))
}

/// GET /analytics/data-usage/user/{user_id} (director or the user)
pub async fn user_usage(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserAnalytics>> {
    let analytics = reporting::user_analytics(&*state.store, &caller, user_id).await?;
    Ok(Json(analytics))
}
