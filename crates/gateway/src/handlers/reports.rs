//! Custom report handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use super::decode;
use crate::AppState;
use coe_common::{
    auth::Caller,
    db::models::CustomReport,
    errors::Result,
    reporting::{self, CreateReportInput, UpdateReportInput},
};

/// POST /reports
pub async fn create_report(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<CustomReport>)> {
    let input: CreateReportInput = decode(body)?;
    let report = reporting::create_report(&*state.store, &caller, input).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /reports
pub async fn list_reports(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<CustomReport>>> {
    let reports = reporting::list_reports(&*state.store, &caller).await?;
    Ok(Json(reports))
}

/// GET /reports/{id}
pub async fn get_report(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomReport>> {
    let report = reporting::get_report(&*state.store, &caller, id).await?;
    Ok(Json(report))
}

/// PUT /reports/{id}
pub async fn update_report(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<CustomReport>> {
    let input: UpdateReportInput = decode(body)?;
    let report = reporting::update_report(&*state.store, &caller, id, input).await?;
    Ok(Json(report))
}

/// DELETE /reports/{id}
pub async fn delete_report(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    reporting::delete_report(&*state.store, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
