//! Single-account activity report handler

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::decode;
use crate::AppState;
use coe_common::{
    auth::Caller,
    errors::Result,
    reporting::{build_account_report, AccountReport},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReportRequest {
    pub account_id: Uuid,
    #[serde(default)]
    pub detailed: bool,
}

/// POST /auth/account-report
pub async fn account_report(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<Value>,
) -> Result<Json<AccountReport>> {
    let request: AccountReportRequest = decode(body)?;
    let report =
        build_account_report(&*state.store, &caller, request.account_id, request.detailed).await?;
    Ok(Json(report))
}
