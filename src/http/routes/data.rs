//! 遥测查询路由

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::error::{Result, ServerError};
use crate::http::middleware::AuthUser;
use crate::http::HttpServerState;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(default, rename = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
}

pub fn create_route() -> Router<HttpServerState> {
    Router::new().route("/api/deviceData/{device_id}", get(range_handler))
}

/// GET /api/deviceData/{device_id}?startDate=...&endDate=...
///
/// 默认查询窗口为最近一小时
async fn range_handler(
    user: AuthUser,
    State(state): State<HttpServerState>,
    Path(device_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse> {
    state
        .devices
        .find_owned_device(&device_id, &user.user_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Device not found".to_string()))?;

    let end = query.end_date.unwrap_or_else(Utc::now);
    let start = query.start_date.unwrap_or_else(|| end - Duration::hours(1));

    if start > end {
        return Err(ServerError::Validation(
            "startDate must be before endDate".to_string(),
        ));
    }

    let records = state.telemetry.find_range(&device_id, start, end).await?;
    if records.is_empty() {
        return Err(ServerError::NotFound(
            "No data found for the given time range".to_string(),
        ));
    }

    Ok(Json(records))
}
