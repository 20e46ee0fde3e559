//! 设备管理路由

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ServerError};
use crate::http::middleware::AuthUser;
use crate::http::HttpServerState;
use crate::model::{Device, DeviceStatus};

#[derive(Debug, Deserialize)]
pub struct CreateDeviceRequest {
    #[serde(default, rename = "deviceName")]
    pub device_name: String,
    #[serde(default, rename = "deviceType")]
    pub device_type: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeviceRequest {
    #[serde(default, rename = "deviceName")]
    pub device_name: Option<String>,
    #[serde(default, rename = "deviceType")]
    pub device_type: Option<String>,
    #[serde(default, rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub status: Option<DeviceStatus>,
}

#[derive(Debug, Serialize)]
pub struct DeviceTokenResponse {
    pub token: String,
}

pub fn create_route() -> Router<HttpServerState> {
    Router::new()
        .route("/api/devices", post(create_handler).get(list_handler))
        .route(
            "/api/devices/{device_id}",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .route("/api/devices/{device_id}/token", post(token_handler))
}

/// POST /api/devices
async fn create_handler(
    user: AuthUser,
    State(state): State<HttpServerState>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<impl IntoResponse> {
    if req.device_name.trim().is_empty() || req.device_type.trim().is_empty() {
        return Err(ServerError::Validation(
            "deviceName and deviceType are required".to_string(),
        ));
    }

    let device = Device::new(user.user_id, req.device_name, req.device_type);
    state.devices.create(&device).await?;

    info!("✅ 设备注册成功, device_id: {}", device.id);
    Ok((StatusCode::CREATED, Json(device)))
}

/// GET /api/devices
async fn list_handler(
    user: AuthUser,
    State(state): State<HttpServerState>,
) -> Result<impl IntoResponse> {
    let devices = state.devices.list_by_user(&user.user_id).await?;
    Ok(Json(devices))
}

/// GET /api/devices/{device_id}
async fn get_handler(
    user: AuthUser,
    State(state): State<HttpServerState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse> {
    let device = state
        .devices
        .find_owned_device(&device_id, &user.user_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Device not found".to_string()))?;

    Ok(Json(device))
}

/// PUT /api/devices/{device_id}
async fn update_handler(
    user: AuthUser,
    State(state): State<HttpServerState>,
    Path(device_id): Path<String>,
    Json(req): Json<UpdateDeviceRequest>,
) -> Result<impl IntoResponse> {
    let mut device = state
        .devices
        .find_owned_device(&device_id, &user.user_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Device not found".to_string()))?;

    if let Some(device_name) = req.device_name {
        device.device_name = device_name;
    }
    if let Some(device_type) = req.device_type {
        device.device_type = device_type;
    }
    if let Some(is_active) = req.is_active {
        device.is_active = is_active;
    }
    if let Some(status) = req.status {
        device.status = status;
    }

    state.devices.update(&device).await?;
    Ok(Json(device))
}

/// DELETE /api/devices/{device_id}
async fn delete_handler(
    user: AuthUser,
    State(state): State<HttpServerState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse> {
    let deleted = state.devices.delete(&device_id, &user.user_id).await?;
    if !deleted {
        return Err(ServerError::NotFound("Device not found".to_string()));
    }

    info!("🗑️ 设备已删除, device_id: {}", device_id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/devices/{device_id}/token
///
/// 为自己名下的设备签发连接凭证
async fn token_handler(
    user: AuthUser,
    State(state): State<HttpServerState>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse> {
    state
        .devices
        .find_owned_device(&device_id, &user.user_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Device not found".to_string()))?;

    let token = state
        .token_service
        .issue_device_token(&user.user_id, &device_id)?;

    Ok(Json(DeviceTokenResponse { token }))
}
