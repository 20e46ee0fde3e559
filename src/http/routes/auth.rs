//! 认证路由

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::http::middleware::AuthUser;
use crate::http::HttpServerState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default, rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

pub fn create_route() -> Router<HttpServerState> {
    Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/refresh-token", post(refresh_handler))
        .route("/api/auth/logout", post(logout_handler))
}

/// POST /api/auth/register
async fn register_handler(
    State(state): State<HttpServerState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .auth_service
        .register(&req.username, &req.email, &req.password)
        .await?;

    info!("✅ 用户注册成功, user_id: {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login
async fn login_handler(
    State(state): State<HttpServerState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let pair = state.auth_service.login(&req.email, &req.password).await?;
    Ok(Json(pair))
}

/// POST /api/auth/refresh-token
async fn refresh_handler(
    State(state): State<HttpServerState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse> {
    let token = state.auth_service.refresh(&req.refresh_token).await?;
    Ok(Json(RefreshResponse { token }))
}

/// POST /api/auth/logout
async fn logout_handler(
    user: AuthUser,
    State(state): State<HttpServerState>,
) -> Result<impl IntoResponse> {
    state.auth_service.logout(&user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
