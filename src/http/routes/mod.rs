//! HTTP 路由模块
//!
//! 路由结构：
//! - `/` - 健康检查
//! - `/api/auth/*` - 注册、登录、刷新、登出
//! - `/api/devices/*` - 设备管理与设备凭证签发（需要访问令牌）
//! - `/api/deviceData/{deviceId}` - 遥测范围查询（需要访问令牌）
//! - `/ws` - 设备持久连接入口

pub mod auth;
pub mod data;
pub mod device;
pub mod ws;

use axum::{routing::get, Router};

use crate::http::HttpServerState;

/// 创建所有路由
pub fn create_routes() -> Router<HttpServerState> {
    Router::new()
        .route("/", get(health_handler))
        .merge(auth::create_route())
        .merge(device::create_route())
        .merge(data::create_route())
        .merge(ws::create_route())
}

/// 健康检查
async fn health_handler() -> &'static str {
    "IoT Gateway is running"
}
