//! HTTP 服务器 - 使用 Axum 提供认证、设备管理和遥测查询接口

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::auth::TokenService;
use crate::gateway::GatewayContext;
use crate::http::routes;
use crate::repository::{DeviceDirectory, TelemetryStore};
use crate::service::AuthService;

/// HTTP 服务共享状态
#[derive(Clone)]
pub struct HttpServerState {
    pub auth_service: Arc<AuthService>,
    pub token_service: Arc<TokenService>,
    pub devices: Arc<dyn DeviceDirectory>,
    pub telemetry: Arc<dyn TelemetryStore>,
    pub gateway: Arc<GatewayContext>,
}

/// 构建完整的应用路由
///
/// 独立成函数以便测试直接用 `tower::ServiceExt::oneshot` 驱动，
/// 不需要真实端口。
pub fn create_app(state: HttpServerState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
