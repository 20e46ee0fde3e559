//! 设备持久连接入口

use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::gateway;
use crate::http::HttpServerState;

pub fn create_route() -> Router<HttpServerState> {
    Router::new().route("/ws", get(ws_handler))
}

/// GET /ws
///
/// 升级为持久连接后交给网关的连接循环，
/// 握手（authenticate 事件）在连接内完成。
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<HttpServerState>,
) -> impl IntoResponse {
    let ctx = state.gateway.clone();
    ws.on_upgrade(move |socket| gateway::handle_socket(socket, ctx))
}
