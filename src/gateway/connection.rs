// =====================================================
// 连接处理循环
// =====================================================

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::gateway::authenticator::SessionAuthenticator;
use crate::gateway::ingest::IngestGateway;
use crate::gateway::protocol::{ClientEvent, ServerEvent};
use crate::gateway::registry::ConnectionRegistry;
use crate::gateway::session::ConnectionSession;

/// 网关上下文
///
/// 所有连接共享的处理器集合，每个连接在自己的任务里
/// 持有私有的 ConnectionSession。
pub struct GatewayContext {
    pub authenticator: SessionAuthenticator,
    pub ingest: IngestGateway,
    pub registry: Arc<ConnectionRegistry>,
}

impl GatewayContext {
    pub fn new(
        authenticator: SessionAuthenticator,
        ingest: IngestGateway,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            authenticator,
            ingest,
            registry,
        }
    }

    /// 处理一条入站文本帧，返回应答帧
    ///
    /// 按会话状态路由：握手交给认证器，遥测交给接入网关。
    /// 不可解析的帧回以 deviceError，连接保持打开。
    pub async fn dispatch(&self, session: &mut ConnectionSession, frame: &str) -> ServerEvent {
        let event: ClientEvent = match serde_json::from_str(frame) {
            Ok(event) => event,
            Err(e) => {
                debug!("⚠️ 无法解析的帧: {}", e);
                return ServerEvent::device_error("Invalid message format");
            }
        };

        match event {
            ClientEvent::Authenticate(credential) => {
                self.authenticator.authenticate(session, &credential).await
            }
            ClientEvent::DeviceData(payload) => {
                self.ingest.ingest(session, payload.device_data).await
            }
        }
    }
}

/// 单个持久连接的接收循环
///
/// 连接生命周期：登记 -> 循环收帧/应答 -> 关闭时注销。
/// 协议层错误不断开连接，只有对端关闭或发送失败才退出循环。
pub async fn handle_socket(mut socket: WebSocket, ctx: Arc<GatewayContext>) {
    let connection_id = Uuid::new_v4().to_string();
    let mut session = ConnectionSession::new();

    ctx.registry.register(&connection_id);
    info!(
        "🔌 新连接, connection_id: {}, 活跃连接数: {}",
        connection_id,
        ctx.registry.len()
    );

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!("⚠️ 连接读取失败, connection_id: {}, 错误: {}", connection_id, e);
                break;
            }
        };

        match message {
            Message::Text(text) => {
                let reply = ctx.dispatch(&mut session, text.as_str()).await;

                if let ServerEvent::Authenticated { .. } = reply {
                    if let Some((user_id, device_id)) = session.identity() {
                        ctx.registry
                            .mark_authenticated(&connection_id, user_id, device_id);
                        info!(
                            "🔗 设备已绑定, user_id: {}, device_id: {}, 该用户活跃连接数: {}",
                            user_id,
                            device_id,
                            ctx.registry.count_for_user(user_id)
                        );
                    }
                }

                if socket
                    .send(Message::Text(reply.to_frame().into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Message::Close(_) => break,
            // Ping 由框架自动应答，二进制帧不属于协议
            _ => {}
        }
    }

    session.close();
    ctx.registry.unregister(&connection_id);
    info!(
        "🔌 连接断开, connection_id: {}, 活跃连接数: {}",
        connection_id,
        ctx.registry.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenService;
    use crate::model::Device;
    use crate::repository::{DeviceDirectory, MemoryDeviceDirectory, MemoryTelemetryStore};
    use serde_json::json;

    async fn test_context() -> (GatewayContext, Arc<TokenService>, String) {
        let tokens = Arc::new(TokenService::new(
            "test-access-secret-0123456789",
            "test-refresh-secret-0123456789",
            3600,
            5 * 24 * 3600,
            30 * 24 * 3600,
        ));

        let devices = Arc::new(MemoryDeviceDirectory::new());
        let telemetry = Arc::new(MemoryTelemetryStore::new());

        let device = Device::new("user-1".to_string(), "Thermostat".into(), "sensor".into());
        let device_id = device.id.clone();
        devices.create(&device).await.unwrap();

        let ctx = GatewayContext::new(
            SessionAuthenticator::new(tokens.clone(), devices.clone()),
            IngestGateway::new(devices, telemetry),
            Arc::new(ConnectionRegistry::new()),
        );
        (ctx, tokens, device_id)
    }

    #[tokio::test]
    async fn test_full_handshake_then_telemetry() {
        let (ctx, tokens, device_id) = test_context().await;
        let mut session = ConnectionSession::new();

        let credential = tokens.issue_device_token("user-1", &device_id).unwrap();
        let frame = json!({"event": "authenticate", "payload": credential}).to_string();
        let reply = ctx.dispatch(&mut session, &frame).await;
        assert_eq!(reply, ServerEvent::authenticated());

        let frame = json!({
            "event": "deviceData",
            "payload": {"deviceData": {"temperature": 22.0}}
        })
        .to_string();
        let reply = ctx.dispatch(&mut session, &frame).await;
        assert_eq!(reply, ServerEvent::ack());
    }

    #[tokio::test]
    async fn test_telemetry_before_handshake_rejected() {
        let (ctx, _, _) = test_context().await;
        let mut session = ConnectionSession::new();

        let frame = json!({
            "event": "deviceData",
            "payload": {"deviceData": {"temperature": 22.0}}
        })
        .to_string();
        let reply = ctx.dispatch(&mut session, &frame).await;

        assert_eq!(reply, ServerEvent::device_error("Device not authenticated"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_connection_state() {
        let (ctx, tokens, device_id) = test_context().await;
        let mut session = ConnectionSession::new();

        let credential = tokens.issue_device_token("user-1", &device_id).unwrap();
        let frame = json!({"event": "authenticate", "payload": credential}).to_string();
        ctx.dispatch(&mut session, &frame).await;

        let reply = ctx.dispatch(&mut session, "not json at all").await;
        assert_eq!(reply, ServerEvent::device_error("Invalid message format"));

        // 会话仍然已认证，后续遥测正常
        let frame = json!({
            "event": "deviceData",
            "payload": {"deviceData": {"humidity": 40}}
        })
        .to_string();
        assert_eq!(ctx.dispatch(&mut session, &frame).await, ServerEvent::ack());
    }
}
