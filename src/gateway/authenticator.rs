// =====================================================
// 会话认证器
// =====================================================

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{TokenKind, TokenService};
use crate::gateway::protocol::ServerEvent;
use crate::gateway::session::ConnectionSession;
use crate::repository::DeviceDirectory;

/// 会话认证器
///
/// 验证设备凭证并推进会话状态机。凭证为携带 device_id
/// 声明的签名令牌，校验通过后还要确认设备确实存在并
/// 属于令牌所声明的用户，缺一不可。
///
/// 所有失败都回以 `authError` 且不改变会话状态，
/// 连接保持打开，允许客户端重试。
pub struct SessionAuthenticator {
    token_service: Arc<TokenService>,
    devices: Arc<dyn DeviceDirectory>,
}

impl SessionAuthenticator {
    pub fn new(token_service: Arc<TokenService>, devices: Arc<dyn DeviceDirectory>) -> Self {
        Self {
            token_service,
            devices,
        }
    }

    /// 处理 authenticate 事件
    pub async fn authenticate(
        &self,
        session: &mut ConnectionSession,
        credential: &str,
    ) -> ServerEvent {
        if session.is_authenticated() {
            warn!("⚠️ 已认证连接上收到重复认证请求");
            return ServerEvent::auth_error("Already authenticated");
        }

        if session.is_closed() {
            return ServerEvent::auth_error("Connection closed");
        }

        if credential.trim().is_empty() {
            return ServerEvent::auth_error("Invalid token");
        }

        let claims = match self.token_service.verify(credential, TokenKind::Access) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("❌ 设备凭证校验失败: {}", e);
                return ServerEvent::auth_error("Invalid token");
            }
        };

        // 普通访问令牌不携带 device_id，不能用于设备握手
        let device_id = match claims.device_id {
            Some(device_id) => device_id,
            None => {
                warn!("❌ 凭证缺少设备声明, user_id: {}", claims.sub);
                return ServerEvent::auth_error("Invalid token");
            }
        };

        match self.devices.find_owned_device(&device_id, &claims.sub).await {
            Ok(Some(_)) => {
                info!(
                    "✅ 设备认证成功, user_id: {}, device_id: {}",
                    claims.sub, device_id
                );
                *session = ConnectionSession::Authenticated {
                    user_id: claims.sub,
                    device_id,
                };
                ServerEvent::authenticated()
            }
            Ok(None) => {
                warn!(
                    "❌ 设备不存在或不属于该用户, user_id: {}, device_id: {}",
                    claims.sub, device_id
                );
                ServerEvent::auth_error("Device not found")
            }
            Err(e) => {
                warn!("❌ 设备查询失败: {}", e);
                ServerEvent::auth_error("Authentication failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Device;
    use crate::repository::MemoryDeviceDirectory;

    fn token_service() -> Arc<TokenService> {
        Arc::new(TokenService::new(
            "test-access-secret-0123456789",
            "test-refresh-secret-0123456789",
            3600,
            5 * 24 * 3600,
            30 * 24 * 3600,
        ))
    }

    async fn seeded_directory(user_id: &str) -> (Arc<MemoryDeviceDirectory>, String) {
        let devices = Arc::new(MemoryDeviceDirectory::new());
        let device = Device::new(user_id.to_string(), "Thermostat".into(), "sensor".into());
        let device_id = device.id.clone();
        devices.create(&device).await.unwrap();
        (devices, device_id)
    }

    #[tokio::test]
    async fn test_valid_credential_transitions_to_authenticated() {
        let tokens = token_service();
        let (devices, device_id) = seeded_directory("user-1").await;
        let authenticator = SessionAuthenticator::new(tokens.clone(), devices);

        let credential = tokens.issue_device_token("user-1", &device_id).unwrap();
        let mut session = ConnectionSession::new();

        let reply = authenticator.authenticate(&mut session, &credential).await;

        assert_eq!(reply, ServerEvent::authenticated());
        assert_eq!(session.identity(), Some(("user-1", device_id.as_str())));
    }

    #[tokio::test]
    async fn test_garbage_credential_keeps_session_unauthenticated() {
        let tokens = token_service();
        let (devices, _) = seeded_directory("user-1").await;
        let authenticator = SessionAuthenticator::new(tokens, devices);

        let mut session = ConnectionSession::new();
        let reply = authenticator
            .authenticate(&mut session, "not-a-token")
            .await;

        assert_eq!(reply, ServerEvent::auth_error("Invalid token"));
        assert_eq!(session, ConnectionSession::Unauthenticated);
    }

    #[tokio::test]
    async fn test_access_token_without_device_claim_rejected() {
        let tokens = token_service();
        let (devices, _) = seeded_directory("user-1").await;
        let authenticator = SessionAuthenticator::new(tokens.clone(), devices);

        // 登录用的访问令牌不带 device_id，不能握手
        let credential = tokens.issue_access("user-1").unwrap();
        let mut session = ConnectionSession::new();

        let reply = authenticator.authenticate(&mut session, &credential).await;

        assert_eq!(reply, ServerEvent::auth_error("Invalid token"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_foreign_device_rejected() {
        let tokens = token_service();
        let (devices, device_id) = seeded_directory("owner").await;
        let authenticator = SessionAuthenticator::new(tokens.clone(), devices);

        // 令牌声明的用户不是设备的所有者
        let credential = tokens.issue_device_token("intruder", &device_id).unwrap();
        let mut session = ConnectionSession::new();

        let reply = authenticator.authenticate(&mut session, &credential).await;

        assert_eq!(reply, ServerEvent::auth_error("Device not found"));
        assert_eq!(session, ConnectionSession::Unauthenticated);
    }

    #[tokio::test]
    async fn test_reauthentication_rejected() {
        let tokens = token_service();
        let (devices, device_id) = seeded_directory("user-1").await;
        let authenticator = SessionAuthenticator::new(tokens.clone(), devices);

        let credential = tokens.issue_device_token("user-1", &device_id).unwrap();
        let mut session = ConnectionSession::new();
        authenticator.authenticate(&mut session, &credential).await;

        let reply = authenticator.authenticate(&mut session, &credential).await;

        assert_eq!(reply, ServerEvent::auth_error("Already authenticated"));
        assert_eq!(session.identity(), Some(("user-1", device_id.as_str())));
    }
}
