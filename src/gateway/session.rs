// =====================================================
// 连接会话状态
// =====================================================

use serde::{Deserialize, Serialize};

/// 连接会话状态（显式状态机）
///
/// 每个持久连接持有一个会话，由该连接的处理任务独占，
/// 不跨连接共享。认证字段不再散落在连接对象上，
/// 而是显式地跟随状态变体。
///
/// ```text
/// Unauthenticated --authenticate(凭证有效)--> Authenticated{user_id, device_id}
/// Unauthenticated --authenticate(凭证无效)--> Unauthenticated（连接保持打开）
/// 任意状态 --disconnect--> Closed（终态）
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionSession {
    /// 初始状态：尚未握手，任何遥测都会被拒绝
    Unauthenticated,

    /// 已绑定到一个 (用户, 设备) 对
    Authenticated {
        user_id: String,
        device_id: String,
    },

    /// 连接已断开（终态）；断线后不保留任何会话状态，
    /// 设备重连必须重新认证
    Closed,
}

impl ConnectionSession {
    /// 新连接的初始状态
    pub fn new() -> Self {
        ConnectionSession::Unauthenticated
    }

    /// 是否允许接收遥测
    pub fn is_authenticated(&self) -> bool {
        matches!(self, ConnectionSession::Authenticated { .. })
    }

    /// 认证后绑定的 (user_id, device_id)
    pub fn identity(&self) -> Option<(&str, &str)> {
        match self {
            ConnectionSession::Authenticated { user_id, device_id } => {
                Some((user_id.as_str(), device_id.as_str()))
            }
            _ => None,
        }
    }

    /// 断开连接，进入终态
    pub fn close(&mut self) {
        *self = ConnectionSession::Closed;
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionSession::Closed)
    }
}

impl Default for ConnectionSession {
    fn default() -> Self {
        Self::new()
    }
}
