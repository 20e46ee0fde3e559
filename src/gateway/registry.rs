// =====================================================
// 活跃连接注册表
// =====================================================

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// 单个活跃连接的登记信息
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// 认证后绑定的用户ID
    pub user_id: Option<String>,
    /// 认证后绑定的设备ID
    pub device_id: Option<String>,
    /// 连接建立时间
    pub connected_at: DateTime<Utc>,
}

/// 活跃连接注册表
///
/// 键为连接ID（每个连接随机生成）。注册表只做登记和计数，
/// 会话状态本身归连接处理任务独占。
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionInfo>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// 登记新连接（未认证）
    pub fn register(&self, connection_id: &str) {
        self.connections.insert(
            connection_id.to_string(),
            ConnectionInfo {
                user_id: None,
                device_id: None,
                connected_at: Utc::now(),
            },
        );
    }

    /// 标记连接已认证
    pub fn mark_authenticated(&self, connection_id: &str, user_id: &str, device_id: &str) {
        if let Some(mut info) = self.connections.get_mut(connection_id) {
            info.user_id = Some(user_id.to_string());
            info.device_id = Some(device_id.to_string());
        }
    }

    /// 注销连接
    pub fn unregister(&self, connection_id: &str) {
        self.connections.remove(connection_id);
    }

    /// 当前活跃连接数
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// 某用户名下的活跃连接数
    pub fn count_for_user(&self, user_id: &str) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().user_id.as_deref() == Some(user_id))
            .count()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
