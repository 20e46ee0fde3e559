// =====================================================
// 遥测接入
// =====================================================

use std::sync::Arc;

use tracing::{debug, warn};

use crate::gateway::protocol::ServerEvent;
use crate::gateway::session::ConnectionSession;
use crate::model::TelemetryRecord;
use crate::repository::{DeviceDirectory, TelemetryStore};

/// 遥测接入网关
///
/// 遥测只有在会话已认证时才会被接收，且每条消息都按会话
/// 绑定的 (user_id, device_id) 重做一次归属检查，认证后被
/// 删除或转移的设备在下一条消息即被拒绝。
///
/// 接收成功会触发两个独立写入：设备触达（last_seen/status）
/// 和遥测持久化。两者之间没有补偿回滚，任一失败都以
/// `deviceError` 上报。
pub struct IngestGateway {
    devices: Arc<dyn DeviceDirectory>,
    telemetry: Arc<dyn TelemetryStore>,
}

impl IngestGateway {
    pub fn new(devices: Arc<dyn DeviceDirectory>, telemetry: Arc<dyn TelemetryStore>) -> Self {
        Self { devices, telemetry }
    }

    /// 处理 deviceData 事件
    pub async fn ingest(
        &self,
        session: &ConnectionSession,
        data: serde_json::Value,
    ) -> ServerEvent {
        let (user_id, device_id) = match session.identity() {
            Some(identity) => identity,
            None => {
                warn!("❌ 未认证连接尝试上报遥测");
                return ServerEvent::device_error("Device not authenticated");
            }
        };

        // 每条消息重做归属检查
        match self.devices.find_owned_device(device_id, user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(
                    "❌ 遥测被拒绝, 设备已不属于该用户, user_id: {}, device_id: {}",
                    user_id, device_id
                );
                return ServerEvent::device_error("Device not found");
            }
            Err(e) => {
                warn!("❌ 遥测归属检查失败: {}", e);
                return ServerEvent::device_error("Failed to save data");
            }
        }

        if let Err(e) = self.devices.touch_last_seen(device_id).await {
            warn!("❌ 设备触达更新失败, device_id: {}, 错误: {}", device_id, e);
            return ServerEvent::device_error("Failed to save data");
        }

        let record = TelemetryRecord::now(device_id.to_string(), user_id.to_string(), data);
        if let Err(e) = self.telemetry.insert(&record).await {
            warn!("❌ 遥测写入失败, device_id: {}, 错误: {}", device_id, e);
            return ServerEvent::device_error("Failed to save data");
        }

        debug!("📥 遥测已接收, device_id: {}", device_id);
        ServerEvent::ack()
    }
}
