use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 遥测记录
///
/// data 是设备上报的开放字段集合（例如 { "temperature": 22, "humidity": 50 }），
/// 不对具体设备的负载做静态建模。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// 上报设备ID
    pub device_id: String,

    /// 设备所属用户ID
    pub user_id: String,

    /// 上报负载（不透明 JSON 对象）
    pub data: serde_json::Value,

    /// 服务端接收时间
    pub timestamp: DateTime<Utc>,
}

impl TelemetryRecord {
    /// 以当前时间创建遥测记录
    pub fn now(device_id: String, user_id: String, data: serde_json::Value) -> Self {
        Self {
            device_id,
            user_id,
            data,
            timestamp: Utc::now(),
        }
    }
}
