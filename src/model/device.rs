use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 设备状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Maintenance,
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Maintenance => "maintenance",
            DeviceStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "online" => Some(DeviceStatus::Online),
            "offline" => Some(DeviceStatus::Offline),
            "maintenance" => Some(DeviceStatus::Maintenance),
            "error" => Some(DeviceStatus::Error),
            _ => None,
        }
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        DeviceStatus::Offline
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 设备记录
///
/// status 和 last_seen 由遥测接入路径更新，其余字段由设备管理接口维护。
/// 两条写路径互不协调，同文档以最后写入为准。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// 设备唯一ID (UUID)
    pub id: String,

    /// 所属用户ID
    pub user_id: String,

    /// 设备名称
    pub device_name: String,

    /// 设备类型 (如 "thermostat", "camera")
    pub device_type: String,

    /// 是否启用
    pub is_active: bool,

    /// 设备状态
    pub status: DeviceStatus,

    /// 最后活跃时间
    pub last_seen: DateTime<Utc>,

    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// 创建新设备（初始离线、未启用）
    pub fn new(user_id: String, device_name: String, device_type: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            device_name,
            device_type,
            is_active: false,
            status: DeviceStatus::Offline,
            last_seen: now,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            DeviceStatus::Online,
            DeviceStatus::Offline,
            DeviceStatus::Maintenance,
            DeviceStatus::Error,
        ] {
            assert_eq!(DeviceStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(DeviceStatus::from_str("rebooting"), None);
    }

    #[test]
    fn test_new_device_defaults() {
        let device = Device::new("u1".into(), "Sensor".into(), "thermostat".into());
        assert!(!device.is_active);
        assert_eq!(device.status, DeviceStatus::Offline);
    }
}
