//! 内存存储实现
//!
//! 用于测试和无数据库的单实例部署。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{Result, ServerError};
use crate::model::{Device, DeviceStatus, TelemetryRecord, User};
use crate::repository::{DeviceDirectory, TelemetryStore, UserRepository};

/// 内存用户仓库
pub struct MemoryUserRepository {
    /// 存储：user_id -> User
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(ServerError::Conflict("User already exists".to_string()));
        }

        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }
}

/// 内存设备目录
pub struct MemoryDeviceDirectory {
    /// 存储：device_id -> Device
    devices: Arc<RwLock<HashMap<String, Device>>>,
}

impl MemoryDeviceDirectory {
    pub fn new() -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryDeviceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceDirectory for MemoryDeviceDirectory {
    async fn create(&self, device: &Device) -> Result<()> {
        let mut devices = self.devices.write().await;
        devices.insert(device.id.clone(), device.clone());
        Ok(())
    }

    async fn find_owned_device(&self, device_id: &str, user_id: &str) -> Result<Option<Device>> {
        let devices = self.devices.read().await;
        Ok(devices
            .get(device_id)
            .filter(|d| d.user_id == user_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Device>> {
        let devices = self.devices.read().await;
        let mut list: Vec<Device> = devices
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    async fn touch_last_seen(&self, device_id: &str) -> Result<()> {
        let mut devices = self.devices.write().await;

        let device = devices
            .get_mut(device_id)
            .ok_or_else(|| ServerError::NotFound(format!("设备不存在: {}", device_id)))?;

        device.last_seen = Utc::now();
        device.status = DeviceStatus::Online;
        Ok(())
    }

    async fn update(&self, device: &Device) -> Result<()> {
        let mut devices = self.devices.write().await;

        if !devices.contains_key(&device.id) {
            return Err(ServerError::NotFound(format!("设备不存在: {}", device.id)));
        }

        devices.insert(device.id.clone(), device.clone());
        Ok(())
    }

    async fn delete(&self, device_id: &str, user_id: &str) -> Result<bool> {
        let mut devices = self.devices.write().await;

        let owned = devices
            .get(device_id)
            .map(|d| d.user_id == user_id)
            .unwrap_or(false);

        if owned {
            devices.remove(device_id);
        }
        Ok(owned)
    }
}

/// 内存遥测存储
pub struct MemoryTelemetryStore {
    records: Arc<RwLock<Vec<TelemetryRecord>>>,
}

impl MemoryTelemetryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for MemoryTelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetryStore for MemoryTelemetryStore {
    async fn insert(&self, record: &TelemetryRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.push(record.clone());
        Ok(())
    }

    async fn find_range(
        &self,
        device_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TelemetryRecord>> {
        let records = self.records.read().await;
        let mut matched: Vec<TelemetryRecord> = records
            .iter()
            .filter(|r| r.device_id == device_id && r.timestamp >= from && r.timestamp <= to)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_device(user_id: &str) -> Device {
        Device::new(user_id.to_string(), "Sensor".to_string(), "thermostat".to_string())
    }

    #[tokio::test]
    async fn test_duplicate_email_conflict() {
        let repo = MemoryUserRepository::new();

        let user = User::new("alice".into(), "alice@example.com".into(), "hash".into());
        repo.create(&user).await.unwrap();

        let dup = User::new("alice2".into(), "alice@example.com".into(), "hash".into());
        assert!(matches!(
            repo.create(&dup).await,
            Err(ServerError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_find_owned_device_checks_owner() {
        let dir = MemoryDeviceDirectory::new();

        let device = test_device("user-1");
        dir.create(&device).await.unwrap();

        assert!(dir.find_owned_device(&device.id, "user-1").await.unwrap().is_some());
        // 设备存在但属于他人
        assert!(dir.find_owned_device(&device.id, "user-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_touch_last_seen_sets_online() {
        let dir = MemoryDeviceDirectory::new();

        let device = test_device("user-1");
        dir.create(&device).await.unwrap();

        dir.touch_last_seen(&device.id).await.unwrap();

        let updated = dir.find_owned_device(&device.id, "user-1").await.unwrap().unwrap();
        assert_eq!(updated.status, DeviceStatus::Online);
        assert!(updated.last_seen >= device.last_seen);
    }

    #[tokio::test]
    async fn test_telemetry_range_query() {
        let store = MemoryTelemetryStore::new();
        let now = Utc::now();

        for minutes_ago in [120, 30, 5] {
            let mut record = TelemetryRecord::now(
                "device-1".into(),
                "user-1".into(),
                serde_json::json!({ "temperature": 22 }),
            );
            record.timestamp = now - Duration::minutes(minutes_ago);
            store.insert(&record).await.unwrap();
        }

        let found = store
            .find_range("device-1", now - Duration::hours(1), now)
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert!(found[0].timestamp <= found[1].timestamp);
    }
}
