//! 设备目录 - PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::{Result, ServerError};
use crate::model::{Device, DeviceStatus};
use crate::repository::DeviceDirectory;

/// 设备目录 (PostgreSQL 实现)
#[derive(Clone)]
pub struct PgDeviceDirectory {
    pool: Arc<PgPool>,
}

impl PgDeviceDirectory {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DeviceRow {
    id: String,
    user_id: String,
    device_name: String,
    device_type: String,
    is_active: bool,
    status: String,
    last_seen: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<DeviceRow> for Device {
    type Error = ServerError;

    fn try_from(r: DeviceRow) -> Result<Self> {
        // 未知状态说明行已损坏或迁移缺失，不静默归为离线
        let status = DeviceStatus::from_str(&r.status).ok_or_else(|| {
            ServerError::Database(format!("Unknown device status '{}' for device {}", r.status, r.id))
        })?;

        Ok(Device {
            id: r.id,
            user_id: r.user_id,
            device_name: r.device_name,
            device_type: r.device_type,
            is_active: r.is_active,
            status,
            last_seen: r.last_seen,
            created_at: r.created_at,
        })
    }
}

const DEVICE_COLUMNS: &str =
    "id, user_id, device_name, device_type, is_active, status, last_seen, created_at";

#[async_trait]
impl DeviceDirectory for PgDeviceDirectory {
    async fn create(&self, device: &Device) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO iotgate_devices
                (id, user_id, device_name, device_type, is_active, status, last_seen, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&device.id)
        .bind(&device.user_id)
        .bind(&device.device_name)
        .bind(&device.device_type)
        .bind(device.is_active)
        .bind(device.status.as_str())
        .bind(device.last_seen)
        .bind(device.created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| ServerError::Database(format!("Failed to insert device: {}", e)))?;

        Ok(())
    }

    async fn find_owned_device(&self, device_id: &str, user_id: &str) -> Result<Option<Device>> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM iotgate_devices WHERE id = $1 AND user_id = $2"
        ))
        .bind(device_id)
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| ServerError::Database(format!("Failed to query device: {}", e)))?;

        row.map(Device::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Device>> {
        let rows = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM iotgate_devices WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(|e| ServerError::Database(format!("Failed to list devices: {}", e)))?;

        rows.into_iter().map(Device::try_from).collect()
    }

    async fn touch_last_seen(&self, device_id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE iotgate_devices SET last_seen = NOW(), status = 'online' WHERE id = $1",
        )
        .bind(device_id)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| ServerError::Database(format!("Failed to touch device: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound(format!("设备不存在: {}", device_id)));
        }
        Ok(())
    }

    async fn update(&self, device: &Device) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE iotgate_devices
            SET device_name = $2, device_type = $3, is_active = $4, status = $5, last_seen = $6
            WHERE id = $1
            "#,
        )
        .bind(&device.id)
        .bind(&device.device_name)
        .bind(&device.device_type)
        .bind(device.is_active)
        .bind(device.status.as_str())
        .bind(device.last_seen)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| ServerError::Database(format!("Failed to update device: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound(format!("设备不存在: {}", device.id)));
        }
        Ok(())
    }

    async fn delete(&self, device_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM iotgate_devices WHERE id = $1 AND user_id = $2")
            .bind(device_id)
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| ServerError::Database(format!("Failed to delete device: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
