//! 存储接口
//!
//! 核心逻辑只通过这里的窄接口访问持久化：用户仓库（凭证校验的底座）、
//! 设备目录（归属检查与活跃状态）、遥测存储。
//! 每个接口有 PostgreSQL 实现和内存实现，后者用于测试和无数据库部署。

pub mod device_repo;
pub mod memory;
pub mod telemetry_repo;
pub mod user_repo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Device, TelemetryRecord, User};

/// 用户仓库
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 创建用户；邮箱重复时返回 Conflict
    async fn create(&self, user: &User) -> Result<()>;

    /// 按邮箱查找
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// 按ID查找
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>>;
}

/// 设备目录
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// 注册设备
    async fn create(&self, device: &Device) -> Result<()>;

    /// 查找某用户名下的设备；设备存在但属于他人时同样返回 None
    async fn find_owned_device(&self, device_id: &str, user_id: &str) -> Result<Option<Device>>;

    /// 列出用户的所有设备
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Device>>;

    /// 遥测触达：last_seen = now, status = online
    async fn touch_last_seen(&self, device_id: &str) -> Result<()>;

    /// 更新设备记录（同文档最后写入为准）
    async fn update(&self, device: &Device) -> Result<()>;

    /// 删除某用户名下的设备；返回是否删除了记录
    async fn delete(&self, device_id: &str, user_id: &str) -> Result<bool>;
}

/// 遥测存储
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// 写入一条遥测记录
    async fn insert(&self, record: &TelemetryRecord) -> Result<()>;

    /// 按时间范围查询（升序）
    async fn find_range(
        &self,
        device_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TelemetryRecord>>;
}

pub use device_repo::PgDeviceDirectory;
pub use memory::{MemoryDeviceDirectory, MemoryTelemetryStore, MemoryUserRepository};
pub use telemetry_repo::PgTelemetryStore;
pub use user_repo::PgUserRepository;
