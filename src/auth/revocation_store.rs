//! 刷新令牌撤销存储
//!
//! 按用户记录当前唯一有效的刷新令牌。写入是覆盖语义，
//! 同一用户的第二次写入会使上一个刷新令牌在查询时不再匹配，
//! 这是"每用户至多一个活跃刷新令牌"不变量的落点。
//!
//! TTL 由存储本身负责到期（moka 的逐条过期策略 / Redis 的 SETEX），
//! 不做应用层轮询清理——即使用户从不登出，被盗刷新令牌的
//! 可用窗口也被限定在令牌自身的有效期内。

use async_trait::async_trait;
use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use moka::future::Cache;
use moka::Expiry;
use redis::AsyncCommands;
use std::time::{Duration, Instant};

use crate::config::RedisConfig;
use crate::error::{Result, ServerError};

/// 撤销存储接口
///
/// key 是用户ID，value 是该用户当前有效的刷新令牌。
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// 写入（覆盖同一用户的已有条目）
    async fn set(&self, user_id: &str, refresh_token: &str, ttl_secs: u64) -> Result<()>;

    /// 查询；TTL 到期或已删除时返回 None
    async fn get(&self, user_id: &str) -> Result<Option<String>>;

    /// 显式撤销（登出）；删除不存在的 key 不算错误
    async fn del(&self, user_id: &str) -> Result<()>;
}

// ============================================================
// 内存实现（moka，逐条 TTL）
// ============================================================

/// 逐条过期策略：TTL 随条目一起存储
struct PerEntryTtl;

impl Expiry<String, (String, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(String, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// 内存撤销存储
///
/// 用于测试和无 Redis 的单实例部署。
pub struct MemoryRevocationStore {
    cache: Cache<String, (String, Duration)>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }
}

impl Default for MemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn set(&self, user_id: &str, refresh_token: &str, ttl_secs: u64) -> Result<()> {
        self.cache
            .insert(
                user_id.to_string(),
                (refresh_token.to_string(), Duration::from_secs(ttl_secs)),
            )
            .await;
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.cache.get(user_id).await.map(|(token, _)| token))
    }

    async fn del(&self, user_id: &str) -> Result<()> {
        self.cache.invalidate(user_id).await;
        Ok(())
    }
}

// ============================================================
// Redis 实现（bb8 连接池）
// ============================================================

/// Redis 撤销存储
pub struct RedisRevocationStore {
    pool: Pool<RedisConnectionManager>,
    /// 单条命令的执行超时
    command_timeout: Duration,
}

impl RedisRevocationStore {
    /// 创建并测试连接
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.clone())
            .map_err(|e| ServerError::Internal(format!("Failed to create Redis manager: {}", e)))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(config.connection_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .build(manager)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to create Redis pool: {}", e)))?;

        // 测试连接
        {
            let mut conn = pool.get().await.map_err(|e| {
                ServerError::Internal(format!("Failed to get Redis connection: {}", e))
            })?;

            let _: String = conn
                .ping()
                .await
                .map_err(|e| ServerError::Internal(format!("Redis ping failed: {}", e)))?;
        }

        tracing::info!(
            "✅ Redis 撤销存储已连接 (pool_size={}, conn_timeout={}s, cmd_timeout={}ms)",
            config.pool_size,
            config.connection_timeout_secs,
            config.command_timeout_ms,
        );

        Ok(Self {
            pool,
            command_timeout: config.command_timeout(),
        })
    }

    fn key(user_id: &str) -> String {
        format!("refresh_token:{}", user_id)
    }

    async fn get_conn(&self) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>> {
        self.pool.get().await.map_err(|e| {
            ServerError::Internal(format!("Failed to get Redis connection: {}", e))
        })
    }

    /// 执行带超时的 Redis 操作
    async fn with_timeout<F, T>(&self, op: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.command_timeout, op)
            .await
            .map_err(|_| {
                ServerError::Internal(format!(
                    "Redis command timeout ({}ms)",
                    self.command_timeout.as_millis()
                ))
            })?
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn set(&self, user_id: &str, refresh_token: &str, ttl_secs: u64) -> Result<()> {
        self.with_timeout(async {
            let mut conn = self.get_conn().await?;
            conn.set_ex::<_, _, ()>(Self::key(user_id), refresh_token, ttl_secs)
                .await
                .map_err(|e| ServerError::Internal(format!("Redis SETEX failed: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn get(&self, user_id: &str) -> Result<Option<String>> {
        self.with_timeout(async {
            let mut conn = self.get_conn().await?;
            let result: Option<String> = conn
                .get(Self::key(user_id))
                .await
                .map_err(|e| ServerError::Internal(format!("Redis GET failed: {}", e)))?;
            Ok(result)
        })
        .await
    }

    async fn del(&self, user_id: &str) -> Result<()> {
        self.with_timeout(async {
            let mut conn = self.get_conn().await?;
            conn.del::<_, ()>(Self::key(user_id))
                .await
                .map_err(|e| ServerError::Internal(format!("Redis DEL failed: {}", e)))?;
            Ok(())
        })
        .await
    }
}
