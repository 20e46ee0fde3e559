//! 服务器组装与启动

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::auth::{MemoryRevocationStore, RedisRevocationStore, RevocationStore, TokenService};
use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::gateway::{ConnectionRegistry, GatewayContext, IngestGateway, SessionAuthenticator};
use crate::http::{server::create_app, HttpServerState};
use crate::repository::{
    DeviceDirectory, MemoryDeviceDirectory, MemoryTelemetryStore, MemoryUserRepository,
    PgDeviceDirectory, PgTelemetryStore, PgUserRepository, TelemetryStore, UserRepository,
};
use crate::service::AuthService;

/// IoT 设备网关服务器
///
/// 组装所有组件：存储（有 DATABASE_URL 用 PostgreSQL，否则内存）、
/// 撤销存储（有 Redis 配置用 Redis，否则内存）、令牌服务、
/// 认证服务和设备接入网关，然后在配置的地址上提供
/// HTTP + 持久连接两个入口。
pub struct GatewayServer {
    config: ServerConfig,
    state: HttpServerState,
}

impl GatewayServer {
    pub async fn new(config: ServerConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ServerError::Configuration(e.to_string()))?;

        let token_service = Arc::new(TokenService::from_config(&config.auth));

        // 存储后端
        let (users, devices, telemetry): (
            Arc<dyn UserRepository>,
            Arc<dyn DeviceDirectory>,
            Arc<dyn TelemetryStore>,
        ) = match &config.database_url {
            Some(database_url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_pool_size)
                    .connect(database_url)
                    .await
                    .map_err(|e| ServerError::Database(format!("数据库连接失败: {}", e)))?;
                let pool = Arc::new(pool);

                info!("✅ PostgreSQL 连接成功");
                (
                    Arc::new(PgUserRepository::new(pool.clone())),
                    Arc::new(PgDeviceDirectory::new(pool.clone())),
                    Arc::new(PgTelemetryStore::new(pool)),
                )
            }
            None => {
                warn!("⚠️ 未配置 DATABASE_URL，使用内存存储（重启后数据丢失）");
                (
                    Arc::new(MemoryUserRepository::new()),
                    Arc::new(MemoryDeviceDirectory::new()),
                    Arc::new(MemoryTelemetryStore::new()),
                )
            }
        };

        // 刷新令牌撤销存储
        let revocation_store: Arc<dyn RevocationStore> = match &config.redis {
            Some(redis_config) => {
                let store = RedisRevocationStore::new(redis_config).await?;
                info!("✅ Redis 撤销存储已启用");
                Arc::new(store)
            }
            None => {
                warn!("⚠️ 未配置 Redis，撤销存储使用进程内缓存（不跨实例共享）");
                Arc::new(MemoryRevocationStore::new())
            }
        };

        let auth_service = Arc::new(AuthService::new(
            users,
            token_service.clone(),
            revocation_store,
        ));

        let gateway = Arc::new(GatewayContext::new(
            SessionAuthenticator::new(token_service.clone(), devices.clone()),
            IngestGateway::new(devices.clone(), telemetry.clone()),
            Arc::new(ConnectionRegistry::new()),
        ));

        let state = HttpServerState {
            auth_service,
            token_service,
            devices,
            telemetry,
            gateway,
        };

        Ok(Self { config, state })
    }

    /// 运行服务器直到进程退出
    pub async fn run(&self) -> Result<()> {
        let app = create_app(self.state.clone());

        let addr = self.config.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Internal(format!("地址绑定失败 {}: {}", addr, e)))?;

        info!("🌐 IoT Gateway 监听在 {}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(format!("服务器运行失败: {}", e)))?;

        Ok(())
    }
}
