use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 服务器监听地址
    pub host: String,
    /// HTTP/WebSocket 服务端口
    pub port: u16,
    /// 数据库连接字符串（未配置时使用内存存储，适合开发和测试）
    pub database_url: Option<String>,
    /// 数据库连接池大小（与服务的连接上限无关）
    pub db_pool_size: u32,
    /// 最大并发连接数
    pub max_connections: u32,
    /// 日志级别
    pub log_level: String,
    /// 认证配置
    pub auth: AuthConfig,
    /// Redis 配置（撤销存储后端；未配置时使用内存 TTL 缓存）
    pub redis: Option<RedisConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: std::env::var("DATABASE_URL").ok(),
            db_pool_size: 20,
            max_connections: 10000,
            log_level: "info".to_string(),
            auth: AuthConfig::default(),
            redis: None,
        }
    }
}

/// 认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 访问令牌签名密钥
    pub access_secret: String,
    /// 刷新令牌签名密钥（与访问密钥必须不同，防止两类令牌互换重放）
    pub refresh_secret: String,
    /// 访问令牌有效期（秒）
    pub access_token_ttl_secs: i64,
    /// 刷新令牌有效期（秒）
    pub refresh_token_ttl_secs: i64,
    /// 设备凭证有效期（秒）
    pub device_token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: "change-me-access-secret-32-chars!".to_string(),
            refresh_secret: "change-me-refresh-secret-32-char!".to_string(),
            access_token_ttl_secs: 3600,           // 1 小时
            refresh_token_ttl_secs: 5 * 24 * 3600, // 5 天
            device_token_ttl_secs: 30 * 24 * 3600, // 30 天
        }
    }
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_min_idle")]
    pub min_idle: u32,
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_pool_size() -> u32 { 10 }
fn default_min_idle() -> u32 { 1 }
fn default_connection_timeout_secs() -> u64 { 5 }
fn default_command_timeout_ms() -> u64 { 500 }
fn default_idle_timeout_secs() -> u64 { 300 }

impl RedisConfig {
    /// 仅提供 URL，其余参数取默认值
    pub fn from_url(url: String) -> Self {
        Self {
            url,
            pool_size: default_pool_size(),
            min_idle: default_min_idle(),
            connection_timeout_secs: default_connection_timeout_secs(),
            command_timeout_ms: default_command_timeout_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl ServerConfig {
    /// 创建新的服务器配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 服务绑定地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("无法读取配置文件: {:?}", path.as_ref()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| "配置文件格式错误")?;

        Ok(toml_config.into())
    }

    /// 从环境变量加载配置（IOTGATE_ 前缀）
    pub fn merge_from_env(&mut self) {
        if let Ok(host) = env::var("IOTGATE_HOST") {
            self.host = host;
        }
        if let Ok(port) = env::var("IOTGATE_PORT") {
            self.port = port.parse().unwrap_or(self.port);
        }
        if let Ok(db_url) = env::var("DATABASE_URL") {
            self.database_url = Some(db_url);
        }
        if let Ok(pool_size) = env::var("IOTGATE_DB_POOL_SIZE") {
            self.db_pool_size = pool_size.parse().unwrap_or(self.db_pool_size);
        }
        if let Ok(log_level) = env::var("IOTGATE_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(access_secret) = env::var("IOTGATE_ACCESS_SECRET") {
            self.auth.access_secret = access_secret;
        }
        if let Ok(refresh_secret) = env::var("IOTGATE_REFRESH_SECRET") {
            self.auth.refresh_secret = refresh_secret;
        }
        if let Ok(redis_url) = env::var("REDIS_URL") {
            self.redis = Some(RedisConfig::from_url(redis_url));
        }
    }

    /// 从命令行参数合并配置
    pub fn merge_from_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(db_url) = &cli.database_url {
            self.database_url = Some(db_url.clone());
        }
        if let Some(redis_url) = &cli.redis_url {
            self.redis = Some(RedisConfig::from_url(redis_url.clone()));
        }
        if let Some(access_secret) = &cli.access_secret {
            self.auth.access_secret = access_secret.clone();
        }
        if let Some(refresh_secret) = &cli.refresh_secret {
            self.auth.refresh_secret = refresh_secret.clone();
        }
        if let Some(log_level) = cli.get_log_level() {
            self.log_level = log_level;
        }
    }

    /// 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    pub fn load(cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if let Some(path) = &cli.config_file {
            Self::from_toml_file(path)?
        } else if Path::new("config.toml").exists() {
            Self::from_toml_file("config.toml")?
        } else {
            Self::default()
        };

        config.merge_from_env();
        config.merge_from_cli(cli);
        config.validate()?;

        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.auth.access_secret.len() < 16 {
            anyhow::bail!("access_secret 长度不能小于 16");
        }
        if self.auth.refresh_secret.len() < 16 {
            anyhow::bail!("refresh_secret 长度不能小于 16");
        }
        if self.auth.access_secret == self.auth.refresh_secret {
            anyhow::bail!("access_secret 和 refresh_secret 不能相同");
        }
        if self.auth.access_token_ttl_secs <= 0 || self.auth.refresh_token_ttl_secs <= 0 {
            anyhow::bail!("令牌有效期必须为正数");
        }
        Ok(())
    }
}

/// 日志早期配置（在完整配置加载前读取 [logging] 段）
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EarlyLoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

/// 快速读取配置文件中的 [logging] 段，不加载完整配置
pub fn load_early_logging_config(config_file: Option<&str>) -> EarlyLoggingConfig {
    #[derive(Deserialize)]
    struct Partial {
        logging: Option<EarlyLoggingConfig>,
    }

    let path = config_file.unwrap_or("config.toml");
    fs::read_to_string(path)
        .ok()
        .and_then(|content| toml::from_str::<Partial>(&content).ok())
        .and_then(|p| p.logging)
        .unwrap_or_default()
}

/// TOML 配置文件结构（所有字段可选，缺省时取默认值）
#[derive(Debug, Deserialize)]
struct TomlConfig {
    server: Option<TomlServerSection>,
    auth: Option<TomlAuthSection>,
    redis: Option<RedisConfig>,
    logging: Option<EarlyLoggingConfig>,
}

#[derive(Debug, Deserialize)]
struct TomlServerSection {
    host: Option<String>,
    port: Option<u16>,
    database_url: Option<String>,
    db_pool_size: Option<u32>,
    max_connections: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlAuthSection {
    access_secret: Option<String>,
    refresh_secret: Option<String>,
    access_token_ttl_secs: Option<i64>,
    refresh_token_ttl_secs: Option<i64>,
    device_token_ttl_secs: Option<i64>,
}

impl From<TomlConfig> for ServerConfig {
    fn from(toml: TomlConfig) -> Self {
        let mut config = ServerConfig::default();

        if let Some(server) = toml.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(db_url) = server.database_url {
                config.database_url = Some(db_url);
            }
            if let Some(pool_size) = server.db_pool_size {
                config.db_pool_size = pool_size;
            }
            if let Some(max_conn) = server.max_connections {
                config.max_connections = max_conn;
            }
        }

        if let Some(auth) = toml.auth {
            if let Some(secret) = auth.access_secret {
                config.auth.access_secret = secret;
            }
            if let Some(secret) = auth.refresh_secret {
                config.auth.refresh_secret = secret;
            }
            if let Some(ttl) = auth.access_token_ttl_secs {
                config.auth.access_token_ttl_secs = ttl;
            }
            if let Some(ttl) = auth.refresh_token_ttl_secs {
                config.auth.refresh_token_ttl_secs = ttl;
            }
            if let Some(ttl) = auth.device_token_ttl_secs {
                config.auth.device_token_ttl_secs = ttl;
            }
        }

        config.redis = toml.redis;

        if let Some(logging) = toml.logging {
            if let Some(level) = logging.level {
                config.log_level = level;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.auth.access_token_ttl_secs, 3600);
        assert_eq!(config.auth.refresh_token_ttl_secs, 5 * 24 * 3600);
    }

    #[test]
    fn test_same_secrets_rejected() {
        let mut config = ServerConfig::default();
        config.auth.refresh_secret = config.auth.access_secret.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            db_pool_size = 5
            max_connections = 50000

            [auth]
            access_secret = "test-access-secret-0123456789"
            refresh_secret = "test-refresh-secret-0123456789"
            access_token_ttl_secs = 60

            [redis]
            url = "redis://localhost:6379"
        "#;

        let toml_config: TomlConfig = toml::from_str(toml_str).unwrap();
        let config: ServerConfig = toml_config.into();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.auth.access_token_ttl_secs, 60);
        assert_eq!(config.redis.unwrap().pool_size, 10);

        // 数据库连接池与服务连接上限是两个独立的旋钮
        assert_eq!(config.db_pool_size, 5);
        assert_eq!(config.max_connections, 50000);
    }

    #[test]
    fn test_db_pool_size_has_own_default() {
        let config = ServerConfig::default();
        assert_eq!(config.db_pool_size, 20);
        assert_ne!(config.db_pool_size, config.max_connections);
    }
}
