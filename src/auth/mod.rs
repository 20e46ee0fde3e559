// 认证模块 - 提供令牌签发/验证、密码哈希和刷新令牌撤销存储

pub mod password;
pub mod revocation_store;
pub mod token_service;

// 重新导出主要类型
pub use password::{hash_password, verify_password, PASSWORD_COST};
pub use revocation_store::{MemoryRevocationStore, RedisRevocationStore, RevocationStore};
pub use token_service::{TokenClaims, TokenKind, TokenService};
