use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户记录
///
/// password_hash 只在服务端流转，序列化响应时跳过
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// 用户唯一ID (UUID)
    pub id: String,

    /// 用户名
    pub username: String,

    /// 邮箱（登录账号，唯一）
    pub email: String,

    /// 密码哈希 (bcrypt)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl User {
    /// 创建新用户（ID 由服务端生成）
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}
