//! 账号认证服务
//!
//! 驱动登录/刷新/登出的账号级状态机：
//!
//! ```text
//! Unauthenticated --login(凭证正确)-------> Authenticated（签发 access + refresh，refresh 入撤销存储）
//! Authenticated --refresh(与存储一致)-----> Authenticated（只签发新 access，refresh 不轮换）
//! Authenticated --refresh(不一致/无效)----> Unauthenticated (401)
//! Authenticated --logout-----------------> Unauthenticated（撤销存储删除 refresh）
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{hash_password, verify_password, RevocationStore, TokenKind, TokenService};
use crate::error::{Result, ServerError};
use crate::model::User;
use crate::repository::UserRepository;

/// 登录成功返回的令牌对
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// 访问令牌（约 1 小时）
    pub token: String,
    /// 刷新令牌（约 5 天，可撤销）
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// 账号认证服务
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    token_service: Arc<TokenService>,
    revocation_store: Arc<dyn RevocationStore>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        token_service: Arc<TokenService>,
        revocation_store: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            users,
            token_service,
            revocation_store,
        }
    }

    /// 注册新用户
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        if username.trim().is_empty() {
            return Err(ServerError::Validation("Missing username".to_string()));
        }
        if email.trim().is_empty() {
            return Err(ServerError::Validation("Missing email".to_string()));
        }
        if password.is_empty() {
            return Err(ServerError::Validation("Missing password".to_string()));
        }

        let password_hash = hash_password(password)?;
        let user = User::new(
            username.trim().to_string(),
            email.trim().to_lowercase(),
            password_hash,
        );

        // 邮箱重复由仓库的唯一约束上报 Conflict
        self.users.create(&user).await?;

        info!("✅ 用户注册成功: user_id={}", user.id);
        Ok(user)
    }

    /// 验证用户身份（邮箱 + 密码）
    ///
    /// 未注册邮箱和密码不匹配对外返回同一条消息，不暴露账号是否存在
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .users
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| ServerError::Validation("Invalid credentials".to_string()))?;

        let valid = verify_password(password, &user.password_hash)?;
        if !valid {
            warn!("❌ 密码验证失败: user_id={}", user.id);
            return Err(ServerError::Validation("Invalid credentials".to_string()));
        }

        Ok(user)
    }

    /// 登录
    ///
    /// 成功后刷新令牌写入撤销存储（覆盖语义），同一用户重复登录会使
    /// 上一个刷新令牌失效，即使它的签名仍然可验。
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair> {
        if email.trim().is_empty() {
            return Err(ServerError::Validation("Missing email".to_string()));
        }
        if password.is_empty() {
            return Err(ServerError::Validation("Missing password".to_string()));
        }

        let user = self.verify_credentials(email, password).await?;

        let token = self.token_service.issue_access(&user.id)?;
        let refresh_token = self.token_service.issue_refresh(&user.id)?;

        self.revocation_store
            .set(
                &user.id,
                &refresh_token,
                self.token_service.refresh_ttl() as u64,
            )
            .await?;

        info!("✅ 用户登录成功: user_id={}", user.id);

        Ok(TokenPair {
            token,
            refresh_token,
        })
    }

    /// 刷新访问令牌
    ///
    /// 签名验证通过后还要和撤销存储中的条目比对——这是登出和
    /// 重复登录能让旧刷新令牌失效的机制。当前设计不轮换刷新令牌。
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        if refresh_token.is_empty() {
            return Err(ServerError::Validation("Missing token".to_string()));
        }

        // 签名/过期失败统一 401
        let claims = self
            .token_service
            .verify(refresh_token, TokenKind::Refresh)?;

        let stored = self.revocation_store.get(&claims.sub).await?;
        match stored {
            Some(token) if token == refresh_token => {}
            _ => {
                debug!("刷新令牌与存储不匹配（已撤销或被覆盖）: user_id={}", claims.sub);
                return Err(ServerError::Authentication(
                    "Invalid refresh token".to_string(),
                ));
            }
        }

        self.token_service.issue_access(&claims.sub)
    }

    /// 登出：删除该用户的刷新令牌条目；重复登出不是错误
    pub async fn logout(&self, user_id: &str) -> Result<()> {
        self.revocation_store.del(user_id).await?;
        info!("✅ 用户登出: user_id={}", user_id);
        Ok(())
    }
}
