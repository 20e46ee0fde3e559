//! 认证中间件
//!
//! 受保护的接口以 `AuthUser` 提取器声明认证要求：
//! 从 Authorization header 提取 Bearer 令牌，用访问密钥验证，
//! 通过后交出 user_id。缺少或无效的令牌统一回 401。

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::debug;

use crate::auth::TokenKind;
use crate::error::ServerError;
use crate::http::HttpServerState;

/// 认证通过的请求方
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<HttpServerState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpServerState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ServerError::Authentication("Access denied".to_string()))?;

        let claims = state.token_service.verify(token, TokenKind::Access)?;

        // 设备凭证只授权连接握手，不能当作用户 API 令牌；
        // 否则一台失陷设备可以用 30 天凭证管理整个账号
        if claims.device_id.is_some() {
            return Err(ServerError::InvalidToken);
        }

        debug!("🔐 请求已认证, user_id: {}", claims.sub);

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
