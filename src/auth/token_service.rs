use crate::error::{Result, ServerError};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 令牌类型
///
/// 访问令牌和刷新令牌使用不同的签名密钥，
/// 即使攻击者控制负载结构，也无法把一类令牌重放为另一类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// 访问令牌（短期，直接授权 API 调用）
    Access,
    /// 刷新令牌（长期，可通过撤销存储失效）
    Refresh,
}

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// 签发者
    pub iss: String,
    /// 主题（用户ID）
    pub sub: String,
    /// 过期时间 (Unix timestamp)
    pub exp: i64,
    /// 签发时间
    pub iat: i64,
    /// JWT ID
    pub jti: String,

    /// 设备ID（仅设备凭证携带）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// 令牌签发和验证服务 (HS256 对称加密)
///
/// 除签名密钥外无状态；刷新令牌的撤销由 RevocationStore 负责。
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    issuer: String,
    access_ttl: i64,
    refresh_ttl: i64,
    device_ttl: i64,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl: i64,
        refresh_ttl: i64,
        device_ttl: i64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            issuer: "iotgate".to_string(),
            access_ttl,
            refresh_ttl,
            device_ttl,
        }
    }

    /// 从认证配置构造
    pub fn from_config(config: &crate::config::AuthConfig) -> Self {
        Self::new(
            &config.access_secret,
            &config.refresh_secret,
            config.access_token_ttl_secs,
            config.refresh_token_ttl_secs,
            config.device_token_ttl_secs,
        )
    }

    /// 签发访问令牌
    pub fn issue_access(&self, user_id: &str) -> Result<String> {
        self.sign(TokenKind::Access, user_id, None, self.access_ttl)
    }

    /// 签发刷新令牌
    pub fn issue_refresh(&self, user_id: &str) -> Result<String> {
        self.sign(TokenKind::Refresh, user_id, None, self.refresh_ttl)
    }

    /// 签发设备凭证
    ///
    /// 设备凭证是携带 device_id 声明的访问密钥签名令牌，
    /// 客户端无法伪造任意 (user_id, device_id) 组合。
    pub fn issue_device_token(&self, user_id: &str, device_id: &str) -> Result<String> {
        self.sign(
            TokenKind::Access,
            user_id,
            Some(device_id.to_string()),
            self.device_ttl,
        )
    }

    fn sign(
        &self,
        kind: TokenKind,
        user_id: &str,
        device_id: Option<String>,
        ttl: i64,
    ) -> Result<String> {
        let now = Utc::now().timestamp();

        let claims = TokenClaims {
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            exp: now + ttl,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            device_id,
        };

        let key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, key)
            .map_err(|e| ServerError::Internal(format!("令牌签发失败: {}", e)))
    }

    /// 验证令牌
    ///
    /// 签名错误、密钥不匹配、过期一律返回 InvalidToken，
    /// 调用方不得向外部客户端区分失败原因。
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let token_data = decode::<TokenClaims>(token, key, &validation)
            .map_err(|_e| ServerError::InvalidToken)?;

        Ok(token_data.claims)
    }

    /// 刷新令牌有效期（秒），用于撤销存储条目的 TTL
    pub fn refresh_ttl(&self) -> i64 {
        self.refresh_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new(
            "test-access-secret-at-least-32-chars",
            "test-refresh-secret-at-least-32-chars",
            3600,
            5 * 24 * 3600,
            30 * 24 * 3600,
        )
    }

    #[test]
    fn test_access_issue_and_verify() {
        let service = test_service();

        let token = service.issue_access("user-1").unwrap();
        assert!(!token.is_empty());

        let claims = service.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.device_id.is_none());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_kinds_not_interchangeable() {
        let service = test_service();

        let access = service.issue_access("user-1").unwrap();
        let refresh = service.issue_refresh("user-1").unwrap();

        // 各自的密钥验证通过
        assert!(service.verify(&access, TokenKind::Access).is_ok());
        assert!(service.verify(&refresh, TokenKind::Refresh).is_ok());

        // 换一类密钥验证失败
        assert!(matches!(
            service.verify(&access, TokenKind::Refresh),
            Err(ServerError::InvalidToken)
        ));
        assert!(matches!(
            service.verify(&refresh, TokenKind::Access),
            Err(ServerError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let service = test_service();
        let token = service.issue_access("user-1").unwrap();

        // 篡改签名段最后一个字节
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(matches!(
            service.verify(&tampered, TokenKind::Access),
            Err(ServerError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // TTL 为负，签出的令牌已过期（超出 jsonwebtoken 默认 60s leeway）
        let service = TokenService::new(
            "test-access-secret-at-least-32-chars",
            "test-refresh-secret-at-least-32-chars",
            -120,
            -120,
            -120,
        );

        let token = service.issue_access("user-1").unwrap();
        assert!(matches!(
            service.verify(&token, TokenKind::Access),
            Err(ServerError::InvalidToken)
        ));
    }

    #[test]
    fn test_device_token_carries_device_id() {
        let service = test_service();

        let token = service.issue_device_token("user-1", "device-9").unwrap();
        let claims = service.verify(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.device_id.as_deref(), Some("device-9"));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = test_service();
        assert!(service.verify("invalid.token.here", TokenKind::Access).is_err());
        assert!(service.verify("", TokenKind::Refresh).is_err());
    }
}
