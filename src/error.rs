use std::fmt;
use std::error::Error as StdError;
use serde::{Serialize, Deserialize};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response, Json},
};

/// 服务器错误类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerError {
    /// 验证错误（缺少字段、格式错误）
    Validation(String),
    /// 重复注册等冲突
    Conflict(String),
    /// 认证错误（凭证不匹配、token 被撤销）
    Authentication(String),
    /// 无效令牌（签名错误、密钥不匹配、过期，统一对外不区分）
    InvalidToken,
    /// 禁止访问
    Forbidden(String),
    /// 资源未找到
    NotFound(String),
    /// 数据库错误
    Database(String),
    /// 序列化错误
    Serialization(String),
    /// 配置错误
    Configuration(String),
    /// 内部错误
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ServerError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServerError::Authentication(msg) => write!(f, "Authentication error: {}", msg),
            ServerError::InvalidToken => write!(f, "Invalid token"),
            ServerError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ServerError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServerError::Database(msg) => write!(f, "Database error: {}", msg),
            ServerError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ServerError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ServerError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for ServerError {}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Authentication(_) | ServerError::InvalidToken => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error_response = ErrorResponse::new(&self);
        (status_code, Json(error_response)).into_response()
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(err: sqlx::Error) -> Self {
        ServerError::Database(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ServerError>;

/// 错误响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误消息
    pub error: String,
    /// 时间戳
    pub timestamp: u64,
}

impl ErrorResponse {
    /// 创建错误响应
    ///
    /// 内部类错误（数据库、签名等）统一对外输出通用消息，不泄露细节
    pub fn new(error: &ServerError) -> Self {
        let message = match error {
            ServerError::Validation(msg)
            | ServerError::Conflict(msg)
            | ServerError::Authentication(msg)
            | ServerError::Forbidden(msg)
            | ServerError::NotFound(msg) => msg.clone(),
            ServerError::InvalidToken => "Invalid token".to_string(),
            _ => "Internal server error".to_string(),
        };

        Self {
            error: message,
            timestamp: chrono::Utc::now().timestamp() as u64,
        }
    }
}
