//! 账号与令牌生命周期的 HTTP 集成测试

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use iotgate_server::auth::{MemoryRevocationStore, TokenService};
use iotgate_server::gateway::{
    ConnectionRegistry, GatewayContext, IngestGateway, SessionAuthenticator,
};
use iotgate_server::http::{server::create_app, HttpServerState};
use iotgate_server::repository::{
    MemoryDeviceDirectory, MemoryTelemetryStore, MemoryUserRepository,
};
use iotgate_server::service::AuthService;

/// 纯内存后端组装完整应用
fn test_app() -> Router {
    let token_service = Arc::new(TokenService::new(
        "test-access-secret-0123456789",
        "test-refresh-secret-0123456789",
        3600,
        5 * 24 * 3600,
        30 * 24 * 3600,
    ));

    let users = Arc::new(MemoryUserRepository::new());
    let devices = Arc::new(MemoryDeviceDirectory::new());
    let telemetry = Arc::new(MemoryTelemetryStore::new());

    let auth_service = Arc::new(AuthService::new(
        users,
        token_service.clone(),
        Arc::new(MemoryRevocationStore::new()),
    ));

    let gateway = Arc::new(GatewayContext::new(
        SessionAuthenticator::new(token_service.clone(), devices.clone()),
        IngestGateway::new(devices.clone(), telemetry.clone()),
        Arc::new(ConnectionRegistry::new()),
    ));

    create_app(HttpServerState {
        auth_service,
        token_service,
        devices,
        telemetry,
        gateway,
    })
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, email: &str) -> (StatusCode, Value) {
    request(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": "alice",
            "email": email,
            "password": "correct horse battery"
        })),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    request(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

#[tokio::test]
async fn test_register_login_refresh_logout_flow() {
    let app = test_app();

    let (status, user) = register(&app, "alice@example.com").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "alice@example.com");
    assert!(user.get("password_hash").is_none());

    let (status, pair) = login(&app, "alice@example.com", "correct horse battery").await;
    assert_eq!(status, StatusCode::OK);
    let access = pair["token"].as_str().unwrap().to_string();
    let refresh = pair["refreshToken"].as_str().unwrap().to_string();

    // 访问令牌可以直接访问受保护接口
    let (status, _) = request(&app, "GET", "/api/devices", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);

    // 刷新拿到新的访问令牌，刷新令牌本身不轮换
    let (status, body) = request(
        &app,
        "POST",
        "/api/auth/refresh-token",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_access = body["token"].as_str().unwrap().to_string();
    let (status, _) = request(&app, "GET", "/api/devices", Some(&new_access), None).await;
    assert_eq!(status, StatusCode::OK);

    // 登出撤销刷新令牌
    let (status, _) = request(&app, "POST", "/api/auth/logout", Some(&access), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/refresh-token",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_conflict() {
    let app = test_app();

    let (status, _) = register(&app, "bob@example.com").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(&app, "bob@example.com").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User already exists");
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let app = test_app();
    register(&app, "carol@example.com").await;

    // 密码错误与邮箱不存在返回同一错误，不泄露账号是否存在
    let (status, body) = login(&app, "carol@example.com", "wrong password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = login(&app, "nobody@example.com", "wrong password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_missing_fields_rejected() {
    let app = test_app();

    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "dave" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "dave@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_second_login_invalidates_first_refresh_token() {
    let app = test_app();
    register(&app, "erin@example.com").await;

    let (_, first) = login(&app, "erin@example.com", "correct horse battery").await;
    let (_, second) = login(&app, "erin@example.com", "correct horse battery").await;

    // 每个用户只有一个有效刷新令牌，后一次登录覆盖前一次
    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/refresh-token",
        None,
        Some(json!({ "refreshToken": first["refreshToken"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/refresh-token",
        None,
        Some(json!({ "refreshToken": second["refreshToken"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_access_token_not_accepted_as_refresh() {
    let app = test_app();
    register(&app, "frank@example.com").await;

    let (_, pair) = login(&app, "frank@example.com", "correct horse battery").await;

    let (status, _) = request(
        &app,
        "POST",
        "/api/auth/refresh-token",
        None,
        Some(json!({ "refreshToken": pair["token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let app = test_app();

    let (status, _) = request(&app, "GET", "/api/devices", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, "POST", "/api/auth/logout", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let (status, _) = request(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
