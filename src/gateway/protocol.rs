// =====================================================
// 连接协议帧
// =====================================================

use serde::{Deserialize, Serialize};

/// 客户端入站事件
///
/// 每帧为一条 JSON 文本消息，形如 `{"event": "...", "payload": ...}`。
/// 未知事件名或不合法的负载在反序列化层直接失败，
/// 由连接循环回以 `deviceError` 并保持连接。
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ClientEvent {
    /// 握手：payload 为设备凭证（含 device_id 声明的签名令牌）
    Authenticate(String),

    /// 遥测上报：payload 为 `{"deviceData": {...}}`
    DeviceData(DeviceDataPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceDataPayload {
    #[serde(rename = "deviceData")]
    pub device_data: serde_json::Value,
}

/// 服务端出站事件
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ServerEvent {
    /// 认证成功
    Authenticated { message: String },

    /// 认证失败（连接保持打开，状态不变）
    AuthError { error: String },

    /// 遥测已接收
    Ack(String),

    /// 遥测被拒绝或处理失败
    DeviceError { error: String },
}

impl ServerEvent {
    pub fn authenticated() -> Self {
        ServerEvent::Authenticated {
            message: "Authenticated successfully".to_string(),
        }
    }

    pub fn auth_error(error: impl Into<String>) -> Self {
        ServerEvent::AuthError { error: error.into() }
    }

    pub fn ack() -> Self {
        ServerEvent::Ack("Data received".to_string())
    }

    pub fn device_error(error: impl Into<String>) -> Self {
        ServerEvent::DeviceError { error: error.into() }
    }

    /// 序列化为一条文本帧
    pub fn to_frame(&self) -> String {
        // 出站枚举的序列化不含不可序列化类型
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"event":"deviceError","payload":{"error":"Internal server error"}}"#.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_authenticate_frame() {
        let frame = r#"{"event": "authenticate", "payload": "some-token"}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();

        match event {
            ClientEvent::Authenticate(token) => assert_eq!(token, "some-token"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_device_data_frame() {
        let frame = r#"{"event": "deviceData", "payload": {"deviceData": {"temperature": 21.5}}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();

        match event {
            ClientEvent::DeviceData(payload) => {
                assert_eq!(payload.device_data, json!({"temperature": 21.5}));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_rejected() {
        let frame = r#"{"event": "selfDestruct", "payload": null}"#;
        assert!(serde_json::from_str::<ClientEvent>(frame).is_err());
    }

    #[test]
    fn test_server_event_frames() {
        let frame: serde_json::Value =
            serde_json::from_str(&ServerEvent::authenticated().to_frame()).unwrap();
        assert_eq!(frame["event"], "authenticated");
        assert_eq!(frame["payload"]["message"], "Authenticated successfully");

        let frame: serde_json::Value =
            serde_json::from_str(&ServerEvent::ack().to_frame()).unwrap();
        assert_eq!(frame["event"], "ack");
        assert_eq!(frame["payload"], "Data received");

        let frame: serde_json::Value =
            serde_json::from_str(&ServerEvent::device_error("Device not authenticated").to_frame())
                .unwrap();
        assert_eq!(frame["event"], "deviceError");
        assert_eq!(frame["payload"]["error"], "Device not authenticated");
    }
}
