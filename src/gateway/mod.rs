//! 设备接入网关
//!
//! 持久连接上的设备握手与遥测接入：会话状态机、
//! 协议帧、认证器、接入网关、连接循环和活跃连接注册表。

pub mod authenticator;
pub mod connection;
pub mod ingest;
pub mod protocol;
pub mod registry;
pub mod session;

pub use authenticator::SessionAuthenticator;
pub use connection::{handle_socket, GatewayContext};
pub use ingest::IngestGateway;
pub use protocol::{ClientEvent, ServerEvent};
pub use registry::ConnectionRegistry;
pub use session::ConnectionSession;
