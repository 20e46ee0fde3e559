// 数据模型模块

pub mod user;
pub mod device;
pub mod telemetry;

pub use user::User;
pub use device::{Device, DeviceStatus};
pub use telemetry::TelemetryRecord;
