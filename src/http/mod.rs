//! HTTP 服务模块

pub mod middleware;
pub mod routes;
pub mod server;

pub use server::HttpServerState;
