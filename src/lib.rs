pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod logging;
pub mod model;
pub mod repository;
pub mod server;
pub mod service;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use model::*;
pub use server::GatewayServer;
