//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Club REST API client.
pub mod http;
/// WebSocket push channels.
pub mod push;

pub use config::{AppConfig, CliArgs, LogLevel, StorageManager};
pub use http::RestClient;
pub use push::{PushClient, PushClientConfig, PushError};
