//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::application::settings::{
    DEFAULT_DRIFT_RESYNC_THRESHOLD, DEFAULT_PAGE_SIZE, SyncSettings,
};
use crate::domain::entities::{ApiToken, UserId};

const APP_NAME: &str = "clubsync";
const APP_QUALIFIER: &str = "org";
const APP_ORGANIZATION: &str = "campusclub";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Bearer token; never written to disk.
    #[serde(skip)]
    pub token: Option<String>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Server endpoints.
    #[serde(default)]
    pub api: ApiConfig,

    /// Paging and counter tunables.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Push channel behavior.
    #[serde(default)]
    pub push: PushConfig,
}

/// Server endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST API root, e.g. `https://club.example.org/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// WebSocket root; the domain name is appended per channel.
    #[serde(default = "default_push_url")]
    pub push_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Id of the signed-in user.
    #[serde(default)]
    pub user_id: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            push_url: default_push_url(),
            request_timeout_secs: default_request_timeout(),
            user_id: None,
        }
    }
}

/// Paging and counter tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Records requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Local counter updates tolerated before a background resync; 0 disables.
    #[serde(default = "default_drift_threshold")]
    pub drift_resync_threshold: u32,

    /// Typing indicator lifetime in seconds.
    #[serde(default = "default_typing_timeout")]
    pub typing_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            drift_resync_threshold: default_drift_threshold(),
            typing_timeout_secs: default_typing_timeout(),
        }
    }
}

/// Push channel behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConfig {
    /// Reconnect after a dropped connection.
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    /// Attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_push_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_drift_threshold() -> u32 {
    DEFAULT_DRIFT_RESYNC_THRESHOLD
}

const fn default_typing_timeout() -> u64 {
    5
}

const fn default_true() -> bool {
    true
}

const fn default_max_reconnect_attempts() -> u32 {
    10
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: CliArgs) {
        if let Some(config_path) = args.config {
            self.config = Some(config_path);
        }
        if let Some(log_path) = args.log_path {
            self.log_path = Some(log_path);
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(token) = args.token {
            self.token = Some(token);
        }
        if let Some(user_id) = args.user_id {
            self.api.user_id = Some(user_id);
        }
        if let Some(base_url) = args.base_url {
            self.api.base_url = base_url;
        }
        if let Some(push_url) = args.push_url {
            self.api.push_url = push_url;
        }
        if let Some(page_size) = args.page_size {
            self.sync.page_size = page_size;
        }
        if let Some(auto_reconnect) = args.auto_reconnect {
            self.push.auto_reconnect = auto_reconnect;
        }
    }

    /// Returns the validated API token, if one was supplied.
    #[must_use]
    pub fn api_token(&self) -> Option<ApiToken> {
        self.token.as_deref().and_then(ApiToken::new)
    }

    /// Builds service settings for the configured user.
    #[must_use]
    pub fn sync_settings(&self) -> Option<SyncSettings> {
        let user_id = UserId(self.api.user_id?);
        Some(
            SyncSettings::new(user_id)
                .with_page_size(self.sync.page_size.max(1))
                .with_drift_resync_threshold(self.sync.drift_resync_threshold)
                .with_typing_timeout(Duration::from_secs(self.sync.typing_timeout_secs)),
        )
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("clubsync.log"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            token: None,
            log_level: LogLevel::Info,
            api: ApiConfig::default(),
            sync: SyncConfig::default(),
            push: PushConfig::default(),
        }
    }
}
