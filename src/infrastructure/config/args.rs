use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "clubsync",
    version,
    about = "Keeps club notifications and messages in sync with the server",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// API bearer token.
    #[arg(long, env = "CLUBSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Id of the signed-in user.
    #[arg(long, env = "CLUBSYNC_USER_ID")]
    pub user_id: Option<u64>,

    /// REST API root.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// WebSocket root.
    #[arg(long, value_name = "URL")]
    pub push_url: Option<String>,

    /// Records requested per page.
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Reconnect dropped push channels.
    #[arg(long)]
    pub auto_reconnect: Option<bool>,
}
