use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use clubsync::application::{MessagingSnapshot, NotificationSnapshot, SyncContext};
use clubsync::infrastructure::{
    AppConfig, CliArgs, PushClient, PushClientConfig, RestClient, StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    let file_layer = match config.effective_log_path() {
        Some(log_path) => {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)?;

            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let args = CliArgs::parse();
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn create_context(config: &AppConfig) -> Result<SyncContext> {
    let token = config
        .api_token()
        .ok_or_else(|| eyre!("missing or malformed API token; set CLUBSYNC_TOKEN or --token"))?;
    let settings = config
        .sync_settings()
        .ok_or_else(|| eyre!("missing user id; set [api] user_id or CLUBSYNC_USER_ID"))?;

    info!(token = %token.masked(), user_id = %settings.user_id, "Building adapters");

    let rest = Arc::new(RestClient::new(
        config.api.base_url.clone(),
        token.clone(),
        config.request_timeout(),
    )?);
    let push = Arc::new(PushClient::new(
        config.api.push_url.clone(),
        token,
        PushClientConfig::new()
            .with_auto_reconnect(config.push.auto_reconnect)
            .with_max_reconnect_attempts(config.push.max_reconnect_attempts),
    ));

    Ok(SyncContext::new(rest.clone(), rest, push, settings))
}

fn log_notifications(snapshot: &NotificationSnapshot) {
    info!(
        items = snapshot.items.len(),
        unread = snapshot.unread_count,
        loading = snapshot.loading || snapshot.loading_more,
        error = snapshot.error.as_deref().unwrap_or(""),
        "Notifications"
    );
}

fn log_messaging(snapshot: &MessagingSnapshot) {
    info!(
        conversations = snapshot.conversations.len(),
        active = ?snapshot.active_conversation,
        messages = snapshot.messages.len(),
        typing = snapshot.typing.len(),
        unread = snapshot.unread_count,
        error = snapshot.error.as_deref().unwrap_or(""),
        "Messages"
    );
}

async fn run(ctx: &SyncContext) -> Result<()> {
    let mut notifications = ctx.notifications().changes();
    let mut messaging = ctx.messaging().changes();
    let mut notification_channel = ctx.notification_channel().watch_state();
    let mut message_channel = ctx.message_channel().watch_state();

    ctx.start().await?;
    log_notifications(&ctx.notifications().snapshot());
    log_messaging(&ctx.messaging().snapshot());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                info!("Interrupt received");
                break;
            }
            Ok(()) = notifications.changed() => {
                log_notifications(&ctx.notifications().snapshot());
            }
            Ok(()) = messaging.changed() => {
                log_messaging(&ctx.messaging().snapshot());
            }
            Ok(()) = notification_channel.changed() => {
                info!(state = %*notification_channel.borrow_and_update(), "Notification channel");
            }
            Ok(()) = message_channel.changed() => {
                info!(state = %*message_channel.borrow_and_update(), "Message channel");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_logging(&config)?;

    info!(version = clubsync::VERSION, "Starting {}", clubsync::NAME);

    let ctx = create_context(&config)?;
    let result = run(&ctx).await;

    ctx.shutdown();

    result
}
