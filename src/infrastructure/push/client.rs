//! Reconnecting push channel client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::connection::{PushConnection, WebSocketConnection};
use super::constants::{
    MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY_BASE, RECONNECT_DELAY_MAX, RECONNECT_JITTER_MAX,
};
use super::error::{PushError, PushResult};
use crate::domain::entities::ApiToken;
use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::ports::{ChannelEvent, PushChannelPort, Subscription, SyncDomain};

pub struct PushClientConfig {
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
}

impl Default for PushClientConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl PushClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

type Connector = Arc<dyn Fn() -> Box<dyn PushConnection> + Send + Sync>;

/// Opens one reconnecting WebSocket per domain at `{push_url}/{domain}/?token=`.
pub struct PushClient {
    push_url: String,
    token: ApiToken,
    config: Arc<PushClientConfig>,
    connector: Connector,
}

impl PushClient {
    #[must_use]
    pub fn new(push_url: impl Into<String>, token: ApiToken, config: PushClientConfig) -> Self {
        Self::with_connector(
            push_url,
            token,
            config,
            Arc::new(|| Box::new(WebSocketConnection::new()) as Box<dyn PushConnection>),
        )
    }

    fn with_connector(
        push_url: impl Into<String>,
        token: ApiToken,
        config: PushClientConfig,
        connector: Connector,
    ) -> Self {
        Self {
            push_url: push_url.into(),
            token,
            config: Arc::new(config),
            connector,
        }
    }

    /// Builds the channel URL for a domain.
    ///
    /// # Errors
    /// Returns `PushError::InvalidUrl` unless the root is a `ws` or `wss` URL.
    pub fn channel_url(&self, domain: SyncDomain) -> PushResult<Url> {
        let root = self.push_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{root}/{domain}/")).map_err(|e| {
            PushError::InvalidUrl {
                message: e.to_string(),
            }
        })?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(PushError::InvalidUrl {
                message: format!("unsupported scheme {}", url.scheme()),
            });
        }

        url.query_pairs_mut().append_pair("token", self.token.as_str());
        Ok(url)
    }
}

impl PushChannelPort for PushClient {
    fn open_channel(&self, domain: SyncDomain) -> SyncResult<Subscription> {
        let url = self.channel_url(domain)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SyncError::channel(format!("no async runtime: {e}")))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (subscription, shutdown) = Subscription::new(event_rx);

        runtime.spawn(run_push_loop(
            domain,
            url.to_string(),
            self.config.clone(),
            self.connector.clone(),
            event_tx,
            shutdown,
        ));

        Ok(subscription)
    }
}

enum ConnectionResult {
    /// The connection attempt itself failed.
    Failed(PushError),
    /// An established connection dropped.
    Dropped(PushError),
    /// Nobody is listening any more.
    ReceiverGone,
}

async fn run_push_loop(
    domain: SyncDomain,
    url: String,
    config: Arc<PushClientConfig>,
    connector: Connector,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut reconnect_attempts: u32 = 0;

    while !*shutdown.borrow() {
        let mut connection = connector();

        let result = tokio::select! {
            biased;
            () = wait_for_shutdown(&mut shutdown) => None,
            result = run_single_connection(
                connection.as_mut(),
                &url,
                &event_tx,
                &mut reconnect_attempts,
            ) => Some(result),
        };

        if connection.is_connected() {
            connection.disconnect().await;
        }

        let error = match result {
            None | Some(ConnectionResult::ReceiverGone) => break,
            Some(ConnectionResult::Failed(e)) => {
                warn!(domain = %domain, error = %e, "Failed to connect push channel");
                e
            }
            Some(ConnectionResult::Dropped(e)) => {
                warn!(domain = %domain, error = %e, "Push channel dropped");
                e
            }
        };

        if !error.should_reconnect() {
            error!(domain = %domain, error = %error, "Push channel closed for good");
            let _ = event_tx.send(ChannelEvent::Error {
                message: error.to_string(),
                recoverable: false,
            });
            break;
        }

        if !config.auto_reconnect {
            let _ = event_tx.send(ChannelEvent::Disconnected {
                reason: error.to_string(),
            });
            break;
        }

        reconnect_attempts += 1;
        if reconnect_attempts > config.max_reconnect_attempts {
            let limit = PushError::ReconnectionLimitExceeded {
                attempts: config.max_reconnect_attempts,
            };
            error!(domain = %domain, "Max reconnection attempts exceeded");
            let _ = event_tx.send(ChannelEvent::Error {
                message: limit.to_string(),
                recoverable: false,
            });
            break;
        }

        let delay = calculate_backoff_delay(reconnect_attempts - 1);
        info!(
            domain = %domain,
            attempt = reconnect_attempts,
            delay_ms = delay.as_millis(),
            "Reconnecting push channel"
        );

        if event_tx
            .send(ChannelEvent::Reconnecting {
                attempt: reconnect_attempts,
            })
            .is_err()
        {
            break;
        }

        tokio::select! {
            biased;
            () = wait_for_shutdown(&mut shutdown) => break,
            () = sleep(delay) => {}
        }
    }

    info!(domain = %domain, "Push loop terminated");
}

async fn run_single_connection(
    connection: &mut dyn PushConnection,
    url: &str,
    event_tx: &mpsc::UnboundedSender<ChannelEvent>,
    reconnect_attempts: &mut u32,
) -> ConnectionResult {
    if let Err(e) = connection.connect(url).await {
        return ConnectionResult::Failed(e);
    }

    info!("Push channel connected");
    *reconnect_attempts = 0;
    if event_tx.send(ChannelEvent::Connected).is_err() {
        return ConnectionResult::ReceiverGone;
    }

    loop {
        match connection.receive().await {
            Ok(event) => {
                if event_tx.send(ChannelEvent::Push(event)).is_err() {
                    return ConnectionResult::ReceiverGone;
                }
            }
            Err(e) => return ConnectionResult::Dropped(e),
        }
    }
}

/// Resolves once the subscription is closed or dropped.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

#[allow(clippy::cast_possible_truncation)]
fn calculate_backoff_delay(attempt: u32) -> Duration {
    let base_delay = RECONNECT_DELAY_BASE.as_millis() as u64;
    let max_delay = RECONNECT_DELAY_MAX.as_millis() as u64;
    let jitter_max = RECONNECT_JITTER_MAX.as_millis() as u64;

    let exponential_delay = base_delay.saturating_mul(2_u64.saturating_pow(attempt.min(6)));
    let capped_delay = exponential_delay.min(max_delay);

    Duration::from_millis(capped_delay.saturating_add(rand_jitter(jitter_max)))
}

fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;

    if max == 0 {
        return 0;
    }

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);

    nanos % max
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::domain::ports::PushEvent;

    /// What one scripted connection does.
    struct Script {
        connect: PushResult<()>,
        events: VecDeque<PushResult<PushEvent>>,
    }

    impl Script {
        fn refused() -> Self {
            Self {
                connect: Err(PushError::connection_failed("refused")),
                events: VecDeque::new(),
            }
        }

        fn serving(events: Vec<PushResult<PushEvent>>) -> Self {
            Self {
                connect: Ok(()),
                events: events.into(),
            }
        }
    }

    struct ScriptedConnection {
        script: Option<Script>,
        connected: bool,
    }

    #[async_trait]
    impl PushConnection for ScriptedConnection {
        async fn connect(&mut self, _url: &str) -> PushResult<()> {
            let result = match self.script.as_mut() {
                Some(script) => std::mem::replace(&mut script.connect, Ok(())),
                None => Err(PushError::connection_failed("no script left")),
            };
            self.connected = result.is_ok();
            result
        }

        async fn disconnect(&mut self) {
            self.connected = false;
        }

        async fn receive(&mut self) -> PushResult<PushEvent> {
            match self.script.as_mut().and_then(|s| s.events.pop_front()) {
                Some(next) => next,
                None => std::future::pending().await,
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn client(scripts: Vec<Script>, config: PushClientConfig) -> PushClient {
        let scripts = Arc::new(Mutex::new(VecDeque::from(scripts)));
        PushClient::with_connector(
            "ws://club.example.org/ws/",
            ApiToken::new_unchecked("c2VjcmV0LXRva2VuLXZhbHVl"),
            config,
            Arc::new(move || {
                Box::new(ScriptedConnection {
                    script: scripts.lock().pop_front(),
                    connected: false,
                }) as Box<dyn PushConnection>
            }),
        )
    }

    fn dropped(code: u16) -> PushResult<PushEvent> {
        Err(PushError::ConnectionClosed {
            code,
            reason: "test".into(),
        })
    }

    #[test]
    fn test_config_builder() {
        let config = PushClientConfig::new()
            .with_auto_reconnect(false)
            .with_max_reconnect_attempts(5);

        assert!(!config.auto_reconnect);
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_backoff_delay() {
        let delay0 = calculate_backoff_delay(0);
        let delay1 = calculate_backoff_delay(1);
        let delay2 = calculate_backoff_delay(2);

        assert!(delay0 < delay1);
        assert!(delay1 < delay2);

        let delay_max = calculate_backoff_delay(100);
        assert!(delay_max <= RECONNECT_DELAY_MAX + RECONNECT_JITTER_MAX);
    }

    #[test]
    fn test_channel_url() {
        let client = client(Vec::new(), PushClientConfig::new());
        let url = client.channel_url(SyncDomain::Messages).unwrap();
        assert_eq!(
            url.as_str(),
            "ws://club.example.org/ws/messages/?token=c2VjcmV0LXRva2VuLXZhbHVl"
        );
    }

    #[test]
    fn test_channel_url_rejects_http() {
        let client = PushClient::new(
            "https://club.example.org/ws",
            ApiToken::new_unchecked("c2VjcmV0LXRva2VuLXZhbHVl"),
            PushClientConfig::new(),
        );
        assert!(matches!(
            client.channel_url(SyncDomain::Notifications),
            Err(PushError::InvalidUrl { .. })
        ));
        assert!(client.open_channel(SyncDomain::Notifications).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_drop() {
        let event = PushEvent::UnreadCountUpdate { count: 2 };
        let client = client(
            vec![
                Script::serving(vec![Ok(event.clone()), dropped(1006)]),
                Script::serving(Vec::new()),
            ],
            PushClientConfig::new(),
        );

        let mut subscription = client.open_channel(SyncDomain::Notifications).unwrap();
        let mut events = subscription.take_events().unwrap();

        assert_eq!(events.recv().await, Some(ChannelEvent::Connected));
        assert_eq!(events.recv().await, Some(ChannelEvent::Push(event)));
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::Reconnecting { attempt: 1 })
        );
        assert_eq!(events.recv().await, Some(ChannelEvent::Connected));

        subscription.close();
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let client = client(
            vec![Script::refused(), Script::refused(), Script::refused()],
            PushClientConfig::new().with_max_reconnect_attempts(2),
        );

        let mut subscription = client.open_channel(SyncDomain::Messages).unwrap();
        let mut events = subscription.take_events().unwrap();

        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::Reconnecting { attempt: 1 })
        );
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::Reconnecting { attempt: 2 })
        );
        assert!(matches!(
            events.recv().await,
            Some(ChannelEvent::Error {
                recoverable: false,
                ..
            })
        ));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_token_is_fatal() {
        let client = client(
            vec![Script::serving(vec![dropped(4001)])],
            PushClientConfig::new(),
        );

        let mut subscription = client.open_channel(SyncDomain::Messages).unwrap();
        let mut events = subscription.take_events().unwrap();

        assert_eq!(events.recv().await, Some(ChannelEvent::Connected));
        assert!(matches!(
            events.recv().await,
            Some(ChannelEvent::Error {
                recoverable: false,
                ..
            })
        ));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_auto_reconnect_reports_disconnect() {
        let client = client(
            vec![Script::serving(vec![dropped(1006)])],
            PushClientConfig::new().with_auto_reconnect(false),
        );

        let mut subscription = client.open_channel(SyncDomain::Notifications).unwrap();
        let mut events = subscription.take_events().unwrap();

        assert_eq!(events.recv().await, Some(ChannelEvent::Connected));
        assert!(matches!(
            events.recv().await,
            Some(ChannelEvent::Disconnected { .. })
        ));
        assert_eq!(events.recv().await, None);
    }
}
