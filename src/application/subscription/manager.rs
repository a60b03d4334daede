use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::handler::{PushHandler, dispatch};
use crate::domain::connection::ChannelState;
use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::ports::{ChannelEvent, PushChannelPort, Subscription, SyncDomain};

struct ActiveSession {
    subscription: Subscription,
    pump: JoinHandle<()>,
}

struct Inner {
    channel: Arc<dyn PushChannelPort>,
    handler: Arc<dyn PushHandler>,
    state: watch::Sender<ChannelState>,
    session: Mutex<Option<ActiveSession>>,
}

impl Inner {
    fn domain(&self) -> SyncDomain {
        self.handler.domain()
    }

    /// Moves to `next` unless the manager was stopped.
    fn transition(&self, next: ChannelState) {
        self.state.send_if_modified(|state| {
            if state.is_stopped() || *state == next {
                return false;
            }
            debug!(domain = %self.handler.domain(), from = %state, to = %next, "Channel state");
            *state = next;
            true
        });
    }
}

/// Owns one push channel for a domain and feeds its events to a handler.
///
/// Cloning yields another handle to the same channel.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Inner>,
}

impl SubscriptionManager {
    #[must_use]
    pub fn new(channel: Arc<dyn PushChannelPort>, handler: Arc<dyn PushHandler>) -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                channel,
                handler,
                state,
                session: Mutex::new(None),
            }),
        }
    }

    /// Opens the channel. Calling it while a channel is already active does
    /// nothing.
    ///
    /// # Errors
    /// Returns `SyncError::Channel` after [`stop`](Self::stop) or when the
    /// channel cannot be opened.
    pub fn start(&self) -> SyncResult<()> {
        let current = self.state();
        if current.is_stopped() {
            return Err(SyncError::channel("subscription manager is stopped"));
        }
        if current.is_active() {
            debug!(domain = %self.inner.domain(), state = %current, "Channel already active");
            return Ok(());
        }

        if let Some(previous) = self.inner.session.lock().take() {
            previous.subscription.close();
            previous.pump.abort();
        }

        self.inner.transition(ChannelState::Connecting);
        info!(domain = %self.inner.domain(), "Opening push channel");

        let mut subscription = match self.inner.channel.open_channel(self.inner.domain()) {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(domain = %self.inner.domain(), error = %e, "Failed to open push channel");
                self.inner.transition(ChannelState::Disconnected);
                return Err(e);
            }
        };

        let Some(events) = subscription.take_events() else {
            warn!(domain = %self.inner.domain(), "Push channel opened without an event stream");
            self.inner.transition(ChannelState::Disconnected);
            return Err(SyncError::channel("subscription has no event stream"));
        };
        let pump = tokio::spawn(run_pump(self.inner.clone(), events));

        *self.inner.session.lock() = Some(ActiveSession { subscription, pump });
        Ok(())
    }

    /// Closes the channel for good. Idempotent.
    pub fn stop(&self) {
        self.inner.state.send_if_modified(|state| {
            if state.is_stopped() {
                return false;
            }
            *state = ChannelState::Stopped;
            true
        });

        if let Some(session) = self.inner.session.lock().take() {
            info!(domain = %self.inner.domain(), "Closing push channel");
            session.subscription.close();
            session.pump.abort();
        }
    }

    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn domain(&self) -> SyncDomain {
        self.inner.domain()
    }
}

async fn run_pump(inner: Arc<Inner>, mut events: mpsc::UnboundedReceiver<ChannelEvent>) {
    while let Some(event) = events.recv().await {
        handle_event(&inner, event).await;
    }

    debug!(domain = %inner.domain(), "Push channel event stream ended");
    inner.transition(ChannelState::Disconnected);
}

async fn handle_event(inner: &Inner, event: ChannelEvent) {
    match event {
        ChannelEvent::Connected => {
            inner.transition(ChannelState::Connected);
            info!(domain = %inner.domain(), "Push channel connected, resyncing counters");
            if let Err(e) = inner.handler.resync().await {
                warn!(domain = %inner.domain(), error = %e, "Counter resync failed");
            }
        }
        ChannelEvent::Reconnecting { attempt } => {
            inner.transition(ChannelState::Reconnecting { attempt });
        }
        ChannelEvent::Disconnected { reason } => {
            info!(domain = %inner.domain(), reason = %reason, "Push channel disconnected");
            inner.transition(ChannelState::Disconnected);
        }
        ChannelEvent::Error {
            message,
            recoverable,
        } => {
            warn!(domain = %inner.domain(), recoverable, error = %message, "Push channel error");
            if !recoverable {
                inner.transition(ChannelState::Disconnected);
            }
        }
        ChannelEvent::Push(event) => {
            trace!(domain = %inner.domain(), kind = event.kind(), "Dispatching push event");
            dispatch(inner.handler.as_ref(), event).await;
        }
    }
}
