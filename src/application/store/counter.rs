//! Incrementally maintained unread counter.

/// How far the counter can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterState {
    /// No server value received yet.
    #[default]
    Unknown,
    /// Matches the last server value.
    Synced,
    /// Local updates applied since the last server value.
    Drifting {
        /// Number of local updates since the last resync.
        pending: u32,
    },
}

/// Unread counter readable in O(1).
///
/// Local mutations adjust it incrementally; [`resync`](Self::resync)
/// overwrites it with the server's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadCounter {
    value: u32,
    state: CounterState,
}

impl UnreadCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: 0,
            state: CounterState::Unknown,
        }
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }

    #[must_use]
    pub const fn state(&self) -> CounterState {
        self.state
    }

    pub const fn increment(&mut self) {
        self.value = self.value.saturating_add(1);
        self.record_local_update();
    }

    /// Decrements by `n`, clamped at zero.
    pub const fn decrement_by(&mut self, n: u32) {
        if n == 0 {
            return;
        }
        self.value = self.value.saturating_sub(n);
        self.record_local_update();
    }

    /// Overwrites the counter with the server's value.
    pub const fn resync(&mut self, server_count: u32) {
        self.value = server_count;
        self.state = CounterState::Synced;
    }

    /// Returns whether at least `threshold` local updates were applied since
    /// the last resync. A zero threshold disables drift-triggered resyncs.
    #[must_use]
    pub const fn needs_resync(&self, threshold: u32) -> bool {
        match self.state {
            CounterState::Drifting { pending } => threshold > 0 && pending >= threshold,
            CounterState::Unknown | CounterState::Synced => false,
        }
    }

    const fn record_local_update(&mut self) {
        self.state = match self.state {
            CounterState::Unknown => CounterState::Unknown,
            CounterState::Synced => CounterState::Drifting { pending: 1 },
            CounterState::Drifting { pending } => CounterState::Drifting {
                pending: pending.saturating_add(1),
            },
        };
    }
}
