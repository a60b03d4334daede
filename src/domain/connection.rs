/// Lifecycle of a domain's push channel as seen by its subscription manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting {
        attempt: u32,
    },
    Stopped,
}

impl ChannelState {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Connected | Self::Reconnecting { .. }
        )
    }

    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    #[must_use]
    pub const fn reconnect_attempt(&self) -> Option<u32> {
        if let Self::Reconnecting { attempt } = self {
            Some(*attempt)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting { attempt } => write!(f, "Reconnecting (attempt {attempt})"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_state_display() {
        assert_eq!(ChannelState::Connected.to_string(), "Connected");
        assert_eq!(
            ChannelState::Reconnecting { attempt: 3 }.to_string(),
            "Reconnecting (attempt 3)"
        );
    }

    #[test]
    fn test_channel_state_checks() {
        assert!(ChannelState::Connected.is_connected());
        assert!(ChannelState::Reconnecting { attempt: 1 }.is_active());
        assert!(!ChannelState::Stopped.is_active());
        assert_eq!(ChannelState::Connecting.reconnect_attempt(), None);
    }
}
