//! Connection state machine for one channel.

use crate::types::ConnectionStatus;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Internal lifecycle state. `Created` is reported as [`ConnectionStatus::Disconnected`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ChannelState {
    #[default]
    Created,
    Connecting,
    Connected,
    Closing,
    Disconnected,
}

/// Inputs that drive [`ChannelState`] transitions, from API calls or dispatcher callbacks.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ChannelEvent {
    /// `start()` armed a connect or accept interest.
    Start,
    /// Outbound connect completed.
    ConnectOk,
    /// Outbound connect failed asynchronously.
    ConnectFailed,
    /// The channel was created for an inbound connection.
    Accepted,
    /// The peer closed the connection or the socket errored.
    PeerClosed,
    /// `stop()` began tearing the channel down.
    Stop,
    /// Socket released after `stop()`.
    Closed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InvalidTransition {
    pub from: ChannelState,
    pub event: ChannelEvent,
}

impl Display for InvalidTransition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "event {:?} is not valid in state {}", self.event, self.from)
    }
}

impl Error for InvalidTransition {}

impl ChannelState {
    /// Returns the state reached by applying `event`.
    pub fn on(self, event: ChannelEvent) -> Result<ChannelState, InvalidTransition> {
        use ChannelEvent::*;
        use ChannelState::*;

        let next = match (self, event) {
            (Created | Disconnected, Start) => Connecting,
            (Connecting, ConnectOk) => Connected,
            (Connecting, ConnectFailed) => Disconnected,
            (Created, Accepted) => Connected,
            (Connected, PeerClosed) => Disconnected,
            (Created | Disconnected, Stop) => Disconnected,
            (Connecting | Connected | Closing, Stop) => Closing,
            (Closing, Closed) => Disconnected,
            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }

    pub fn connection_status(self) -> ConnectionStatus {
        match self {
            ChannelState::Created | ChannelState::Disconnected => ConnectionStatus::Disconnected,
            ChannelState::Connecting => ConnectionStatus::Connecting,
            ChannelState::Connected => ConnectionStatus::Connected,
            ChannelState::Closing => ConnectionStatus::Closing,
        }
    }

    /// Active channels hold event interest and must be stopped before rebinding.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ChannelState::Connecting | ChannelState::Connected | ChannelState::Closing
        )
    }
}

impl Display for ChannelState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Created => write!(f, "created"),
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Connected => write!(f, "connected"),
            ChannelState::Closing => write!(f, "closing"),
            ChannelState::Disconnected => write!(f, "disconnected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelEvent, ChannelState, InvalidTransition};
    use crate::types::ConnectionStatus;

    #[test]
    fn happy_path_walks_to_disconnected() {
        let state = ChannelState::Created
            .on(ChannelEvent::Start)
            .and_then(|state| state.on(ChannelEvent::ConnectOk))
            .and_then(|state| state.on(ChannelEvent::Stop))
            .and_then(|state| state.on(ChannelEvent::Closed))
            .expect("lifecycle should be valid");

        assert_eq!(state, ChannelState::Disconnected);
    }

    #[test]
    fn failed_connect_and_peer_close_return_to_disconnected() {
        assert_eq!(
            ChannelState::Connecting.on(ChannelEvent::ConnectFailed),
            Ok(ChannelState::Disconnected)
        );
        assert_eq!(
            ChannelState::Connected.on(ChannelEvent::PeerClosed),
            Ok(ChannelState::Disconnected)
        );
    }

    #[test]
    fn stop_is_idempotent_on_inactive_channels() {
        assert_eq!(
            ChannelState::Created.on(ChannelEvent::Stop),
            Ok(ChannelState::Disconnected)
        );
        assert_eq!(
            ChannelState::Disconnected.on(ChannelEvent::Stop),
            Ok(ChannelState::Disconnected)
        );
    }

    #[test]
    fn restart_after_disconnect_is_allowed() {
        assert_eq!(
            ChannelState::Disconnected.on(ChannelEvent::Start),
            Ok(ChannelState::Connecting)
        );
    }

    #[test]
    fn callbacks_after_stop_are_rejected() {
        assert_eq!(
            ChannelState::Disconnected.on(ChannelEvent::ConnectOk),
            Err(InvalidTransition {
                from: ChannelState::Disconnected,
                event: ChannelEvent::ConnectOk,
            })
        );
        assert!(ChannelState::Connected.on(ChannelEvent::Start).is_err());
        assert!(ChannelState::Connecting.on(ChannelEvent::Accepted).is_err());
    }

    #[test]
    fn created_reports_disconnected_status() {
        assert_eq!(
            ChannelState::Created.connection_status(),
            ConnectionStatus::Disconnected
        );
        assert!(!ChannelState::Created.is_active());
        assert!(ChannelState::Connecting.is_active());
    }
}
