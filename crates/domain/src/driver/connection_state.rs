use serde::{Deserialize, Serialize};

/// Connection state of the printer session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected, no active connection attempt
    Disconnected,
    /// Waiting for the driver to finish connecting
    Connecting,
    /// Session established, commands may be dispatched
    Connected,
}

impl ConnectionState {
    /// Check if state allows connection attempt
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    /// Transition to connecting state
    pub fn to_connecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::Disconnected => Ok(Self::Connecting),
            _ => Err("Can only connect from Disconnected state"),
        }
    }

    /// Transition to connected state
    pub fn to_connected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting => Ok(Self::Connected),
            _ => Err("Can only complete connection from Connecting state"),
        }
    }

    /// Transition to disconnected state
    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_disconnected() {
        let state = ConnectionState::default();
        assert_eq!(state, ConnectionState::Disconnected);
        assert!(state.can_connect());
        assert!(!state.is_connected());
    }

    #[test]
    fn test_transition_disconnected_to_connecting() {
        let next = ConnectionState::Disconnected.to_connecting().unwrap();
        assert_eq!(next, ConnectionState::Connecting);
        assert!(next.is_transitioning());
    }

    #[test]
    fn test_transition_connecting_to_connected() {
        let next = ConnectionState::Connecting.to_connected().unwrap();
        assert!(next.is_connected());
    }

    #[test]
    fn test_cannot_connect_twice() {
        assert!(ConnectionState::Connected.to_connecting().is_err());
        assert!(ConnectionState::Connecting.to_connecting().is_err());
        assert!(!ConnectionState::Connecting.can_connect());
    }

    #[test]
    fn test_cannot_skip_connecting() {
        assert!(ConnectionState::Disconnected.to_connected().is_err());
    }

    #[test]
    fn test_to_disconnected_from_any_state() {
        assert_eq!(
            ConnectionState::Connected.to_disconnected(),
            ConnectionState::Disconnected
        );
        assert_eq!(
            ConnectionState::Connecting.to_disconnected(),
            ConnectionState::Disconnected
        );
    }
}
