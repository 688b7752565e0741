//! Link events and coordinator lifecycle.

use serde::Serialize;

use crate::peer::PeerId;
use crate::reassembly::Frame;

/// Events a coordinator produces for the UI/platform collaborator. They are
/// returned from the inbound entry points rather than pushed through
/// registered callbacks, so "callback not yet set" is unrepresentable and no
/// event can be silently swallowed. Serializes as tagged JSON for the
/// platform bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LinkEvent {
    /// Fired at most once per physical connect, deduplicated.
    PeerConnected { peer: PeerId, name: String },
    /// Fired at most once per physical disconnect, deduplicated.
    PeerDisconnected { peer: PeerId, name: String },
    /// One fully reassembled JSON message, in arrival order.
    FrameReceived { peer: PeerId, frame: Frame },
}

/// Coordinator lifecycle. A coordinator is an owned value with an explicit
/// start/stop handle, not a process-global service: transport events are
/// accepted only while `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    Stopped,
}

/// Lifecycle misuse by the embedder. Reportable, never silently ignored.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("coordinator is not running")]
    NotRunning,
    #[error("coordinator is already running")]
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_as_tagged_json() {
        let event = LinkEvent::PeerConnected {
            peer: PeerId::new("AA:BB:CC"),
            name: "Alice".to_owned(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "peer_connected");
        assert_eq!(json["peer"], "AA:BB:CC");
        assert_eq!(json["name"], "Alice");
    }
}
