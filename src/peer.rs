//! Peer identity and the connected-peer registry.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Display name used for devices that do not report one.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Opaque peer identity: the platform-reported device address. Stable for the
/// lifetime of one physical connection; a device that reconnects may reuse it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        PeerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A connected peer: identity plus display name. Created on the first
/// connected event for an id, destroyed on disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: PeerId,
    pub display_name: String,
}

impl PeerInfo {
    /// An empty display name is replaced with [`UNKNOWN_NAME`].
    pub fn new(id: PeerId, display_name: impl Into<String>) -> Self {
        let mut display_name = display_name.into();
        if display_name.is_empty() {
            display_name = UNKNOWN_NAME.to_owned();
        }
        PeerInfo { id, display_name }
    }
}

/// Outcome of [`PeerRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The id was already a member; the caller must not re-notify.
    AlreadyPresent,
}

/// Outcome of [`PeerRegistry::remove`]. `Removed` carries the stored info so
/// the disconnect notification can use the name recorded at connect time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(PeerInfo),
    /// The id was not a member; the caller must not re-notify.
    NotPresent,
}

/// Set of currently connected peers, keyed by id. Add and remove are
/// idempotent and report which outcome occurred, so duplicate
/// connection-state callbacks from the OS never produce duplicate
/// notifications downstream.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, PeerInfo>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, info: PeerInfo) -> AddOutcome {
        if self.peers.contains_key(&info.id) {
            debug!("peer {} already registered, duplicate connect ignored", info.id);
            return AddOutcome::AlreadyPresent;
        }
        self.peers.insert(info.id.clone(), info);
        AddOutcome::Added
    }

    pub fn remove(&mut self, id: &PeerId) -> RemoveOutcome {
        match self.peers.remove(id) {
            Some(info) => RemoveOutcome::Removed(info),
            None => {
                debug!("peer {} not registered, duplicate disconnect ignored", id);
                RemoveOutcome::NotPresent
            }
        }
    }

    pub fn get(&self, id: &PeerId) -> Option<&PeerInfo> {
        self.peers.get(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.peers.len()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerInfo> {
        self.peers.values()
    }
}
