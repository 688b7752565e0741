//! Host coordinator: one link session per connected client.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, warn};

use crate::config::LinkConfig;
use crate::event::{Lifecycle, LinkEvent, UsageError};
use crate::peer::{AddOutcome, PeerId, PeerInfo, PeerRegistry, RemoveOutcome};
use crate::session::LinkSession;
use crate::transport::ChunkSink;

/// Host-side engine. The platform's GATT-server callbacks feed events in;
/// each call returns the [`LinkEvent`]s to forward to the UI collaborator.
/// Connect and disconnect are gated through the registry so duplicate OS
/// callbacks never double-notify. Frames are dispatched for every connected
/// peer unconditionally; lobby/game acceptance policy is layered on top by
/// the embedder, not here.
pub struct HostCoordinator {
    config: LinkConfig,
    lifecycle: Lifecycle,
    sessions: HashMap<PeerId, LinkSession>,
    registry: PeerRegistry,
}

impl HostCoordinator {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            lifecycle: Lifecycle::Created,
            sessions: HashMap::new(),
            registry: PeerRegistry::new(),
        }
    }

    /// Accept transport events from now on. Starting twice is a usage error;
    /// a stopped coordinator may be started again (fresh, empty state).
    pub fn start(&mut self) -> Result<(), UsageError> {
        if self.lifecycle == Lifecycle::Running {
            return Err(UsageError::AlreadyRunning);
        }
        self.lifecycle = Lifecycle::Running;
        Ok(())
    }

    /// Stop accepting events and drop all per-peer state.
    pub fn stop(&mut self) {
        self.lifecycle = Lifecycle::Stopped;
        self.sessions.clear();
        self.registry.clear();
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn ensure_running(&self) -> Result<(), UsageError> {
        if self.lifecycle == Lifecycle::Running {
            Ok(())
        } else {
            Err(UsageError::NotRunning)
        }
    }

    /// Connection-state callback from the GATT server. Emits at most one
    /// event per real transition; duplicates are absorbed by the registry.
    pub fn on_connection_state_changed(
        &mut self,
        id: PeerId,
        display_name: &str,
        connected: bool,
    ) -> Result<Vec<LinkEvent>, UsageError> {
        self.ensure_running()?;
        let mut events = Vec::new();
        if connected {
            let info = PeerInfo::new(id.clone(), display_name);
            let name = info.display_name.clone();
            if self.registry.add(info) == AddOutcome::Added {
                debug!("client connected: {} ({}), total {}", name, id, self.registry.count());
                self.sessions.insert(id.clone(), LinkSession::new(&self.config));
                events.push(LinkEvent::PeerConnected { peer: id, name });
            }
        } else if let RemoveOutcome::Removed(info) = self.registry.remove(&id) {
            debug!(
                "client disconnected: {} ({}), remaining {}",
                info.display_name,
                id,
                self.registry.count()
            );
            self.sessions.remove(&id);
            events.push(LinkEvent::PeerDisconnected {
                peer: id,
                name: info.display_name,
            });
        }
        Ok(events)
    }

    /// Raw bytes a client wrote to the shared characteristic. Returns a
    /// `FrameReceived` event per frame the chunk completed, in order.
    pub fn on_chunk_received(
        &mut self,
        id: &PeerId,
        chunk: &[u8],
        now: Instant,
    ) -> Result<Vec<LinkEvent>, UsageError> {
        self.ensure_running()?;
        let Some(session) = self.sessions.get_mut(id) else {
            debug!("dropping {} bytes from unknown peer {}", chunk.len(), id);
            return Ok(Vec::new());
        };
        let frames = session.on_chunk_received(chunk, now);
        Ok(frames
            .into_iter()
            .map(|frame| LinkEvent::FrameReceived {
                peer: id.clone(),
                frame,
            })
            .collect())
    }

    /// MTU negotiated for one client's link. Unknown peers are ignored.
    pub fn on_mtu_negotiated(&mut self, id: &PeerId, new_mtu: u16) -> Result<(), UsageError> {
        self.ensure_running()?;
        if let Some(session) = self.sessions.get_mut(id) {
            session.on_mtu_negotiated(new_mtu);
        }
        Ok(())
    }

    /// Chunk plan for a unicast send to one client, at that link's budget.
    /// None if the peer is not connected.
    pub fn plan_send_to(&self, id: &PeerId, payload: &[u8]) -> Option<Vec<Vec<u8>>> {
        self.sessions.get(id).map(|s| s.plan_send(payload))
    }

    /// Best-effort multicast to every connected client: plan per link, write
    /// chunks in order, and stop a peer's remaining chunks on the first
    /// rejected write. Returns true iff at least one peer accepted the first
    /// chunk of its plan, so a single reachable client keeps the game going.
    pub fn broadcast(&self, payload: &[u8], sink: &mut dyn ChunkSink) -> Result<bool, UsageError> {
        self.ensure_running()?;
        if self.sessions.is_empty() {
            warn!("broadcast with no clients connected");
            return Ok(false);
        }
        let mut any_delivered = false;
        for (id, session) in &self.sessions {
            let chunks = session.plan_send(payload);
            for (i, chunk) in chunks.iter().enumerate() {
                if !sink.write_chunk(id, chunk) {
                    debug!("write to {} rejected at chunk {}/{}", id, i + 1, chunks.len());
                    break;
                }
                if i == 0 {
                    any_delivered = true;
                }
            }
        }
        Ok(any_delivered)
    }

    pub fn connected_peer_count(&self) -> usize {
        self.registry.count()
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerInfo> {
        self.registry.iter()
    }
}
