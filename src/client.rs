//! Client coordinator: the single link to a host.

use std::time::Instant;

use tracing::{debug, warn};

use crate::config::LinkConfig;
use crate::event::{Lifecycle, LinkEvent, UsageError};
use crate::peer::{PeerId, PeerInfo};
use crate::session::LinkSession;
use crate::transport::ChunkSink;

/// Client-side engine for the one connection to a host. Same event-in /
/// events-out shape as [`crate::HostCoordinator`], with a single session.
pub struct ClientCoordinator {
    lifecycle: Lifecycle,
    session: LinkSession,
    host: Option<PeerInfo>,
    last_frame_at: Option<Instant>,
}

impl ClientCoordinator {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            lifecycle: Lifecycle::Created,
            session: LinkSession::new(&config),
            host: None,
            last_frame_at: None,
        }
    }

    pub fn start(&mut self) -> Result<(), UsageError> {
        if self.lifecycle == Lifecycle::Running {
            return Err(UsageError::AlreadyRunning);
        }
        self.lifecycle = Lifecycle::Running;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.lifecycle = Lifecycle::Stopped;
        self.session.on_disconnect();
        self.host = None;
        self.last_frame_at = None;
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

    /// Connection-state callback for the host link. Duplicate transitions in
    /// the same direction are absorbed; only real connects/disconnects emit
    /// an event. On disconnect the session resets (default budget, empty
    /// buffer) so a reconnect starts clean.
    pub fn on_connection_state_changed(
        &mut self,
        id: PeerId,
        display_name: &str,
        connected: bool,
    ) -> Result<Vec<LinkEvent>, UsageError> {
        self.ensure_running()?;
        let mut events = Vec::new();
        if connected {
            if self.host.is_some() {
                debug!("already connected, duplicate connect from {} ignored", id);
            } else {
                let info = PeerInfo::new(id, display_name);
                debug!("connected to host {} ({})", info.display_name, info.id);
                events.push(LinkEvent::PeerConnected {
                    peer: info.id.clone(),
                    name: info.display_name.clone(),
                });
                self.host = Some(info);
            }
        } else if let Some(info) = self.host.take() {
            debug!("disconnected from host {} ({})", info.display_name, info.id);
            self.session.on_disconnect();
            events.push(LinkEvent::PeerDisconnected {
                peer: info.id,
                name: info.display_name,
            });
        }
        Ok(events)
    }

    /// One notification's worth of bytes from the host. Returns a
    /// `FrameReceived` event per completed frame and records the time of the
    /// last completed frame for staleness display.
    pub fn on_chunk_received(
        &mut self,
        chunk: &[u8],
        now: Instant,
    ) -> Result<Vec<LinkEvent>, UsageError> {
        self.ensure_running()?;
        let Some(host) = &self.host else {
            debug!("dropping {} bytes received while not connected", chunk.len());
            return Ok(Vec::new());
        };
        let frames = self.session.on_chunk_received(chunk, now);
        if !frames.is_empty() {
            self.last_frame_at = Some(now);
        }
        Ok(frames
            .into_iter()
            .map(|frame| LinkEvent::FrameReceived {
                peer: host.id.clone(),
                frame,
            })
            .collect())
    }

    pub fn on_mtu_negotiated(&mut self, new_mtu: u16) -> Result<(), UsageError> {
        self.ensure_running()?;
        self.session.on_mtu_negotiated(new_mtu);
        Ok(())
    }

    /// Chunk plan for a payload at the current link budget.
    pub fn plan_send(&self, payload: &[u8]) -> Vec<Vec<u8>> {
        self.session.plan_send(payload)
    }

    /// Send one payload to the host: every chunk in order, stopping at the
    /// first rejected write. True only when all chunks were written (an empty
    /// payload plans zero chunks and trivially succeeds). False when not
    /// connected.
    pub fn send(&self, payload: &[u8], sink: &mut dyn ChunkSink) -> Result<bool, UsageError> {
        self.ensure_running()?;
        let Some(host) = &self.host else {
            warn!("send while not connected to a host");
            return Ok(false);
        };
        let chunks = self.session.plan_send(payload);
        for (i, chunk) in chunks.iter().enumerate() {
            if !sink.write_chunk(&host.id, chunk) {
                warn!("write to host rejected at chunk {}/{}", i + 1, chunks.len());
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn is_connected(&self) -> bool {
        self.host.is_some()
    }

    pub fn host(&self) -> Option<&PeerInfo> {
        self.host.as_ref()
    }

    /// When the last complete frame arrived. Survives reconnects; cleared by
    /// [`ClientCoordinator::stop`].
    pub fn last_frame_at(&self) -> Option<Instant> {
        self.last_frame_at
    }
}
