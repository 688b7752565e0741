//! Per-connection link session: chunk budget plus frame reassembly.

use std::time::Instant;

use crate::chunk;
use crate::config::LinkConfig;
use crate::reassembly::{Frame, FrameReassembler};

/// State for one physical connection. Owns the negotiated chunk budget and
/// the reassembly buffer for that link; mutated only by the transport
/// callback sequence of its one connection.
#[derive(Debug)]
pub struct LinkSession {
    default_budget: usize,
    budget: usize,
    reassembler: FrameReassembler,
    last_activity: Option<Instant>,
}

impl LinkSession {
    pub fn new(config: &LinkConfig) -> Self {
        let default_budget = chunk::budget_for_mtu(config.initial_mtu);
        Self {
            default_budget,
            budget: default_budget,
            reassembler: FrameReassembler::with_max_buffer(config.max_reassembly_buffer),
            last_activity: None,
        }
    }

    /// The transport negotiated a new MTU: budget becomes MTU minus the ATT
    /// header, floored at 1.
    pub fn on_mtu_negotiated(&mut self, new_mtu: u16) {
        self.budget = chunk::budget_for_mtu(new_mtu);
    }

    /// Feed one received chunk; returns the frames it completed. `now` is
    /// recorded as this link's last activity.
    pub fn on_chunk_received(&mut self, chunk: &[u8], now: Instant) -> Vec<Frame> {
        self.last_activity = Some(now);
        self.reassembler.ingest(chunk)
    }

    /// Split a payload at the current budget. The budget is clamped to at
    /// least 1, so the codec's invalid-budget path is unreachable here.
    pub fn plan_send(&self, payload: &[u8]) -> Vec<Vec<u8>> {
        chunk::split_payload(payload, self.budget).unwrap_or_default()
    }

    /// Reset for connection teardown: budget back to the default, buffer and
    /// activity cleared. Leaves the session ready for a fresh connection.
    pub fn on_disconnect(&mut self) {
        self.budget = self.default_budget;
        self.reassembler.clear();
        self.last_activity = None;
    }

    pub fn chunk_budget(&self) -> usize {
        self.budget
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> LinkSession {
        LinkSession::new(&LinkConfig::default())
    }

    #[test]
    fn default_budget_is_mtu_minus_overhead() {
        assert_eq!(session().chunk_budget(), 20);
    }

    #[test]
    fn mtu_negotiation_updates_budget() {
        let mut s = session();
        s.on_mtu_negotiated(512);
        assert_eq!(s.chunk_budget(), 509);
    }

    #[test]
    fn degenerate_mtu_clamps_to_one() {
        let mut s = session();
        s.on_mtu_negotiated(2);
        assert_eq!(s.chunk_budget(), 1);
        // Even at budget 1 a send still plans every byte.
        assert_eq!(s.plan_send(b"{}").len(), 2);
    }

    #[test]
    fn plan_send_uses_current_budget() {
        let mut s = session();
        let payload = vec![0u8; 45];
        assert_eq!(s.plan_send(&payload).len(), 3);
        s.on_mtu_negotiated(48);
        assert_eq!(s.plan_send(&payload).len(), 1);
    }

    #[test]
    fn split_then_ingest_roundtrip() {
        let mut s = session();
        let message = br#"{"k":"vvvvvvvvvvvvvvvvvvvvvvvvvvvvvvvvvvvvvvvv"}"#;
        let chunks = s.plan_send(message);
        assert!(chunks.len() > 1);
        let now = Instant::now();
        let mut frames = Vec::new();
        for chunk in &chunks {
            frames.extend(s.on_chunk_received(chunk, now));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), message);
    }

    #[test]
    fn chunk_received_records_activity() {
        let mut s = session();
        assert!(s.last_activity().is_none());
        let now = Instant::now();
        s.on_chunk_received(b"{", now);
        assert_eq!(s.last_activity(), Some(now));
    }

    #[test]
    fn disconnect_resets_state() {
        let mut s = session();
        s.on_mtu_negotiated(512);
        s.on_chunk_received(br#"{"partial":"#, Instant::now());
        s.on_disconnect();
        assert_eq!(s.chunk_budget(), 20);
        assert!(s.last_activity().is_none());
        // No leftover bytes leak into the next connection's first message.
        let frames = s.on_chunk_received(br#"{"fresh":1}"#, Instant::now());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].to_text(), r#"{"fresh":1}"#);
    }
}
