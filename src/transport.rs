//! Transport abstraction for the link-layer write primitive.

use crate::peer::PeerId;

/// Outbound side of the GATT characteristic: one call per write/notify.
///
/// This trait lets the platform transport (Android GATT server/client, iOS
/// CoreBluetooth, an in-memory loopback in tests) be plugged into the
/// coordinators without coupling to a concrete implementation.
///
/// Returning `false` means the transport rejected the write; the caller
/// stops sending the remaining chunks of that payload. Implementations own
/// any pacing between chunks ([`crate::LinkConfig::inter_chunk_delay`]).
pub trait ChunkSink {
    fn write_chunk(&mut self, peer: &PeerId, chunk: &[u8]) -> bool;
}
