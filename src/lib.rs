//! BlueCard link layer: MTU-sized chunk framing and connection registry.
//! Host-driven: no I/O; the platform passes transport events in and receives
//! frames and link events back.

pub mod chunk;
pub mod client;
pub mod config;
pub mod event;
pub mod ffi;
pub mod host;
pub mod peer;
pub mod reassembly;
pub mod session;
pub mod transport;

pub use chunk::{budget_for_mtu, split_payload, SplitError, DEFAULT_CHUNK_BUDGET, DEFAULT_MTU};
pub use client::ClientCoordinator;
pub use config::LinkConfig;
pub use event::{Lifecycle, LinkEvent, UsageError};
pub use host::HostCoordinator;
pub use peer::{AddOutcome, PeerId, PeerInfo, PeerRegistry, RemoveOutcome};
pub use reassembly::{Frame, FrameReassembler};
pub use session::LinkSession;
pub use transport::ChunkSink;
