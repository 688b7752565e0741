//! Configuration for link sessions and coordinators.

use std::time::Duration;

use crate::chunk::DEFAULT_MTU;
use crate::reassembly::DEFAULT_MAX_BUFFER;

/// Tuning knobs shared by every session a coordinator creates.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// MTU assumed for a connection until the transport reports a negotiated
    /// value; also what the budget resets to on disconnect.
    pub initial_mtu: u16,
    /// Cap on buffered bytes per connection awaiting a closing brace. On
    /// overflow the buffer is dropped and a warning logged. 0 = unbounded.
    pub max_reassembly_buffer: usize,
    /// Suggested pause between chunks of a multi-chunk send, to avoid
    /// overrunning the link-layer write queue. Applied by the transport; this
    /// crate never sleeps.
    pub inter_chunk_delay: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            initial_mtu: DEFAULT_MTU,
            max_reassembly_buffer: DEFAULT_MAX_BUFFER,
            inter_chunk_delay: Duration::from_millis(5),
        }
    }
}
