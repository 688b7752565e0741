//! Frame reassembly: accumulate raw chunks, extract balanced-brace JSON frames.
//!
//! Chunk boundaries carry no meaning; a message may arrive split across any
//! number of writes, and one write may carry the tail of one message plus the
//! head of the next. Framing is brace counting over the buffered bytes: a
//! frame is the span from the first `{` to the `}` that returns the depth to
//! zero. Braces are ASCII and never occur inside a multi-byte UTF-8 sequence,
//! so scanning bytes is exact even when a chunk boundary splits a character.
//!
//! Known limitation: `{` and `}` inside JSON string values are counted like
//! structural braces, so such payloads misframe.

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

/// Default cap on buffered bytes awaiting a closing brace.
pub const DEFAULT_MAX_BUFFER: usize = 64 * 1024;

/// One complete reassembled JSON-object message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Frame content as text. Invalid UTF-8 is replaced, not rejected.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Parse the frame as JSON. Framing does not validate content, so this
    /// can fail on payloads that merely balance their braces.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Frames cross the platform bridge embedded in event JSON as text.
impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Per-connection accumulator that turns a chunk stream back into frames.
/// Exclusively owned by one connection's session; cleared on disconnect.
#[derive(Debug)]
pub struct FrameReassembler {
    buffer: Vec<u8>,
    max_buffer: usize,
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::with_max_buffer(DEFAULT_MAX_BUFFER)
    }

    /// `max_buffer` bounds the unconsumed suffix kept between chunks; a
    /// suffix that outgrows it (no closing brace in sight) is dropped rather
    /// than held forever. 0 means unbounded.
    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_buffer,
        }
    }

    /// Append one received chunk and extract every frame completed by it, in
    /// arrival order. Never fails: content before the first `{` is noise and
    /// is discarded, a partial frame stays buffered for the next chunk.
    pub fn ingest(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        loop {
            let Some(open) = self.buffer.iter().position(|&b| b == b'{') else {
                if !self.buffer.is_empty() {
                    debug!("discarding {} noise bytes with no opening brace", self.buffer.len());
                    self.buffer.clear();
                }
                break;
            };
            match balanced_end(&self.buffer[open..]) {
                Some(rel) => {
                    let end = open + rel;
                    frames.push(Frame(self.buffer[open..=end].to_vec()));
                    // Leading noise goes with the frame.
                    self.buffer.drain(..=end);
                }
                None => break,
            }
        }
        if self.max_buffer > 0 && self.buffer.len() > self.max_buffer {
            warn!(
                "reassembly buffer overflow ({} > {} bytes), dropping buffered data",
                self.buffer.len(),
                self.max_buffer
            );
            self.buffer.clear();
        }
        frames
    }

    /// Drop all buffered bytes. Called on disconnect.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Bytes currently buffered awaiting a closing brace.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Index of the `}` that closes the `{` at `bytes[0]`, or None if the span is
/// still open at the end of the buffer.
fn balanced_end(bytes: &[u8]) -> Option<usize> {
    let mut depth: usize = 0;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(frames: &[Frame]) -> Vec<String> {
        frames.iter().map(Frame::to_text).collect()
    }

    #[test]
    fn single_chunk_single_frame() {
        let mut r = FrameReassembler::new();
        let frames = r.ingest(br#"{"move":1}"#);
        assert_eq!(texts(&frames), vec![r#"{"move":1}"#]);
        assert_eq!(r.buffered_len(), 0);
    }

    #[test]
    fn two_frames_in_one_chunk() {
        let mut r = FrameReassembler::new();
        let frames = r.ingest(br#"{"a":1}{"b":2}"#);
        assert_eq!(texts(&frames), vec![r#"{"a":1}"#, r#"{"b":2}"#]);
    }

    #[test]
    fn partial_frame_across_chunks() {
        let mut r = FrameReassembler::new();
        assert!(r.ingest(br#"{"x":"#).is_empty());
        let frames = r.ingest(b"1}");
        assert_eq!(texts(&frames), vec![r#"{"x":1}"#]);
    }

    #[test]
    fn frame_split_at_every_boundary() {
        let message = br#"{"cards":[{"suit":"hearts","rank":10},{"suit":"clubs","rank":2}]}"#;
        for cut in 1..message.len() {
            let mut r = FrameReassembler::new();
            assert!(r.ingest(&message[..cut]).is_empty(), "cut at {cut}");
            let frames = r.ingest(&message[cut..]);
            assert_eq!(frames.len(), 1, "cut at {cut}");
            assert_eq!(frames[0].as_bytes(), message);
        }
    }

    #[test]
    fn nested_braces_form_one_frame() {
        let mut r = FrameReassembler::new();
        let frames = r.ingest(br#"{"state":{"round":2,"scores":{"a":3}}}"#);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].to_text(), r#"{"state":{"round":2,"scores":{"a":3}}}"#);
    }

    #[test]
    fn noise_before_frame_is_discarded() {
        let mut r = FrameReassembler::new();
        let frames = r.ingest(br#"garbage{"y":2}"#);
        assert_eq!(texts(&frames), vec![r#"{"y":2}"#]);
    }

    #[test]
    fn noise_without_brace_is_dropped() {
        let mut r = FrameReassembler::new();
        assert!(r.ingest(b"no json here").is_empty());
        assert_eq!(r.buffered_len(), 0);
        // The reassembler stays usable afterwards.
        let frames = r.ingest(br#"{"ok":true}"#);
        assert_eq!(texts(&frames), vec![r#"{"ok":true}"#]);
    }

    #[test]
    fn tail_after_frame_stays_buffered() {
        let mut r = FrameReassembler::new();
        let frames = r.ingest(br#"{"a":1}{"b""#);
        assert_eq!(texts(&frames), vec![r#"{"a":1}"#]);
        assert_eq!(r.buffered_len(), 4);
        let frames = r.ingest(b":2}");
        assert_eq!(texts(&frames), vec![r#"{"b":2}"#]);
    }

    #[test]
    fn stray_closing_brace_is_noise() {
        let mut r = FrameReassembler::new();
        let frames = r.ingest(br#"}}{"a":1}"#);
        assert_eq!(texts(&frames), vec![r#"{"a":1}"#]);
    }

    #[test]
    fn multibyte_utf8_split_across_chunks() {
        let message = r#"{"name":"Zoë ♠"}"#.as_bytes();
        // Cut inside the two-byte ë sequence.
        let cut = message.iter().position(|&b| b >= 0x80).unwrap() + 1;
        let mut r = FrameReassembler::new();
        assert!(r.ingest(&message[..cut]).is_empty());
        let frames = r.ingest(&message[cut..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].to_text(), r#"{"name":"Zoë ♠"}"#);
    }

    #[test]
    fn clear_drops_partial_frame() {
        let mut r = FrameReassembler::new();
        assert!(r.ingest(br#"{"stale":"#).is_empty());
        r.clear();
        let frames = r.ingest(br#"{"fresh":1}"#);
        assert_eq!(texts(&frames), vec![r#"{"fresh":1}"#]);
    }

    #[test]
    fn overflow_drops_buffer() {
        let mut r = FrameReassembler::with_max_buffer(16);
        assert!(r.ingest(br#"{"k":"aaaaaaaaaaaaaaaaaaaaaaaa"#).is_empty());
        assert_eq!(r.buffered_len(), 0);
        let frames = r.ingest(br#"{"next":1}"#);
        assert_eq!(texts(&frames), vec![r#"{"next":1}"#]);
    }

    #[test]
    fn frame_json_accessor() {
        let mut r = FrameReassembler::new();
        let frames = r.ingest(br#"{"move":1}"#);
        let value = frames[0].json().unwrap();
        assert_eq!(value["move"], 1);
    }

    #[test]
    fn frame_serializes_as_text() {
        let mut r = FrameReassembler::new();
        let frames = r.ingest(br#"{"a":1}"#);
        let json = serde_json::to_string(&frames[0]).unwrap();
        assert_eq!(json, r#""{\"a\":1}""#);
    }
}
