//! C ABI for linking bluecard-core as a static library from Android (NDK) or
//! iOS hosts. The JNI/Swift shim feeds transport callbacks in and forwards
//! the returned events, serialized as a JSON array, to the UI layer.
//!
//! Conventions: opaque handles from `*_create`, freed by `*_destroy`; calls
//! return -1 on null/short-buffer/usage errors and never panic across the
//! boundary. The shim supplies wall-clock context implicitly: this module is
//! host-side code and is the one place that reads `Instant::now()`.

use std::ffi::c_void;
use std::os::raw::{c_int, c_longlong};
use std::slice;
use std::time::Instant;

use crate::chunk::DEFAULT_CHUNK_BUDGET;
use crate::client::ClientCoordinator;
use crate::config::LinkConfig;
use crate::event::LinkEvent;
use crate::host::HostCoordinator;
use crate::peer::PeerId;

/// Returns the chunk budget at the default MTU. Exported so the staticlib
/// has a trivially testable symbol.
#[no_mangle]
pub extern "C" fn bluecard_default_chunk_budget() -> c_int {
    DEFAULT_CHUNK_BUDGET as c_int
}

fn read_bytes<'a>(ptr: *const u8, len: usize) -> Option<&'a [u8]> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { slice::from_raw_parts(ptr, len) })
}

fn read_str<'a>(ptr: *const u8, len: usize) -> Option<&'a str> {
    std::str::from_utf8(read_bytes(ptr, len)?).ok()
}

/// Serialize events as a JSON array into out_buf. Returns bytes written, or
/// -1 if the buffer is null or too small.
fn write_events(events: &[LinkEvent], out_buf: *mut u8, out_buf_len: usize) -> c_int {
    let json = match serde_json::to_vec(events) {
        Ok(j) => j,
        Err(_) => return -1,
    };
    if out_buf.is_null() || out_buf_len < json.len() {
        return -1;
    }
    unsafe {
        out_buf.copy_from_nonoverlapping(json.as_ptr(), json.len());
    }
    json.len() as c_int
}

/// Serialize a chunk plan: 4 bytes LE count, then per chunk 4 bytes LE length
/// + bytes. Returns bytes written, or -1 if the buffer is null or too small.
fn write_chunks(chunks: &[Vec<u8>], out_buf: *mut u8, out_buf_len: usize) -> c_int {
    let need = 4 + chunks.iter().map(|c| 4 + c.len()).sum::<usize>();
    if out_buf.is_null() || out_buf_len < need {
        return -1;
    }
    let buf = unsafe { slice::from_raw_parts_mut(out_buf, out_buf_len) };
    buf[0..4].copy_from_slice(&(chunks.len() as u32).to_le_bytes());
    let mut off = 4;
    for chunk in chunks {
        buf[off..off + 4].copy_from_slice(&(chunk.len() as u32).to_le_bytes());
        off += 4;
        buf[off..off + chunk.len()].copy_from_slice(chunk);
        off += chunk.len();
    }
    off as c_int
}

// Host coordinator

/// Create a host coordinator with default configuration. Returns opaque
/// handle; free with `bluecard_host_destroy`.
#[no_mangle]
pub extern "C" fn bluecard_host_create() -> *mut c_void {
    Box::into_raw(Box::new(HostCoordinator::new(LinkConfig::default()))) as *mut c_void
}

/// Destroy a host handle. No-op if h is null.
#[no_mangle]
pub extern "C" fn bluecard_host_destroy(h: *mut c_void) {
    if h.is_null() {
        return;
    }
    let _ = unsafe { Box::from_raw(h as *mut HostCoordinator) };
}

/// Start accepting transport events. Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn bluecard_host_start(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let host = unsafe { &mut *(h as *mut HostCoordinator) };
    match host.start() {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Stop and drop all per-peer state. Returns 0, or -1 if h is null.
#[no_mangle]
pub extern "C" fn bluecard_host_stop(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let host = unsafe { &mut *(h as *mut HostCoordinator) };
    host.stop();
    0
}

/// Connection-state callback. `name` may be null/empty for nameless devices.
/// Writes the resulting events (JSON array) to out_buf; returns bytes
/// written, or -1 on error.
#[no_mangle]
pub extern "C" fn bluecard_host_connection_changed(
    h: *mut c_void,
    addr: *const u8,
    addr_len: usize,
    name: *const u8,
    name_len: usize,
    connected: c_int,
    out_buf: *mut u8,
    out_buf_len: usize,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let host = unsafe { &mut *(h as *mut HostCoordinator) };
    let Some(addr) = read_str(addr, addr_len) else {
        return -1;
    };
    let name = if name.is_null() {
        ""
    } else {
        match read_str(name, name_len) {
            Some(n) => n,
            None => return -1,
        }
    };
    match host.on_connection_state_changed(PeerId::new(addr), name, connected != 0) {
        Ok(events) => write_events(&events, out_buf, out_buf_len),
        Err(_) => -1,
    }
}

/// Raw bytes a client wrote to the characteristic. Writes the resulting
/// events (JSON array) to out_buf; returns bytes written, or -1 on error.
#[no_mangle]
pub extern "C" fn bluecard_host_chunk_received(
    h: *mut c_void,
    addr: *const u8,
    addr_len: usize,
    bytes: *const u8,
    bytes_len: usize,
    out_buf: *mut u8,
    out_buf_len: usize,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let host = unsafe { &mut *(h as *mut HostCoordinator) };
    let (Some(addr), Some(bytes)) = (read_str(addr, addr_len), read_bytes(bytes, bytes_len))
    else {
        return -1;
    };
    match host.on_chunk_received(&PeerId::new(addr), bytes, Instant::now()) {
        Ok(events) => write_events(&events, out_buf, out_buf_len),
        Err(_) => -1,
    }
}

/// MTU negotiated for one client's link. Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn bluecard_host_mtu_changed(
    h: *mut c_void,
    addr: *const u8,
    addr_len: usize,
    mtu: u16,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let host = unsafe { &mut *(h as *mut HostCoordinator) };
    let Some(addr) = read_str(addr, addr_len) else {
        return -1;
    };
    match host.on_mtu_negotiated(&PeerId::new(addr), mtu) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Chunk plan for a unicast send to one client (see `write_chunks` layout).
/// Returns bytes written, or -1 on error / unknown peer.
#[no_mangle]
pub extern "C" fn bluecard_host_plan_send(
    h: *mut c_void,
    addr: *const u8,
    addr_len: usize,
    payload: *const u8,
    payload_len: usize,
    out_buf: *mut u8,
    out_buf_len: usize,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let host = unsafe { &*(h as *const HostCoordinator) };
    let (Some(addr), Some(payload)) = (read_str(addr, addr_len), read_bytes(payload, payload_len))
    else {
        return -1;
    };
    match host.plan_send_to(&PeerId::new(addr), payload) {
        Some(chunks) => write_chunks(&chunks, out_buf, out_buf_len),
        None => -1,
    }
}

/// Number of currently connected clients, or -1 if h is null.
#[no_mangle]
pub extern "C" fn bluecard_host_peer_count(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let host = unsafe { &*(h as *const HostCoordinator) };
    host.connected_peer_count() as c_int
}

// Client coordinator

/// Create a client coordinator with default configuration. Returns opaque
/// handle; free with `bluecard_client_destroy`.
#[no_mangle]
pub extern "C" fn bluecard_client_create() -> *mut c_void {
    Box::into_raw(Box::new(ClientCoordinator::new(LinkConfig::default()))) as *mut c_void
}

/// Destroy a client handle. No-op if h is null.
#[no_mangle]
pub extern "C" fn bluecard_client_destroy(h: *mut c_void) {
    if h.is_null() {
        return;
    }
    let _ = unsafe { Box::from_raw(h as *mut ClientCoordinator) };
}

/// Start accepting transport events. Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn bluecard_client_start(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let client = unsafe { &mut *(h as *mut ClientCoordinator) };
    match client.start() {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Stop and reset the link. Returns 0, or -1 if h is null.
#[no_mangle]
pub extern "C" fn bluecard_client_stop(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let client = unsafe { &mut *(h as *mut ClientCoordinator) };
    client.stop();
    0
}

/// Connection-state callback for the host link. Writes the resulting events
/// (JSON array) to out_buf; returns bytes written, or -1 on error.
#[no_mangle]
pub extern "C" fn bluecard_client_connection_changed(
    h: *mut c_void,
    addr: *const u8,
    addr_len: usize,
    name: *const u8,
    name_len: usize,
    connected: c_int,
    out_buf: *mut u8,
    out_buf_len: usize,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let client = unsafe { &mut *(h as *mut ClientCoordinator) };
    let Some(addr) = read_str(addr, addr_len) else {
        return -1;
    };
    let name = if name.is_null() {
        ""
    } else {
        match read_str(name, name_len) {
            Some(n) => n,
            None => return -1,
        }
    };
    match client.on_connection_state_changed(PeerId::new(addr), name, connected != 0) {
        Ok(events) => write_events(&events, out_buf, out_buf_len),
        Err(_) => -1,
    }
}

/// One notification's worth of bytes from the host. Writes the resulting
/// events (JSON array) to out_buf; returns bytes written, or -1 on error.
#[no_mangle]
pub extern "C" fn bluecard_client_chunk_received(
    h: *mut c_void,
    bytes: *const u8,
    bytes_len: usize,
    out_buf: *mut u8,
    out_buf_len: usize,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let client = unsafe { &mut *(h as *mut ClientCoordinator) };
    let Some(bytes) = read_bytes(bytes, bytes_len) else {
        return -1;
    };
    match client.on_chunk_received(bytes, Instant::now()) {
        Ok(events) => write_events(&events, out_buf, out_buf_len),
        Err(_) => -1,
    }
}

/// MTU negotiated for the host link. Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn bluecard_client_mtu_changed(h: *mut c_void, mtu: u16) -> c_int {
    if h.is_null() {
        return -1;
    }
    let client = unsafe { &mut *(h as *mut ClientCoordinator) };
    match client.on_mtu_negotiated(mtu) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Chunk plan for a send to the host (see `write_chunks` layout). Returns
/// bytes written, or -1 on error.
#[no_mangle]
pub extern "C" fn bluecard_client_plan_send(
    h: *mut c_void,
    payload: *const u8,
    payload_len: usize,
    out_buf: *mut u8,
    out_buf_len: usize,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let client = unsafe { &*(h as *const ClientCoordinator) };
    let Some(payload) = read_bytes(payload, payload_len) else {
        return -1;
    };
    write_chunks(&client.plan_send(payload), out_buf, out_buf_len)
}

/// 1 if connected to a host, 0 if not, -1 if h is null.
#[no_mangle]
pub extern "C" fn bluecard_client_is_connected(h: *mut c_void) -> c_int {
    if h.is_null() {
        return -1;
    }
    let client = unsafe { &*(h as *const ClientCoordinator) };
    client.is_connected() as c_int
}

/// Milliseconds since the last complete frame arrived, or -1 if none yet (or
/// h is null). For staleness display in the UI.
#[no_mangle]
pub extern "C" fn bluecard_client_last_frame_age_ms(h: *mut c_void) -> c_longlong {
    if h.is_null() {
        return -1;
    }
    let client = unsafe { &*(h as *const ClientCoordinator) };
    match client.last_frame_at() {
        Some(at) => Instant::now().saturating_duration_since(at).as_millis() as c_longlong,
        None => -1,
    }
}
