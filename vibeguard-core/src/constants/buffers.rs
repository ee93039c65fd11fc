//! Buffer Sizes
//!
//! Fixed capacities for the few byte buffers the loop owns. Everything is
//! stack allocated so the hot path never touches a heap.

/// Maximum encoded telemetry payload size (bytes).
///
/// `{"score":<f>,"threshold":<f>,"status":"FAULT"}` with two-decimal floats
/// fits comfortably for any finite `f32`.
pub const MAX_PAYLOAD_LEN: usize = 128;

/// Capacity of the MQTT client identifier buffer (bytes, including the
/// terminator slot kept by the firmware).
///
/// Identifiers are truncated to `CLIENT_ID_CAPACITY - 1` bytes.
pub const CLIENT_ID_CAPACITY: usize = 32;
