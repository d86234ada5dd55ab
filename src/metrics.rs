//! Metric helpers for `wsframe`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. With the
//! `metrics` feature disabled the helpers compile to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking active connections.
pub const CONNECTIONS_ACTIVE: &str = "wsframe_connections_active";
/// Name of the counter tracking processed frames.
pub const FRAMES_PROCESSED: &str = "wsframe_frames_processed_total";
/// Name of the counter tracking protocol violations, labelled by category.
pub const ERRORS_TOTAL: &str = "wsframe_errors_total";
/// Name of the counter tracking completed connections, labelled by close code.
pub const CLOSES_TOTAL: &str = "wsframe_closes_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Frames decoded from the peer.
    Inbound,
    /// Frames fully written to the transport.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the active connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the active connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a processed frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_PROCESSED, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a protocol violation of the given category.
///
/// `error_type` is normally [`ProtocolError::error_type`].
///
/// [`ProtocolError::error_type`]: crate::error::ProtocolError::error_type
pub fn inc_errors(error_type: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "error_type" => error_type).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = error_type;
}

/// Record a connection reaching the closed state with `code`.
pub fn inc_closes(code: u16) {
    #[cfg(feature = "metrics")]
    counter!(CLOSES_TOTAL, "code" => code.to_string()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = code;
}
