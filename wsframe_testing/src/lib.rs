//! Test helpers for exercising `wsframe` without real sockets.
//!
//! Sinks that trickle or fail, a handler that records every callback, and
//! builders for client-to-server wire bytes.
//!
//! ```rust
//! use wsframe::{frame::Frame, writer::FrameWriter};
//! use wsframe_testing::ChunkedSink;
//!
//! let mut writer = FrameWriter::new();
//! writer.enqueue(Frame::text("Hello"));
//! let mut sink = ChunkedSink::new(1);
//! while writer.can_write() {
//!     writer.write(&mut sink).expect("chunked sink never fails");
//! }
//! assert_eq!(sink.bytes(), b"\x81\x05Hello");
//! ```

mod frames;
mod handler;
mod logging;
mod sinks;

pub use frames::{CLIENT_KEY, client_bytes, client_frame, decode_all, split_every};
pub use handler::{Event, RecordingHandler};
pub use logging::{LoggerHandle, logger};
pub use sinks::{ChunkedSink, FailingSink};
