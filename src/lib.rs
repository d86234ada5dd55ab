#![doc(html_root_url = "https://docs.rs/wsframe/latest")]
//! Public API for the `wsframe` library.
//!
//! This crate provides a non-blocking RFC 6455 framing engine: an
//! incremental frame parser, a priority frame queue, a resumable frame
//! writer and a per-connection session that reassembles fragmented
//! messages and runs the closing handshake. The core is sans-I/O; the
//! [`connection`] module drives it over a tokio `TcpStream` and [`codec`]
//! adapts it to `tokio_util::codec::Framed`.

pub mod codec;
pub mod connection;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod message;
pub mod metrics;
pub mod parser;
pub mod queue;
pub mod session;
pub mod writer;

pub use codec::WebSocketCodec;
pub use error::ProtocolError;
pub use frame::{CloseCode, Frame, Opcode};
pub use message::{Message, MessageBody, MessageKind};
pub use metrics::{CONNECTIONS_ACTIVE, Direction, ERRORS_TOTAL, FRAMES_PROCESSED};
pub use parser::{FrameParser, ParserConfig, Role};
pub use queue::{FramePriority, FrameQueue};
pub use session::{ConnectionId, ConnectionState, ConnectionTable, Handler, Outbox, Session, SessionConfig};
pub use writer::{ByteSink, FrameWriter, WriteOutcome};
