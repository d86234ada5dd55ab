//! Protocol error taxonomy shared by the frame, parser and session layers.
//!
//! Every variant of [`ProtocolError`] is fatal to the connection. The only
//! question a caller has to answer is which close status to put on the wire,
//! and [`ProtocolError::close_code`] answers it.

use std::io;

use thiserror::Error;

use crate::frame::{CloseCode, Opcode};

/// Violations of the RFC 6455 framing or messaging rules.
///
/// # Examples
///
/// ```
/// use wsframe::{ProtocolError, frame::CloseCode};
///
/// let err = ProtocolError::InvalidUtf8;
/// assert_eq!(err.close_code(), CloseCode::INVALID_PAYLOAD);
///
/// let err = ProtocolError::InvalidOpcode { opcode: 0x3 };
/// assert_eq!(err.close_code(), CloseCode::PROTOCOL_ERROR);
/// ```
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// One of RSV1-3 was set without a negotiated extension.
    #[error("reserved bits set without a negotiated extension: {bits:#05b}")]
    NonZeroReservedBits {
        /// The three reserved bits as read from the header.
        bits: u8,
    },

    /// The opcode nibble is one of the reserved values.
    #[error("invalid opcode: {opcode:#x}")]
    InvalidOpcode {
        /// Raw opcode value.
        opcode: u8,
    },

    /// A control frame declared more than 125 payload bytes.
    #[error("control frame payload too large: {len} > 125")]
    ControlFrameTooLarge {
        /// Declared payload length.
        len: usize,
    },

    /// A control frame arrived with `fin` cleared.
    #[error("fragmented {opcode:?} control frame")]
    FragmentedControlFrame {
        /// Opcode of the offending frame.
        opcode: Opcode,
    },

    /// The declared payload length exceeds the configured maximum.
    #[error("frame exceeds max length: {size} > {max}")]
    FrameTooLarge {
        /// Length declared by the header.
        size: u64,
        /// Configured maximum frame payload size.
        max: usize,
    },

    /// The most significant bit of a 64-bit payload length was set.
    #[error("invalid 64-bit payload length encoding")]
    InvalidLengthEncoding,

    /// A frame that must be masked (client to server) was not.
    #[error("frame is not masked")]
    MissingMask,

    /// A frame that must not be masked (server to client) carried a key.
    #[error("frame is unexpectedly masked")]
    UnexpectedMask,

    /// Text payload or close reason is not valid UTF-8.
    #[error("invalid UTF-8 in text payload")]
    InvalidUtf8,

    /// A close frame carried exactly one payload byte.
    #[error("invalid close payload length: {len}")]
    InvalidClosePayload {
        /// Payload length of the close frame.
        len: usize,
    },

    /// A close frame carried a status code that may not appear on the wire.
    #[error("invalid close status code: {code}")]
    InvalidCloseCode {
        /// Status code read from the payload.
        code: u16,
    },

    /// A continuation frame arrived while no message was being assembled.
    #[error("continuation frame without a message in progress")]
    UnexpectedContinuation,

    /// A new data frame arrived while a fragmented message was incomplete.
    #[error("{opcode:?} frame received while a fragmented message is in progress")]
    ExpectedContinuation {
        /// Opcode of the data frame that interrupted the message.
        opcode: Opcode,
    },

    /// The assembled message would exceed the configured limit.
    #[error("message exceeds max size: {size} > {max}")]
    MessageTooLarge {
        /// Size the message would have reached.
        size: usize,
        /// Configured maximum message size.
        max: usize,
    },

    /// The input ended before a complete frame was available.
    #[error("incomplete frame: {buffered} bytes buffered")]
    Truncated {
        /// Bytes available when decoding stopped.
        buffered: usize,
    },

    /// Bytes remained after a complete frame was decoded.
    #[error("{len} trailing bytes after frame")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        len: usize,
    },
}

impl ProtocolError {
    /// Return the close status that best describes this violation.
    ///
    /// | Error | Code |
    /// |-------|------|
    /// | `InvalidUtf8` | 1007 |
    /// | `FrameTooLarge`, `MessageTooLarge` | 1009 |
    /// | everything else | 1002 |
    #[must_use]
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::InvalidUtf8 => CloseCode::INVALID_PAYLOAD,
            Self::FrameTooLarge { .. } | Self::MessageTooLarge { .. } => {
                CloseCode::MESSAGE_TOO_BIG
            }
            Self::NonZeroReservedBits { .. }
            | Self::InvalidOpcode { .. }
            | Self::ControlFrameTooLarge { .. }
            | Self::FragmentedControlFrame { .. }
            | Self::InvalidLengthEncoding
            | Self::MissingMask
            | Self::UnexpectedMask
            | Self::InvalidClosePayload { .. }
            | Self::InvalidCloseCode { .. }
            | Self::UnexpectedContinuation
            | Self::ExpectedContinuation { .. }
            | Self::Truncated { .. }
            | Self::TrailingBytes { .. } => CloseCode::PROTOCOL_ERROR,
        }
    }

    /// Returns the error category as a string for logging and metrics.
    ///
    /// One of `"framing"`, `"control"`, `"masking"` or `"message"`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NonZeroReservedBits { .. }
            | Self::InvalidOpcode { .. }
            | Self::FrameTooLarge { .. }
            | Self::InvalidLengthEncoding
            | Self::Truncated { .. }
            | Self::TrailingBytes { .. } => "framing",
            Self::ControlFrameTooLarge { .. }
            | Self::FragmentedControlFrame { .. }
            | Self::InvalidClosePayload { .. }
            | Self::InvalidCloseCode { .. } => "control",
            Self::MissingMask | Self::UnexpectedMask => "masking",
            Self::InvalidUtf8
            | Self::UnexpectedContinuation
            | Self::ExpectedContinuation { .. }
            | Self::MessageTooLarge { .. } => "message",
        }
    }
}

impl From<ProtocolError> for io::Error {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Truncated { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
