//! Incremental RFC 6455 frame parser.
//!
//! [`FrameParser`] owns a rolling byte buffer. Bytes are appended with
//! [`FrameParser::feed`] in whatever increments the transport delivers them
//! and complete frames are pulled out with [`FrameParser::next_frame`] or the
//! [`FrameParser::frames`] iterator. Parse state survives between feeds, so a
//! frame may arrive one byte at a time and several frames may arrive in one
//! read.
//!
//! Any protocol violation is terminal. Once an error has been returned the
//! parser keeps returning it and ignores further input; the caller is
//! expected to send a Close frame and tear the connection down.

use bytes::BytesMut;
use log::debug;

mod config;
mod state;

pub use config::{
    DEFAULT_MAX_FRAME_SIZE,
    MAX_FRAME_SIZE,
    MIN_FRAME_SIZE,
    MaskPolicy,
    ParserConfig,
    Role,
};
pub use state::{FrameHead, LengthWidth, ParserState};
use state::{Transition, resume};

pub use crate::frame::ReservedBitsPolicy;
use crate::{error::ProtocolError, frame::Frame};

/// Initial capacity of the rolling buffer.
const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Drives the parse state machine over a caller-owned buffer.
///
/// Shared by [`FrameParser`] and the `tokio_util` codec adapter, which brings
/// its own buffer.
#[derive(Debug)]
pub(crate) struct FrameDecoder {
    state: ParserState,
    config: ParserConfig,
}

impl FrameDecoder {
    pub(crate) const fn new(config: ParserConfig) -> Self {
        Self {
            state: ParserState::AwaitingHeader,
            config,
        }
    }

    pub(crate) fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        loop {
            let state = std::mem::replace(&mut self.state, ParserState::AwaitingHeader);
            match resume(state, &self.config, buf) {
                Ok(Transition::NeedMore(state)) => {
                    self.state = state;
                    return Ok(None);
                }
                Ok(Transition::Next(state)) => self.state = state,
                Ok(Transition::Emit(frame)) => return Ok(Some(frame)),
                Err(err) => {
                    debug!("frame parser failed: error={err}");
                    self.state = ParserState::Failed(err.clone());
                    return Err(err);
                }
            }
        }
    }

    pub(crate) const fn state(&self) -> &ParserState { &self.state }

    pub(crate) const fn config(&self) -> &ParserConfig { &self.config }

    pub(crate) const fn is_failed(&self) -> bool { matches!(self.state, ParserState::Failed(_)) }
}

/// Sans-I/O frame parser with its own rolling buffer.
///
/// # Examples
///
/// ```
/// use wsframe::parser::FrameParser;
///
/// let mut parser = FrameParser::default();
/// // "Hello" masked with 37 fa 21 3d, split mid-payload.
/// parser.feed(&[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f]);
/// assert!(parser.next_frame().expect("valid prefix").is_none());
///
/// parser.feed(&[0x4d, 0x51, 0x58]);
/// let frame = parser.next_frame().expect("valid frame").expect("complete");
/// assert_eq!(frame.payload().as_ref(), b"Hello");
/// ```
#[derive(Debug)]
pub struct FrameParser {
    decoder: FrameDecoder,
    buffer: BytesMut,
}

impl Default for FrameParser {
    fn default() -> Self { Self::new(ParserConfig::default()) }
}

impl FrameParser {
    /// Create a parser with an empty buffer.
    #[must_use]
    pub fn new(config: ParserConfig) -> Self {
        Self {
            decoder: FrameDecoder::new(config),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Append bytes read from the transport.
    ///
    /// Input is discarded once the parser has failed.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.decoder.is_failed() {
            debug!("discarding {} bytes fed to a failed parser", bytes.len());
            return;
        }
        self.buffer.extend_from_slice(bytes);
    }

    /// Decode the next complete frame, if the buffer holds one.
    ///
    /// # Errors
    ///
    /// Returns the [`ProtocolError`] that put the parser in its terminal
    /// state. Every later call returns the same error.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        self.decoder.decode(&mut self.buffer)
    }

    /// Iterate over the frames decodable from the bytes fed so far.
    ///
    /// The iterator ends when more input is needed, or after yielding the
    /// first error. Calling `frames` again after another `feed` resumes
    /// where the previous iteration stopped.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames {
            parser: self,
            done: false,
        }
    }

    /// Current phase of the state machine.
    #[must_use]
    pub const fn state(&self) -> &ParserState { self.decoder.state() }

    #[must_use]
    pub const fn config(&self) -> &ParserConfig { self.decoder.config() }

    /// Bytes buffered but not yet consumed by a completed phase.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.buffer.len() }

    /// Whether a protocol violation has been detected.
    #[must_use]
    pub const fn is_failed(&self) -> bool { self.decoder.is_failed() }
}

/// Iterator returned by [`FrameParser::frames`].
#[derive(Debug)]
pub struct Frames<'a> {
    parser: &'a mut FrameParser,
    done: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for Frames<'_> {}

#[cfg(test)]
mod tests;
