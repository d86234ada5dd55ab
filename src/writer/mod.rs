//! Backpressure-aware frame writer.
//!
//! [`FrameWriter`] sits on top of a [`FrameQueue`]. Each call to
//! [`FrameWriter::write`] either starts the next queued frame or resumes the
//! one already in flight, offering the unsent bytes to a [`ByteSink`] once.
//! A sink that accepts only part of the bytes leaves the remainder buffered
//! for the next call, so the caller only needs to call `write` again when
//! the transport reports writability.

use bytes::BytesMut;
use log::{debug, trace};
use thiserror::Error;

mod sink;

pub use sink::{ByteSink, SinkError};

use crate::{
    frame::Frame,
    queue::{FramePriority, FrameQueue},
};

/// Result of one [`FrameWriter::write`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing was queued or in flight.
    Idle,
    /// The sink stopped accepting bytes before the current frame finished.
    Pending {
        /// Bytes of the current frame still unsent.
        remaining: usize,
    },
    /// The current frame was fully handed to the sink.
    Sent(Frame),
}

/// Fatal writer failures.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum WriteError {
    /// The sink failed while part of a frame was still unsent.
    #[error("sink failed with {unsent} bytes unsent")]
    Sink {
        /// Bytes of the in-flight frame that never reached the sink.
        unsent: usize,
        /// Failure reported by the sink.
        #[source]
        source: SinkError,
    },
}

#[derive(Debug)]
enum WriterState {
    Idle,
    Serializing { frame: Frame, written: usize },
}

/// Serializes queued frames into a non-blocking sink.
///
/// # Examples
///
/// ```
/// use wsframe::{
///     frame::Frame,
///     writer::{FrameWriter, WriteOutcome},
/// };
///
/// let mut writer = FrameWriter::new();
/// writer.enqueue(Frame::text("Hello"));
///
/// let mut wire = Vec::new();
/// let outcome = writer.write(&mut wire).expect("vec sink never fails");
/// assert!(matches!(outcome, WriteOutcome::Sent(_)));
/// assert_eq!(wire, b"\x81\x05Hello");
/// assert!(!writer.can_write());
/// ```
#[derive(Debug)]
pub struct FrameWriter {
    queue: FrameQueue,
    state: WriterState,
    scratch: BytesMut,
    flushed: u64,
}

impl Default for FrameWriter {
    fn default() -> Self { Self::new() }
}

impl FrameWriter {
    /// Create an idle writer with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: FrameQueue::new(),
            state: WriterState::Idle,
            scratch: BytesMut::new(),
            flushed: 0,
        }
    }

    /// Queue a frame for transmission.
    pub fn enqueue(&mut self, frame: Frame) -> FramePriority { self.queue.enqueue(frame) }

    /// Offer pending bytes to `sink` once.
    ///
    /// When idle, the next frame is taken from the queue and serialized into
    /// an internal buffer first. No more than one frame completes per call.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Sink`] if the sink fails while bytes of the
    /// current frame remain unsent. The writer keeps the frame in flight; the
    /// connection should be treated as dead.
    pub fn write<S: ByteSink + ?Sized>(&mut self, sink: &mut S) -> Result<WriteOutcome, WriteError> {
        if matches!(self.state, WriterState::Idle) {
            let Some(frame) = self.queue.extract() else {
                return Ok(WriteOutcome::Idle);
            };
            self.scratch.clear();
            frame.encode_into(&mut self.scratch);
            trace!(
                "serialized frame: opcode={:?}, len={}",
                frame.opcode(),
                self.scratch.len()
            );
            self.state = WriterState::Serializing { frame, written: 0 };
        }

        let WriterState::Serializing { written, .. } = &mut self.state else {
            return Ok(WriteOutcome::Idle);
        };
        let unsent = &self.scratch[*written..];
        let accepted = match sink.try_send(unsent) {
            Ok(n) => n.min(unsent.len()),
            Err(source) => {
                debug!("sink failed: unsent={}, error={source}", unsent.len());
                return Err(WriteError::Sink {
                    unsent: unsent.len(),
                    source,
                });
            }
        };
        *written += accepted;
        self.flushed += accepted as u64;

        let remaining = self.scratch.len() - *written;
        if remaining > 0 {
            return Ok(WriteOutcome::Pending { remaining });
        }
        match std::mem::replace(&mut self.state, WriterState::Idle) {
            WriterState::Serializing { frame, .. } => Ok(WriteOutcome::Sent(frame)),
            WriterState::Idle => Ok(WriteOutcome::Idle),
        }
    }

    /// Whether a frame is in flight or queued.
    ///
    /// Callers use this to decide whether to keep write readiness armed.
    #[must_use]
    pub fn can_write(&self) -> bool {
        matches!(self.state, WriterState::Serializing { .. }) || !self.queue.is_empty()
    }

    /// Frame currently being written, if any.
    #[must_use]
    pub fn in_flight(&self) -> Option<&Frame> {
        match &self.state {
            WriterState::Serializing { frame, .. } => Some(frame),
            WriterState::Idle => None,
        }
    }

    /// Unsent bytes of the in-flight frame.
    #[must_use]
    pub fn remaining(&self) -> usize {
        match &self.state {
            WriterState::Serializing { written, .. } => self.scratch.len() - written,
            WriterState::Idle => 0,
        }
    }

    /// Frames waiting behind the in-flight one.
    #[must_use]
    pub fn queued(&self) -> usize { self.queue.count() }

    /// Total bytes accepted by sinks over the writer's lifetime.
    #[must_use]
    pub fn bytes_flushed(&self) -> u64 { self.flushed }

    /// Drop queued data frames that have not started transmission.
    pub fn drop_queued_data(&mut self) -> usize { self.queue.clear_data() }

    /// Drop everything, including a partially written frame.
    pub fn discard(&mut self) {
        self.queue.clear();
        self.state = WriterState::Idle;
        self.scratch.clear();
    }
}

#[cfg(test)]
mod tests;
