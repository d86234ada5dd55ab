//! Outbound half of a session.

use bytes::Bytes;
use log::debug;

use super::{ConnectionState, SessionError};
use crate::{
    frame::{CloseCode, Frame, Opcode, random_mask},
    parser::Role,
    writer::FrameWriter,
};

/// Writer plus the bookkeeping needed to refuse frames after close.
#[derive(Debug)]
pub(crate) struct Link {
    pub(crate) writer: FrameWriter,
    pub(crate) state: ConnectionState,
    pub(crate) close_queued: bool,
    pub(crate) close_sent: bool,
    role: Role,
}

impl Link {
    pub(crate) fn new(role: Role) -> Self {
        Self {
            writer: FrameWriter::new(),
            state: ConnectionState::Open,
            close_queued: false,
            close_sent: false,
            role,
        }
    }

    /// Queue a frame without any state checks, masking it for clients.
    pub(crate) fn enqueue(&mut self, frame: Frame) {
        let frame = if self.role.masks_outbound() && frame.mask().is_none() {
            frame.with_mask(random_mask())
        } else {
            frame
        };
        self.writer.enqueue(frame);
    }

    /// Queue our Close frame and stop accepting further output.
    ///
    /// Data frames not yet started are dropped; they could not follow the
    /// Close frame on the wire.
    pub(crate) fn enqueue_close(&mut self, frame: Frame) {
        let dropped = self.writer.drop_queued_data();
        if dropped > 0 {
            debug!("dropped {dropped} queued data frames ahead of close");
        }
        self.close_queued = true;
        self.state = ConnectionState::Closing;
        self.enqueue(frame);
    }

    pub(crate) fn send(&mut self, frame: Frame) -> Result<(), SessionError> {
        match self.state {
            ConnectionState::Closed => return Err(SessionError::Closed),
            _ if self.close_queued => return Err(SessionError::Closing),
            ConnectionState::Open | ConnectionState::Closing => {}
        }
        if frame.opcode() == Opcode::Close {
            self.enqueue_close(frame);
        } else {
            self.enqueue(frame);
        }
        Ok(())
    }
}

/// Handle through which the application queues outbound frames.
///
/// Frames are masked automatically when the session acts as a client.
#[derive(Debug)]
pub struct Outbox<'a> {
    link: &'a mut Link,
}

impl<'a> Outbox<'a> {
    pub(crate) fn new(link: &'a mut Link) -> Self { Self { link } }

    /// Queue an arbitrary frame.
    ///
    /// A Close frame starts the closing handshake, as [`Outbox::close`]
    /// does.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closing`] once a Close frame has been queued
    /// and [`SessionError::Closed`] after the connection has closed.
    pub fn send(&mut self, frame: Frame) -> Result<(), SessionError> { self.link.send(frame) }

    /// Queue a complete text message.
    ///
    /// # Errors
    ///
    /// See [`Outbox::send`].
    pub fn send_text(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.send(Frame::text(text))
    }

    /// Queue a complete binary message.
    ///
    /// # Errors
    ///
    /// See [`Outbox::send`].
    pub fn send_binary(&mut self, payload: impl Into<Bytes>) -> Result<(), SessionError> {
        self.send(Frame::binary(payload))
    }

    /// Queue a ping.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Protocol`] for payloads over 125 bytes, or
    /// the errors described on [`Outbox::send`].
    pub fn ping(&mut self, payload: impl Into<Bytes>) -> Result<(), SessionError> {
        self.send(Frame::ping(payload)?)
    }

    /// Start the closing handshake.
    ///
    /// Data frames still waiting in the queue are discarded and never sent;
    /// only a frame already partly written completes ahead of the Close. To
    /// deliver queued data first, flush until [`Outbox::pending`] is zero and
    /// close afterwards.
    ///
    /// # Errors
    ///
    /// See [`Outbox::send`].
    pub fn close(&mut self, code: CloseCode, reason: &str) -> Result<(), SessionError> {
        self.send(Frame::close(code, reason))
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState { self.link.state }

    /// Whether [`Outbox::send`] would accept a frame.
    #[must_use]
    pub fn is_writable(&self) -> bool { self.link.state != ConnectionState::Closed && !self.link.close_queued }

    /// Frames queued and not yet fully written.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.link.writer.queued() + usize::from(self.link.writer.in_flight().is_some())
    }
}
