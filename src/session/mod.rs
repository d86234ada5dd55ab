//! Per-connection protocol state machine.
//!
//! A [`Session`] owns one connection's parser, reassembler and writer. The
//! reactor pushes bytes in with [`Session::receive`] when the transport is
//! readable and calls [`Session::flush`] when it is writable; everything in
//! between is synchronous. The connection moves through
//! [`ConnectionState::Open`], [`ConnectionState::Closing`] and
//! [`ConnectionState::Closed`], and the application observes it through a
//! [`Handler`].

mod assembler;
mod config;
mod error;
mod handler;
mod outbox;
mod registry;

use log::{debug, trace, warn};

use self::{assembler::Assembler, outbox::Link};
pub use self::{
    config::{ConfigError, DEFAULT_MAX_MESSAGE_SIZE, SessionConfig, SessionConfigBuilder},
    error::SessionError,
    handler::Handler,
    outbox::Outbox,
    registry::{ConnectionId, ConnectionTable},
};
use crate::{
    error::ProtocolError,
    frame::{CloseCode, CloseReason, Frame, Opcode},
    metrics::{self, Direction},
    parser::FrameParser,
    writer::{ByteSink, WriteOutcome},
};

/// Lifecycle of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Messages flow in both directions.
    Open,
    /// A Close frame has been sent or received; waiting for the handshake
    /// to finish.
    Closing,
    /// Terminal. No more input is processed and no callbacks run.
    Closed,
}

/// Result of [`Session::flush`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushStatus {
    /// Every queued frame was written.
    Idle,
    /// The sink applied backpressure; call again once it is writable.
    Pending,
}

/// One connection's protocol engine.
///
/// # Examples
///
/// ```
/// use wsframe::{
///     frame::Frame,
///     message::{Chunk, Message},
///     session::{ConnectionId, Handler, Outbox, Session, SessionConfig},
/// };
///
/// struct Echo;
///
/// impl Handler for Echo {
///     fn on_message(&mut self, _id: ConnectionId, mut message: Message, outbox: &mut Outbox<'_>) {
///         if let Ok(Chunk::Data(bytes)) = message.body_mut().try_next_chunk() {
///             let _ = outbox.send_binary(bytes);
///         }
///     }
/// }
///
/// let mut session = Session::new(ConnectionId::new(1), SessionConfig::default(), Echo);
/// let inbound = Frame::binary(&b"hi"[..]).with_mask([1, 2, 3, 4]).encode();
/// session.receive(&inbound).expect("valid frame");
///
/// let mut wire = Vec::new();
/// session.flush(&mut wire).expect("vec sink never fails");
/// assert_eq!(wire, b"\x82\x02hi");
/// ```
#[derive(Debug)]
pub struct Session<H> {
    id: ConnectionId,
    config: SessionConfig,
    parser: FrameParser,
    assembler: Assembler,
    link: Link,
    handler: H,
    opened: bool,
    close_reported: bool,
    peer_close: Option<(CloseCode, String)>,
    failure: Option<(CloseCode, String)>,
}

impl<H: Handler> Session<H> {
    /// Create a session in the [`ConnectionState::Open`] state.
    ///
    /// [`Handler::on_open`] runs on the first call to [`Session::open`] or
    /// [`Session::receive`].
    pub fn new(id: ConnectionId, config: SessionConfig, handler: H) -> Self {
        Self {
            id,
            config,
            parser: FrameParser::new(config.parser()),
            assembler: Assembler::new(config.max_message_size(), config.validate_utf8()),
            link: Link::new(config.role()),
            handler,
            opened: false,
            close_reported: false,
            peer_close: None,
            failure: None,
        }
    }

    /// Run [`Handler::on_open`] if it has not run yet.
    pub fn open(&mut self) {
        if self.opened || self.link.state == ConnectionState::Closed {
            return;
        }
        self.opened = true;
        debug!("session opened: id={}", self.id);
        let mut outbox = Outbox::new(&mut self.link);
        self.handler.on_open(self.id, &mut outbox);
    }

    /// Process bytes read from the transport.
    ///
    /// Frames are handled in arrival order: data frames feed the current
    /// message, pings are answered, and Close frames drive the closing
    /// handshake. Bytes arriving once the session is closed are ignored.
    ///
    /// # Errors
    ///
    /// Returns the [`ProtocolError`] that ended the connection. A Close
    /// frame with the matching status has been queued when possible; flush
    /// it and then drop the transport.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        if self.link.state == ConnectionState::Closed || self.failure.is_some() {
            trace!("ignoring {} bytes on finished session {}", bytes.len(), self.id);
            return Ok(());
        }
        self.open();
        self.parser.feed(bytes);
        while self.link.state != ConnectionState::Closed {
            let frame = match self.parser.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => return Err(self.fail(err)),
            };
            metrics::inc_frames(Direction::Inbound);
            if let Err(err) = self.dispatch(frame) {
                return Err(self.fail(err));
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        match frame.opcode() {
            Opcode::Text | Opcode::Binary | Opcode::Continuation => self.on_data(frame),
            Opcode::Ping => {
                if self.link.state == ConnectionState::Open {
                    self.link.enqueue(Frame::pong(frame.into_payload())?);
                }
                Ok(())
            }
            Opcode::Pong => {
                trace!("pong received: id={}, len={}", self.id, frame.payload().len());
                Ok(())
            }
            Opcode::Close => self.on_peer_close(&frame),
        }
    }

    fn on_data(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        if self.link.state != ConnectionState::Open {
            trace!("dropping data frame on closing session {}", self.id);
            return Ok(());
        }
        if let Some(message) = self.assembler.push(frame)? {
            let mut outbox = Outbox::new(&mut self.link);
            self.handler.on_message(self.id, message, &mut outbox);
        }
        Ok(())
    }

    fn on_peer_close(&mut self, frame: &Frame) -> Result<(), ProtocolError> {
        let reason = CloseReason::parse(frame.payload(), self.config.validate_utf8())?;
        let (code, text) = reason.map_or((CloseCode::NO_STATUS, String::new()), |r| {
            (r.code(), r.reason().to_owned())
        });
        debug!("close received: id={}, code={code}, state={:?}", self.id, self.link.state);
        if self.link.close_queued {
            self.finish(code, &text);
            return Ok(());
        }
        self.assembler.abort();
        let echo = if code == CloseCode::NO_STATUS {
            CloseCode::NORMAL
        } else {
            code
        };
        self.peer_close = Some((code, text));
        self.link.enqueue_close(Frame::close(echo, ""));
        Ok(())
    }

    /// Tear the connection down after a protocol violation.
    fn fail(&mut self, err: ProtocolError) -> ProtocolError {
        let code = err.close_code();
        warn!(
            "protocol violation: id={}, error={err}, error_type={}",
            self.id,
            err.error_type()
        );
        metrics::inc_errors(err.error_type());
        self.assembler.abort();
        self.failure = Some((code, err.to_string()));
        if !self.link.close_queued {
            self.link.enqueue_close(Frame::close(code, &err.to_string()));
        }
        self.link.state = ConnectionState::Closing;
        if self.link.close_sent {
            self.finish(code, &err.to_string());
        }
        err
    }

    /// Write as much queued output as `sink` accepts.
    ///
    /// Completes once the queue is empty, or returns
    /// [`FlushStatus::Pending`] when the sink applies backpressure. Once
    /// our Close frame has been written after a received Close or a
    /// protocol violation, the session becomes closed and the transport can
    /// be dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Write`] if the sink fails. The session is
    /// closed with [`CloseCode::ABNORMAL`] before returning.
    pub fn flush<S: ByteSink + ?Sized>(&mut self, sink: &mut S) -> Result<FlushStatus, SessionError> {
        loop {
            match self.link.writer.write(sink) {
                Ok(WriteOutcome::Idle) => return Ok(FlushStatus::Idle),
                Ok(WriteOutcome::Pending { remaining }) => {
                    trace!("flush pending: id={}, remaining={remaining}", self.id);
                    return Ok(FlushStatus::Pending);
                }
                Ok(WriteOutcome::Sent(frame)) => {
                    metrics::inc_frames(Direction::Outbound);
                    if frame.opcode() == Opcode::Close {
                        self.on_close_sent();
                    }
                }
                Err(err) => {
                    warn!("transport write failed: id={}, error={err}", self.id);
                    self.transport_closed();
                    return Err(err.into());
                }
            }
        }
    }

    fn on_close_sent(&mut self) {
        self.link.close_sent = true;
        debug!("close sent: id={}", self.id);
        if let Some((code, reason)) = self.failure.take().or_else(|| self.peer_close.take()) {
            self.finish(code, &reason);
        }
    }

    /// Start the closing handshake from this end.
    ///
    /// Queued data frames that have not started transmission are dropped,
    /// as described on [`Outbox::close`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closing`] if a Close frame is already queued
    /// and [`SessionError::Closed`] once the session has closed.
    pub fn close(&mut self, code: CloseCode, reason: &str) -> Result<(), SessionError> {
        self.outbox().close(code, reason)
    }

    /// Report that the transport has gone away.
    ///
    /// Queued output is discarded, any partial message is aborted and the
    /// session closes with [`CloseCode::ABNORMAL`] unless a Close handshake
    /// or protocol violation already determined the status.
    pub fn transport_closed(&mut self) {
        if self.link.state == ConnectionState::Closed {
            return;
        }
        self.link.writer.discard();
        let (code, reason) = self
            .failure
            .take()
            .or_else(|| self.peer_close.take())
            .unwrap_or((CloseCode::ABNORMAL, String::new()));
        self.finish(code, &reason);
    }

    /// Drop all state without notifying the handler.
    ///
    /// Used for external shutdown; any partial message body yields
    /// [`MessageError::Aborted`](crate::message::MessageError::Aborted).
    pub fn abort(&mut self) {
        debug!("session aborted: id={}", self.id);
        self.close_reported = true;
        self.assembler.abort();
        self.link.writer.discard();
        self.link.state = ConnectionState::Closed;
    }

    fn finish(&mut self, code: CloseCode, reason: &str) {
        self.link.state = ConnectionState::Closed;
        self.assembler.abort();
        if self.close_reported {
            return;
        }
        self.close_reported = true;
        debug!("session closed: id={}, code={code}", self.id);
        metrics::inc_closes(code.as_u16());
        self.handler.on_close(self.id, code, reason);
    }

    /// Application output surface outside of a callback.
    pub fn outbox(&mut self) -> Outbox<'_> { Outbox::new(&mut self.link) }

    #[must_use]
    pub fn state(&self) -> ConnectionState { self.link.state }

    /// Whether [`Session::flush`] has anything to write.
    #[must_use]
    pub fn can_write(&self) -> bool { self.link.writer.can_write() }

    /// Whether the session has reached [`ConnectionState::Closed`] and the
    /// transport should be dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.link.state == ConnectionState::Closed }

    #[must_use]
    pub fn id(&self) -> ConnectionId { self.id }

    #[must_use]
    pub fn config(&self) -> &SessionConfig { &self.config }

    #[must_use]
    pub fn handler(&self) -> &H { &self.handler }

    pub fn handler_mut(&mut self) -> &mut H { &mut self.handler }

    /// Consume the session, returning its handler.
    pub fn into_handler(self) -> H { self.handler }
}
