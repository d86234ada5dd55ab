//! Readiness-driven reactor glue for a [`Session`] over TCP.
//!
//! [`ConnectionDriver`] waits on socket readiness with `TcpStream::ready`,
//! moves bytes with `try_read` and `try_write`, and never blocks inside the
//! session. A `tokio::select!` loop polls, in `biased` order, the shutdown
//! token, socket readiness, the optional outbound frame channel and the
//! close handshake deadline. No protocol decisions are made here.

mod config;
mod upgrade;

use std::{
    io,
    sync::atomic::{AtomicU64, Ordering},
};

use log::{debug, info, warn};
use tokio::{
    io::{Interest, Ready},
    net::TcpStream,
    sync::mpsc,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub use self::{
    config::{
        DEFAULT_CLOSE_TIMEOUT,
        DEFAULT_HANDSHAKE_TIMEOUT,
        DEFAULT_READ_BUFFER_SIZE,
        DriverConfig,
        DriverConfigBuilder,
    },
    upgrade::{UpgradeError, accept_upgrade},
};
use crate::{
    frame::Frame,
    metrics,
    session::{ConnectionState, Handler, Session},
};

static ACTIVE_CONNECTIONS: AtomicU64 = AtomicU64::new(0);

/// Number of drivers currently running.
#[must_use]
pub fn active_connection_count() -> u64 { ACTIVE_CONNECTIONS.load(Ordering::Relaxed) }

/// Keeps the live connection count and gauge in step with a driver's life.
struct LiveConnection;

impl LiveConnection {
    fn new() -> Self {
        ACTIVE_CONNECTIONS.fetch_add(1, Ordering::Relaxed);
        metrics::inc_connections();
        Self
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        ACTIVE_CONNECTIONS.fetch_sub(1, Ordering::Relaxed);
        metrics::dec_connections();
    }
}

enum Event {
    Shutdown,
    Ready(io::Result<Ready>),
    Outbound(Option<Frame>),
    CloseTimeout,
}

/// Drives one upgraded connection until it closes.
///
/// # Examples
///
/// ```no_run
/// use tokio::net::TcpListener;
/// use tokio_util::sync::CancellationToken;
/// use wsframe::{
///     connection::{ConnectionDriver, DriverConfig, accept_upgrade},
///     message::Message,
///     session::{ConnectionId, Handler, Outbox, Session, SessionConfig},
/// };
///
/// struct Sink;
///
/// impl Handler for Sink {
///     fn on_message(&mut self, _id: ConnectionId, _message: Message, _outbox: &mut Outbox<'_>) {}
/// }
///
/// # async fn serve() -> std::io::Result<()> {
/// let listener = TcpListener::bind("127.0.0.1:9001").await?;
/// let (mut stream, _) = listener.accept().await?;
/// let config = DriverConfig::default();
/// let (_, leftover) = accept_upgrade(&mut stream, config.handshake_timeout())
///     .await
///     .map_err(std::io::Error::other)?;
/// let session = Session::new(ConnectionId::new(1), SessionConfig::default(), Sink);
/// let session = ConnectionDriver::new(stream, session, CancellationToken::new(), config)
///     .with_leftover(leftover)
///     .run()
///     .await;
/// assert!(session.is_closed());
/// # Ok(())
/// # }
/// ```
pub struct ConnectionDriver<H> {
    stream: TcpStream,
    session: Session<H>,
    outbound: Option<mpsc::UnboundedReceiver<Frame>>,
    shutdown: CancellationToken,
    config: DriverConfig,
    leftover: Vec<u8>,
    read_buf: Vec<u8>,
    close_deadline: Option<Instant>,
}

impl<H: Handler> ConnectionDriver<H> {
    #[must_use]
    pub fn new(stream: TcpStream, session: Session<H>, shutdown: CancellationToken, config: DriverConfig) -> Self {
        Self {
            stream,
            session,
            outbound: None,
            shutdown,
            config,
            leftover: Vec::new(),
            read_buf: vec![0; config.read_buffer_size()],
            close_deadline: None,
        }
    }

    /// Bytes read past the handshake; fed to the session first.
    #[must_use]
    pub fn with_leftover(mut self, leftover: Vec<u8>) -> Self {
        self.leftover = leftover;
        self
    }

    /// Frames from other tasks to send on this connection, e.g. broadcasts.
    ///
    /// Frames that arrive after the session started closing are dropped.
    #[must_use]
    pub fn with_outbound(mut self, outbound: mpsc::UnboundedReceiver<Frame>) -> Self {
        self.outbound = Some(outbound);
        self
    }

    /// Run until the session closes, the transport fails or shutdown is
    /// signalled, then drop the stream and return the session.
    pub async fn run(self) -> Session<H> {
        let span = tracing::info_span!("connection", id = self.session.id().as_u64());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(mut self) -> Session<H> {
        let _live = LiveConnection::new();
        info!(
            "connection started: id={}, active={}",
            self.session.id(),
            active_connection_count()
        );
        self.session.open();
        if !self.leftover.is_empty() {
            deliver(&mut self.session, &self.leftover);
            self.leftover = Vec::new();
            self.flush();
        }

        loop {
            if self.session.is_closed() && !self.session.can_write() {
                break;
            }
            if self.session.state() == ConnectionState::Closing && self.close_deadline.is_none() {
                self.close_deadline = Some(Instant::now() + self.config.close_timeout());
            }
            match self.next_event().await {
                Event::Shutdown => {
                    debug!("shutdown requested");
                    self.session.abort();
                    break;
                }
                Event::Ready(Ok(ready)) => self.on_ready(ready),
                Event::Ready(Err(err)) => {
                    warn!("readiness wait failed: error={err}");
                    self.session.transport_closed();
                    break;
                }
                Event::Outbound(Some(frame)) => {
                    if let Err(err) = self.session.outbox().send(frame) {
                        debug!("dropping outbound frame: error={err}");
                    }
                }
                Event::Outbound(None) => self.outbound = None,
                Event::CloseTimeout => {
                    warn!("close handshake timed out: id={}", self.session.id());
                    self.session.transport_closed();
                    break;
                }
            }
        }
        info!("connection finished: id={}", self.session.id());
        self.session
    }

    fn interest(&self) -> Interest {
        match (self.session.is_closed(), self.session.can_write()) {
            (false, true) => Interest::READABLE | Interest::WRITABLE,
            (false, false) => Interest::READABLE,
            (true, _) => Interest::WRITABLE,
        }
    }

    /// Await the next ready event using biased priority ordering.
    async fn next_event(&mut self) -> Event {
        let interest = self.interest();
        let deadline = self.close_deadline;
        let accepting = self.session.state() == ConnectionState::Open && self.outbound.is_some();
        let outbound = &mut self.outbound;
        let stream = &self.stream;
        let shutdown = &self.shutdown;
        tokio::select! {
            biased;
            () = shutdown.cancelled() => Event::Shutdown,
            ready = stream.ready(interest) => Event::Ready(ready),
            frame = recv_optional(outbound), if accepting => Event::Outbound(frame),
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => Event::CloseTimeout,
        }
    }

    fn on_ready(&mut self, ready: Ready) {
        if ready.is_readable() || ready.is_read_closed() {
            self.read();
        }
        if ready.is_writable() {
            self.flush();
        }
    }

    fn read(&mut self) {
        if self.session.is_closed() {
            return;
        }
        match self.stream.try_read(&mut self.read_buf) {
            Ok(0) => {
                debug!("peer closed the stream");
                self.session.transport_closed();
            }
            Ok(n) => {
                deliver(&mut self.session, &self.read_buf[..n]);
                self.flush();
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => {
                warn!("read failed: error={err}");
                self.session.transport_closed();
            }
        }
    }

    fn flush(&mut self) {
        if !self.session.can_write() {
            return;
        }
        if let Err(err) = self.session.flush(&mut self.stream) {
            debug!("flush failed: error={err}");
        }
    }
}

fn deliver<H: Handler>(session: &mut Session<H>, bytes: &[u8]) {
    if let Err(err) = session.receive(bytes) {
        tracing::debug!(error = %err, close_code = %err.close_code(), "closing after protocol error");
    }
}

async fn recv_optional(rx: &mut Option<mpsc::UnboundedReceiver<Frame>>) -> Option<Frame> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
