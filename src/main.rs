//! Demo WebSocket server built on `wsframe`.
//!
//! Accepts TCP connections, performs the opening handshake and either echoes
//! every message back or relays it to all connected clients.

mod cli;

use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use tokio::{net::TcpListener, sync::mpsc};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};
use wsframe::{
    connection::{ConnectionDriver, DriverConfig, accept_upgrade},
    frame::{CloseCode, Frame},
    message::{Message, MessageKind},
    session::{ConnectionId, ConnectionTable, Handler, Outbox, Session, SessionConfig},
};

use crate::cli::{Cli, Mode};

type Peers = Arc<ConnectionTable<mpsc::UnboundedSender<Frame>>>;

/// Hands each message to the connection's relay task in arrival order.
struct Relay {
    messages: mpsc::UnboundedSender<Message>,
}

impl Handler for Relay {
    fn on_open(&mut self, id: ConnectionId, _outbox: &mut Outbox<'_>) {
        info!(%id, "client connected");
    }

    fn on_message(&mut self, id: ConnectionId, message: Message, _outbox: &mut Outbox<'_>) {
        if self.messages.send(message).is_err() {
            warn!(%id, "relay task gone, message dropped");
        }
    }

    fn on_close(&mut self, id: ConnectionId, code: CloseCode, reason: &str) {
        info!(%id, %code, reason, "client disconnected");
    }
}

/// Collects messages one at a time and forwards them.
///
/// A single task per connection keeps echoed and relayed frames in the order
/// the messages arrived. Returns once the session drops its sender.
async fn relay_messages(
    id: ConnectionId,
    mode: Mode,
    peers: Peers,
    own: mpsc::UnboundedSender<Frame>,
    mut messages: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = messages.recv().await {
        let kind = message.kind();
        let payload: Bytes = match message.collect().await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%id, error = %err, "message dropped");
                continue;
            }
        };
        let frame = match kind {
            MessageKind::Text => match String::from_utf8(payload.to_vec()) {
                Ok(text) => Frame::text(text),
                Err(_) => Frame::binary(payload),
            },
            MessageKind::Binary => Frame::binary(payload),
        };
        match mode {
            Mode::Echo => {
                let _ = own.send(frame);
            }
            Mode::Broadcast => peers.for_each(|_, peer| {
                let _ = peer.send(frame.clone());
            }),
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let session_config = SessionConfig::builder()
        .max_frame_size(cli.max_frame_size)
        .max_message_size(cli.max_message_size)
        .validate_utf8(!cli.skip_utf8_validation)
        .build()
        .map_err(std::io::Error::other)?;
    let driver_config = DriverConfig::default();

    let listener = TcpListener::bind(cli.bind).await?;
    info!(addr = %cli.bind, mode = ?cli.mode, "listening");

    let peers: Peers = Arc::new(ConnectionTable::new());
    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();

    loop {
        let (mut stream, peer_addr) = tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    continue;
                }
            },
        };
        let peers = Arc::clone(&peers);
        let shutdown = shutdown.clone();
        let mode = cli.mode;
        tracker.spawn(async move {
            let leftover = match accept_upgrade(&mut stream, driver_config.handshake_timeout()).await {
                Ok((_, leftover)) => leftover,
                Err(err) => {
                    warn!(%peer_addr, error = %err, "handshake failed");
                    return;
                }
            };
            let (tx, rx) = mpsc::unbounded_channel();
            let id = peers.insert(tx.clone());
            let (messages, inbound) = mpsc::unbounded_channel();
            tokio::spawn(relay_messages(id, mode, Arc::clone(&peers), tx, inbound));
            let session = Session::new(id, session_config, Relay { messages });
            let session = ConnectionDriver::new(stream, session, shutdown, driver_config)
                .with_leftover(leftover)
                .with_outbound(rx)
                .run()
                .await;
            if peers.remove(&session.id()).is_none() {
                error!(%id, "connection missing from peer table");
            }
        });
    }

    info!("shutting down");
    shutdown.cancel();
    tracker.close();
    tracker.wait().await;
    Ok(())
}
