//! Command line interface for the `wsframe` demo server.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

/// What the server does with each message it receives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Send each message back to its sender.
    #[default]
    Echo,
    /// Relay each message to every connected client.
    Broadcast,
}

/// Command line arguments for the `wsframe` binary.
#[derive(Debug, Parser)]
#[command(name = "wsframe", version, about = "WebSocket echo and broadcast server")]
pub struct Cli {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:9001")]
    pub bind: SocketAddr,

    #[arg(short, long, value_enum, default_value_t = Mode::Echo)]
    pub mode: Mode,

    /// Largest inbound frame payload, in bytes.
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    pub max_frame_size: usize,

    /// Largest reassembled message, in bytes.
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    pub max_message_size: usize,

    /// Accept text messages without checking they are valid UTF-8.
    #[arg(long)]
    pub skip_utf8_validation: bool,
}
