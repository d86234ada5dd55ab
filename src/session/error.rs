//! Errors surfaced by the session layer.

use thiserror::Error;

use crate::{error::ProtocolError, writer::WriteError};

/// Failures reported to code driving or writing through a session.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connection is closed; nothing more is sent or delivered.
    #[error("session is closed")]
    Closed,
    /// A Close frame has been queued; no further frames may be sent.
    #[error("session is closing")]
    Closing,
    /// The frame the application built is invalid.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The transport failed mid-frame.
    #[error(transparent)]
    Write(#[from] WriteError),
}
