//! Non-blocking byte sinks.

use std::io;

use thiserror::Error;
use tokio::net::TcpStream;

/// Hard failures reported by a [`ByteSink`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SinkError {
    /// The peer is gone; nothing more can be written.
    #[error("byte sink closed")]
    Closed,
    /// The underlying transport failed.
    #[error("byte sink I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Destination for serialized frame bytes.
///
/// `try_send` never blocks. Accepting fewer bytes than offered, including
/// zero, signals backpressure rather than failure.
pub trait ByteSink {
    /// Offer `bytes`; return how many of them were accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the sink can no longer accept data.
    fn try_send(&mut self, bytes: &[u8]) -> Result<usize, SinkError>;
}

impl ByteSink for Vec<u8> {
    fn try_send(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
        self.extend_from_slice(bytes);
        Ok(bytes.len())
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn try_send(&mut self, bytes: &[u8]) -> Result<usize, SinkError> { (**self).try_send(bytes) }
}

impl<S: ByteSink + ?Sized> ByteSink for Box<S> {
    fn try_send(&mut self, bytes: &[u8]) -> Result<usize, SinkError> { (**self).try_send(bytes) }
}

impl ByteSink for TcpStream {
    fn try_send(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
        match self.try_write(bytes) {
            Ok(0) if !bytes.is_empty() => Err(SinkError::Closed),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if is_disconnect(&e) => Err(SinkError::Closed),
            Err(e) => Err(SinkError::Io(e)),
        }
    }
}

fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
    )
}
