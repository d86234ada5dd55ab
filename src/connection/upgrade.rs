//! Server side of the opening handshake over a TCP stream.

use std::{io, time::Duration};

use log::debug;
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

use crate::handshake::{HandshakeError, MAX_HEAD_LEN, RequestHead, rejection_head, response_head};

/// Failures while upgrading a TCP connection.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// The request was refused; a `400` response has been sent.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    /// The peer did not finish its request in time.
    #[error("handshake timed out")]
    Timeout,
    /// The peer closed the stream before finishing its request.
    #[error("connection closed during handshake")]
    Eof,
    #[error("handshake I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Read an upgrade request from `stream` and answer it.
///
/// Returns the parsed request and any bytes that followed its head; those
/// are the first bytes of the WebSocket stream and must be passed to the
/// session before anything else is read.
///
/// # Errors
///
/// Returns [`UpgradeError::Handshake`] for an invalid request, after
/// writing a `400 Bad Request` response, and the other variants when the
/// transport fails or stalls.
pub async fn accept_upgrade(
    stream: &mut TcpStream,
    limit: Duration,
) -> Result<(RequestHead, Vec<u8>), UpgradeError> {
    match timeout(limit, read_head(stream)).await {
        Ok(result) => result,
        Err(_) => Err(UpgradeError::Timeout),
    }
}

async fn read_head(stream: &mut TcpStream) -> Result<(RequestHead, Vec<u8>), UpgradeError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0_u8; 1024];
    let (head, used) = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(UpgradeError::Eof);
        }
        buf.extend_from_slice(&chunk[..n]);
        match RequestHead::parse(&buf) {
            Ok(Some(parsed)) => break parsed,
            Ok(None) if buf.len() < MAX_HEAD_LEN => {}
            Ok(None) => return reject(stream, HandshakeError::HeadTooLarge).await,
            Err(err) => return reject(stream, err).await,
        }
    };
    let key = match head.validate() {
        Ok(key) => key.to_owned(),
        Err(err) => return reject(stream, err).await,
    };
    stream.write_all(response_head(&key).as_bytes()).await?;
    debug!("upgrade accepted: path={}", head.path());
    Ok((head, buf.split_off(used)))
}

async fn reject<T>(stream: &mut TcpStream, err: HandshakeError) -> Result<T, UpgradeError> {
    debug!("upgrade rejected: error={err}");
    stream.write_all(rejection_head(&err).as_bytes()).await?;
    Err(err.into())
}
