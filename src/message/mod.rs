//! Application-facing messages.
//!
//! A [`Message`] is handed to the application as soon as its first data frame
//! arrives. Its [`MessageBody`] yields one chunk per frame payload and ends
//! after the final fragment, so large messages stream through without being
//! buffered in full. The body is finite and cannot be restarted. If the
//! connection goes away mid-message the body yields
//! [`MessageError::Aborted`].

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;
use thiserror::Error;
use tokio::sync::mpsc;

mod utf8;

pub(crate) use utf8::Utf8Validator;

/// Whether a message carries text or binary data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// UTF-8 text, opcode `Text`.
    Text,
    /// Arbitrary bytes, opcode `Binary`.
    Binary,
}

/// Failures observed while reading a message body.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// The connection closed before the final fragment arrived.
    #[error("message aborted before its final fragment")]
    Aborted,
    /// The collected payload is not valid UTF-8.
    #[error("message payload is not valid UTF-8")]
    InvalidUtf8,
}

/// Outcome of [`MessageBody::try_next_chunk`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    /// Payload of one frame.
    Data(Bytes),
    /// No chunk buffered yet; more fragments are due.
    Pending,
    /// The final fragment has been yielded.
    End,
}

type ChunkResult = Result<Bytes, MessageError>;

/// Lazy sequence of payload chunks.
#[derive(Debug)]
pub struct MessageBody {
    rx: mpsc::UnboundedReceiver<ChunkResult>,
}

impl MessageBody {
    pub(crate) fn channel() -> (BodySender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (BodySender { tx }, Self { rx })
    }

    /// A body that yields `payload` once and then ends.
    #[must_use]
    pub fn complete(payload: Bytes) -> Self {
        let (mut tx, body) = Self::channel();
        tx.send(payload);
        body
    }

    /// Take the next chunk without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Aborted`] if the message was cut short.
    pub fn try_next_chunk(&mut self) -> Result<Chunk, MessageError> {
        match self.rx.try_recv() {
            Ok(Ok(bytes)) => Ok(Chunk::Data(bytes)),
            Ok(Err(err)) => Err(err),
            Err(mpsc::error::TryRecvError::Empty) => Ok(Chunk::Pending),
            Err(mpsc::error::TryRecvError::Disconnected) => Ok(Chunk::End),
        }
    }

    /// Wait for every chunk and concatenate them.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Aborted`] if the message was cut short.
    pub async fn collect(mut self) -> Result<Bytes, MessageError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.rx.recv().await {
            chunks.push(chunk?);
        }
        Ok(match chunks.len() {
            0 => Bytes::new(),
            1 => chunks.pop().unwrap_or_default(),
            _ => Bytes::from(chunks.concat()),
        })
    }
}

impl Stream for MessageBody {
    type Item = ChunkResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Session-side end of a [`MessageBody`].
#[derive(Debug)]
pub(crate) struct BodySender {
    tx: mpsc::UnboundedSender<ChunkResult>,
}

impl BodySender {
    /// Forward a chunk. A body the application has dropped is ignored.
    pub(crate) fn send(&mut self, chunk: Bytes) {
        if self.tx.send(Ok(chunk)).is_err() {
            log::trace!("message body dropped by application; discarding chunk");
        }
    }

    /// Signal that the message will never complete.
    pub(crate) fn abort(self) { let _ = self.tx.send(Err(MessageError::Aborted)); }
}

/// One logical WebSocket message.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use wsframe::message::{Message, MessageKind};
///
/// let message = Message::new(MessageKind::Text, Bytes::from_static(b"hi"));
/// assert!(!message.is_binary());
/// let text = futures::executor::block_on(message.into_text()).expect("valid text");
/// assert_eq!(text, "hi");
/// ```
#[derive(Debug)]
pub struct Message {
    kind: MessageKind,
    body: MessageBody,
}

impl Message {
    /// A complete single-chunk message.
    #[must_use]
    pub fn new(kind: MessageKind, payload: Bytes) -> Self { Self::streaming(kind, MessageBody::complete(payload)) }

    pub(crate) fn streaming(kind: MessageKind, body: MessageBody) -> Self { Self { kind, body } }

    #[must_use]
    pub fn kind(&self) -> MessageKind { self.kind }

    /// Whether the message arrived with the `Binary` opcode.
    #[must_use]
    pub fn is_binary(&self) -> bool { self.kind == MessageKind::Binary }

    /// Borrow the body to read chunks as they arrive.
    pub fn body_mut(&mut self) -> &mut MessageBody { &mut self.body }

    #[must_use]
    pub fn into_body(self) -> MessageBody { self.body }

    /// Wait for the whole payload.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Aborted`] if the message was cut short.
    pub async fn collect(self) -> Result<Bytes, MessageError> { self.body.collect().await }

    /// Wait for the whole payload and decode it as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Aborted`] if the message was cut short, or
    /// [`MessageError::InvalidUtf8`] if the payload is not valid text.
    pub async fn into_text(self) -> Result<String, MessageError> {
        let bytes = self.collect().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| MessageError::InvalidUtf8)
    }
}
