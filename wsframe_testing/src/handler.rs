//! A [`Handler`] that records every callback.

use bytes::Bytes;
use wsframe::{
    frame::CloseCode,
    message::{Message, MessageKind},
    session::{ConnectionId, Handler, Outbox},
};

/// One recorded callback.
#[derive(Debug)]
pub enum Event {
    Open(ConnectionId),
    Message(ConnectionId, Message),
    Close(ConnectionId, CloseCode, String),
}

/// Records callbacks in order. Optionally echoes each complete single-frame
/// message back through the outbox.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Vec<Event>,
    echo: bool,
}

impl RecordingHandler {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// A handler that answers every message with a copy of its first chunk.
    #[must_use]
    pub fn echoing() -> Self {
        Self {
            events: Vec::new(),
            echo: true,
        }
    }

    #[must_use]
    pub fn events(&self) -> &[Event] { &self.events }

    /// Number of `on_open` calls.
    #[must_use]
    pub fn opens(&self) -> usize { self.events.iter().filter(|e| matches!(e, Event::Open(_))).count() }

    /// Every `on_close` call as `(code, reason)`.
    #[must_use]
    pub fn closes(&self) -> Vec<(CloseCode, String)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Close(_, code, reason) => Some((*code, reason.clone())),
                _ => None,
            })
            .collect()
    }

    /// Remove and return the delivered messages.
    pub fn take_messages(&mut self) -> Vec<Message> {
        let (messages, rest) = std::mem::take(&mut self.events)
            .into_iter()
            .partition::<Vec<_>, _>(|event| matches!(event, Event::Message(..)));
        self.events = rest;
        messages
            .into_iter()
            .filter_map(|event| match event {
                Event::Message(_, message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Collect every delivered message into `(kind, payload)`.
    ///
    /// # Panics
    ///
    /// Panics if a message is incomplete or was aborted.
    pub fn collect_messages(&mut self) -> Vec<(MessageKind, Bytes)> {
        self.take_messages()
            .into_iter()
            .map(|message| {
                let kind = message.kind();
                let payload = futures::executor::block_on(message.collect()).expect("complete message");
                (kind, payload)
            })
            .collect()
    }
}

impl Handler for RecordingHandler {
    fn on_open(&mut self, id: ConnectionId, _outbox: &mut Outbox<'_>) { self.events.push(Event::Open(id)); }

    fn on_message(&mut self, id: ConnectionId, mut message: Message, outbox: &mut Outbox<'_>) {
        if self.echo
            && let Ok(wsframe::message::Chunk::Data(first)) = message.body_mut().try_next_chunk()
        {
            let _ = match message.kind() {
                MessageKind::Text => outbox.send_text(String::from_utf8_lossy(&first).into_owned()),
                MessageKind::Binary => outbox.send_binary(first.clone()),
            };
            message = Message::new(message.kind(), first);
        }
        self.events.push(Event::Message(id, message));
    }

    fn on_close(&mut self, id: ConnectionId, code: CloseCode, reason: &str) {
        self.events.push(Event::Close(id, code, reason.to_owned()));
    }
}
