//! Fragment reassembly.
//!
//! Data frames are threaded into a [`Message`] as they arrive: the first
//! frame creates the message and its body channel, continuations append a
//! chunk each, and the frame with `fin` set closes the body. Size and UTF-8
//! checks run per frame, so a violation is caught before the rest of the
//! message arrives.

use log::trace;

use crate::{
    error::ProtocolError,
    frame::{Frame, Opcode},
    message::{BodySender, Message, MessageBody, MessageKind, Utf8Validator},
};

#[derive(Debug)]
enum Assembly {
    Idle,
    Assembling {
        sender: BodySender,
        size: usize,
        utf8: Option<Utf8Validator>,
    },
}

#[derive(Debug)]
pub(crate) struct Assembler {
    assembly: Assembly,
    max_message_size: usize,
    validate_utf8: bool,
}

impl Assembler {
    pub(crate) fn new(max_message_size: usize, validate_utf8: bool) -> Self {
        Self {
            assembly: Assembly::Idle,
            max_message_size,
            validate_utf8,
        }
    }

    /// Feed one data frame. Returns the new [`Message`] when `frame` starts
    /// one; continuations return `None`.
    pub(crate) fn push(&mut self, frame: Frame) -> Result<Option<Message>, ProtocolError> {
        match frame.opcode() {
            Opcode::Text | Opcode::Binary => self.start(frame).map(Some),
            Opcode::Continuation => self.resume(frame).map(|()| None),
            Opcode::Close | Opcode::Ping | Opcode::Pong => Ok(None),
        }
    }

    fn start(&mut self, frame: Frame) -> Result<Message, ProtocolError> {
        let opcode = frame.opcode();
        if self.in_progress() {
            return Err(ProtocolError::ExpectedContinuation { opcode });
        }
        let kind = if opcode == Opcode::Text {
            MessageKind::Text
        } else {
            MessageKind::Binary
        };
        let fin = frame.fin();
        let payload = frame.into_payload();
        let size = checked_size(0, payload.len(), self.max_message_size)?;
        let mut utf8 = (kind == MessageKind::Text && self.validate_utf8).then(Utf8Validator::new);
        if let Some(validator) = utf8.as_mut() {
            validator.feed(&payload, fin)?;
        }

        let (mut sender, body) = MessageBody::channel();
        sender.send(payload);
        if !fin {
            trace!("fragmented {kind:?} message started: size={size}");
            self.assembly = Assembly::Assembling { sender, size, utf8 };
        }
        Ok(Message::streaming(kind, body))
    }

    fn resume(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        let max = self.max_message_size;
        let Assembly::Assembling { sender, size, utf8 } = &mut self.assembly else {
            return Err(ProtocolError::UnexpectedContinuation);
        };
        let fin = frame.fin();
        let payload = frame.into_payload();
        *size = checked_size(*size, payload.len(), max)?;
        if let Some(validator) = utf8.as_mut() {
            validator.feed(&payload, fin)?;
        }
        sender.send(payload);
        if fin {
            trace!("fragmented message complete: size={size}");
            self.assembly = Assembly::Idle;
        }
        Ok(())
    }

    /// Whether a fragmented message is waiting for continuations.
    pub(crate) fn in_progress(&self) -> bool { matches!(self.assembly, Assembly::Assembling { .. }) }

    /// Cut short any message in progress; its body yields `Aborted`.
    pub(crate) fn abort(&mut self) {
        if let Assembly::Assembling { sender, .. } = std::mem::replace(&mut self.assembly, Assembly::Idle) {
            trace!("aborting message in progress");
            sender.abort();
        }
    }
}

fn checked_size(current: usize, added: usize, max: usize) -> Result<usize, ProtocolError> {
    let size = current.saturating_add(added);
    if size > max {
        return Err(ProtocolError::MessageTooLarge { size, max });
    }
    Ok(size)
}
