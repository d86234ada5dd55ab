//! Application callback surface.

use super::{ConnectionId, Outbox};
use crate::{frame::CloseCode, message::Message};

/// Lifecycle callbacks for one connection.
///
/// Callbacks run synchronously inside [`Session::receive`] and friends, so
/// they must not block. Long-running work on a message body belongs in a
/// spawned task; the [`Outbox`] is only valid for the duration of the call.
///
/// [`Session::receive`]: super::Session::receive
///
/// # Examples
///
/// ```
/// use wsframe::{
///     message::Message,
///     session::{ConnectionId, Handler, Outbox},
/// };
///
/// struct Greeter;
///
/// impl Handler for Greeter {
///     fn on_open(&mut self, _id: ConnectionId, outbox: &mut Outbox<'_>) {
///         let _ = outbox.send_text("welcome");
///     }
///
///     fn on_message(&mut self, _id: ConnectionId, _message: Message, _outbox: &mut Outbox<'_>) {}
/// }
/// ```
pub trait Handler {
    /// Called once, before any message is delivered.
    fn on_open(&mut self, _id: ConnectionId, _outbox: &mut Outbox<'_>) {}

    /// Called when the first frame of a message arrives.
    ///
    /// The message body keeps receiving chunks as later fragments arrive.
    fn on_message(&mut self, id: ConnectionId, message: Message, outbox: &mut Outbox<'_>);

    /// Called once when the connection reaches
    /// [`ConnectionState::Closed`](super::ConnectionState::Closed).
    ///
    /// `code` is the peer's status, [`CloseCode::NO_STATUS`] when its Close
    /// frame carried none, [`CloseCode::ABNORMAL`] when the transport went
    /// away without a Close, or the status this end sent after a protocol
    /// violation.
    fn on_close(&mut self, _id: ConnectionId, _code: CloseCode, _reason: &str) {}
}
