//! The 4-bit opcode carried in the first header byte.

use crate::error::ProtocolError;

/// Frame purpose as carried in bits 3-0 of the first header byte.
///
/// Reserved opcodes (`0x3`-`0x7`, `0xB`-`0xF`) have no variant and are
/// rejected by [`Opcode::try_from`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Continues a fragmented text or binary message.
    Continuation = 0x0,
    /// First (or only) frame of a UTF-8 text message.
    Text = 0x1,
    /// First (or only) frame of a binary message.
    Binary = 0x2,
    /// Connection close.
    Close = 0x8,
    /// Liveness probe.
    Ping = 0x9,
    /// Reply to a ping.
    Pong = 0xA,
}

impl Opcode {
    /// Raw wire value.
    #[must_use]
    pub const fn as_u8(self) -> u8 { self as u8 }

    /// `Close`, `Ping` and `Pong` are control opcodes.
    #[must_use]
    pub const fn is_control(self) -> bool { matches!(self, Self::Close | Self::Ping | Self::Pong) }

    /// `Continuation`, `Text` and `Binary` carry message data.
    #[must_use]
    pub const fn is_data(self) -> bool { !self.is_control() }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            opcode => Err(ProtocolError::InvalidOpcode { opcode }),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self { value.as_u8() }
}
