//! Resumable frame decoding as a pure transition function.
//!
//! [`resume`] inspects the bytes buffered so far and either asks for more,
//! advances to the next phase, or emits a finished [`Frame`]. Bytes are only
//! consumed from the front of the buffer once the phase that needs them can
//! complete, so a phase never re-reads input after a later feed.

use bytes::{Buf, BytesMut};

use super::ParserConfig;
use crate::{
    error::ProtocolError,
    frame::{
        FIN_BIT,
        Frame,
        LEN_MASK,
        LEN16_MARKER,
        LEN64_MARKER,
        MASK_BIT,
        MASK_LEN,
        OPCODE_MASK,
        Opcode,
        RSV_MASK,
        RSV_SHIFT,
        apply_mask,
        validate_control,
        validate_reserved,
    },
};

const BASE_HEADER_LEN: usize = 2;
const LONG_LEN_MSB: u64 = 1 << 63;

/// Fields decoded from the first two header bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHead {
    /// Final fragment flag.
    pub fin: bool,
    /// RSV1-3, `RSV1` in the most significant position.
    pub reserved: u8,
    /// Frame opcode.
    pub opcode: Opcode,
    /// Whether a masking key follows the length.
    pub masked: bool,
}

/// Extended length field width following the base header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthWidth {
    /// Base length 126: a big-endian `u16` follows.
    Medium,
    /// Base length 127: a big-endian `u64` follows.
    Long,
}

impl LengthWidth {
    const fn bytes(self) -> usize {
        match self {
            Self::Medium => 2,
            Self::Long => 8,
        }
    }
}

/// Current phase of the incremental parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParserState {
    /// Waiting for the two base header bytes.
    AwaitingHeader,
    /// Waiting for a 16- or 64-bit extended length.
    AwaitingExtendedLength {
        /// Header bits already decoded.
        head: FrameHead,
        /// Width of the pending length field.
        width: LengthWidth,
    },
    /// Waiting for the four masking-key bytes.
    AwaitingMask {
        /// Header bits already decoded.
        head: FrameHead,
        /// Declared payload length.
        len: usize,
    },
    /// Waiting until `len` payload bytes are buffered.
    AwaitingPayload {
        /// Header bits already decoded.
        head: FrameHead,
        /// Declared payload length.
        len: usize,
        /// Masking key, if the frame carries one.
        mask: Option<[u8; 4]>,
    },
    /// A protocol violation was detected. Terminal.
    Failed(ProtocolError),
}

/// Result of one call to [`resume`].
#[derive(Debug)]
pub(crate) enum Transition {
    /// Not enough bytes; stay in the given state until the next feed.
    NeedMore(ParserState),
    /// Phase complete; continue with the given state.
    Next(ParserState),
    /// A whole frame was decoded; the parser returns to `AwaitingHeader`.
    Emit(Frame),
}

pub(crate) fn resume(
    state: ParserState,
    config: &ParserConfig,
    buf: &mut BytesMut,
) -> Result<Transition, ProtocolError> {
    match state {
        ParserState::AwaitingHeader => read_header(config, buf),
        ParserState::AwaitingExtendedLength { head, width } => {
            read_extended_length(head, width, config, buf)
        }
        ParserState::AwaitingMask { head, len } => Ok(read_mask(head, len, buf)),
        ParserState::AwaitingPayload { head, len, mask } => read_payload(head, len, mask, config, buf),
        ParserState::Failed(err) => Err(err),
    }
}

fn read_header(config: &ParserConfig, buf: &mut BytesMut) -> Result<Transition, ProtocolError> {
    if buf.len() < BASE_HEADER_LEN {
        return Ok(Transition::NeedMore(ParserState::AwaitingHeader));
    }
    let (b0, b1) = (buf[0], buf[1]);

    let reserved = (b0 >> RSV_SHIFT) & RSV_MASK;
    validate_reserved(reserved, config.reserved_bits_policy())?;
    let opcode = Opcode::try_from(b0 & OPCODE_MASK)?;
    let fin = b0 & FIN_BIT != 0;
    let base_len = b1 & LEN_MASK;
    validate_control(fin, opcode, usize::from(base_len))?;
    let masked = b1 & MASK_BIT != 0;
    config.inbound_mask_policy().check(masked)?;

    buf.advance(BASE_HEADER_LEN);
    let head = FrameHead {
        fin,
        reserved,
        opcode,
        masked,
    };
    let next = match base_len {
        LEN16_MARKER => ParserState::AwaitingExtendedLength {
            head,
            width: LengthWidth::Medium,
        },
        LEN64_MARKER => ParserState::AwaitingExtendedLength {
            head,
            width: LengthWidth::Long,
        },
        len => after_length(head, checked_len(u64::from(len), config)?),
    };
    Ok(Transition::Next(next))
}

fn read_extended_length(
    head: FrameHead,
    width: LengthWidth,
    config: &ParserConfig,
    buf: &mut BytesMut,
) -> Result<Transition, ProtocolError> {
    if buf.len() < width.bytes() {
        return Ok(Transition::NeedMore(ParserState::AwaitingExtendedLength {
            head,
            width,
        }));
    }
    let declared = match width {
        LengthWidth::Medium => u64::from(buf.get_u16()),
        LengthWidth::Long => buf.get_u64(),
    };
    if declared & LONG_LEN_MSB != 0 {
        return Err(ProtocolError::InvalidLengthEncoding);
    }
    let len = checked_len(declared, config)?;
    Ok(Transition::Next(after_length(head, len)))
}

fn read_mask(head: FrameHead, len: usize, buf: &mut BytesMut) -> Transition {
    if buf.len() < MASK_LEN {
        return Transition::NeedMore(ParserState::AwaitingMask { head, len });
    }
    let key = [buf[0], buf[1], buf[2], buf[3]];
    buf.advance(MASK_LEN);
    Transition::Next(awaiting_payload(head, len, Some(key)))
}

fn read_payload(
    head: FrameHead,
    len: usize,
    mask: Option<[u8; 4]>,
    config: &ParserConfig,
    buf: &mut BytesMut,
) -> Result<Transition, ProtocolError> {
    if buf.len() < len {
        return Ok(Transition::NeedMore(ParserState::AwaitingPayload {
            head,
            len,
            mask,
        }));
    }
    let mut payload = buf.split_to(len);
    if let Some(key) = mask {
        apply_mask(&mut payload, key);
    }
    let frame = Frame::from_parts(
        head.fin,
        head.reserved,
        head.opcode,
        payload.freeze(),
        mask,
        config.reserved_bits_policy(),
    )?;
    Ok(Transition::Emit(frame))
}

fn checked_len(declared: u64, config: &ParserConfig) -> Result<usize, ProtocolError> {
    let max = config.frame_size_limit();
    let too_large = ProtocolError::FrameTooLarge {
        size: declared,
        max,
    };
    match usize::try_from(declared) {
        Ok(len) if len <= max => Ok(len),
        _ => Err(too_large),
    }
}

const fn after_length(head: FrameHead, len: usize) -> ParserState {
    if head.masked {
        ParserState::AwaitingMask { head, len }
    } else {
        awaiting_payload(head, len, None)
    }
}

/// The buffer grows only as payload bytes arrive; the declared length is
/// never reserved up front.
const fn awaiting_payload(head: FrameHead, len: usize, mask: Option<[u8; 4]>) -> ParserState {
    ParserState::AwaitingPayload { head, len, mask }
}
