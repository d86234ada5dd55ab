//! The RFC 6455 frame value type and its wire encoding.
//!
//! A [`Frame`] is immutable once built. Every constructor validates the
//! control-frame and reserved-bit rules, so a `Frame` value is always fit to
//! be written to the wire.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |            (16/64)            |
//! |N|V|V|V|       |S|             |  (if payload len==126/127)    |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               | Masking-key, if MASK set to 1 |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    error::ProtocolError,
    parser::{FrameParser, MaskPolicy, ParserConfig},
};

mod close;
mod header;
mod mask;
mod opcode;

pub use close::{CloseCode, CloseReason, MAX_REASON_LEN};
pub use header::{
    FIN_BIT,
    LEN_MASK,
    LEN16_MARKER,
    LEN64_MARKER,
    MASK_BIT,
    MASK_LEN,
    MAX_HEADER_LEN,
    MAX_SHORT_LEN,
    OPCODE_MASK,
    PayloadLen,
    RSV_MASK,
    RSV_SHIFT,
    RSV1,
    RSV2,
    RSV3,
    header_len,
};
pub use mask::{apply_mask, random_mask};
pub use opcode::Opcode;

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: usize = MAX_SHORT_LEN;

/// How frames with non-zero reserved bits are treated.
///
/// No extension is negotiated by this crate, so the default rejects them.
/// `PassThrough` hands the bits to the application untouched, for callers
/// that negotiate an extension themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReservedBitsPolicy {
    /// Fail with [`ProtocolError::NonZeroReservedBits`].
    #[default]
    Reject,
    /// Accept and preserve the bits.
    PassThrough,
}

/// One unit of the WebSocket wire protocol.
///
/// `payload` always holds the unmasked application bytes. When a masking
/// key is present, [`Frame::encode`] masks the payload on the way out and
/// the parser unmasks it on the way in.
///
/// # Examples
///
/// ```
/// use wsframe::frame::{Frame, Opcode};
///
/// let frame = Frame::text("Hello");
/// assert_eq!(frame.encode().as_ref(), b"\x81\x05Hello");
///
/// let decoded = Frame::decode(&frame.encode()).expect("valid frame");
/// assert_eq!(decoded.opcode(), Opcode::Text);
/// assert_eq!(decoded, frame);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    fin: bool,
    reserved: u8,
    opcode: Opcode,
    payload: Bytes,
    mask: Option<[u8; 4]>,
}

impl Frame {
    /// Build an unmasked frame with cleared reserved bits.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FragmentedControlFrame`] or
    /// [`ProtocolError::ControlFrameTooLarge`] for invalid control frames.
    pub fn new(fin: bool, opcode: Opcode, payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        Self::from_parts(
            fin,
            0,
            opcode,
            payload.into(),
            None,
            ReservedBitsPolicy::Reject,
        )
    }

    /// Build a frame from its individual header fields.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NonZeroReservedBits`] if `reserved` does not
    /// fit three bits or is non-zero under [`ReservedBitsPolicy::Reject`],
    /// and the control-frame errors described on [`Frame::new`].
    pub fn from_parts(
        fin: bool,
        reserved: u8,
        opcode: Opcode,
        payload: Bytes,
        mask: Option<[u8; 4]>,
        policy: ReservedBitsPolicy,
    ) -> Result<Self, ProtocolError> {
        validate_reserved(reserved, policy)?;
        validate_control(fin, opcode, payload.len())?;
        Ok(Self {
            fin,
            reserved,
            opcode,
            payload,
            mask,
        })
    }

    /// A complete, unfragmented text frame.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self { Self::data(Opcode::Text, Bytes::from(text.into())) }

    /// A complete, unfragmented binary frame.
    #[must_use]
    pub fn binary(payload: impl Into<Bytes>) -> Self { Self::data(Opcode::Binary, payload.into()) }

    /// A continuation fragment; `fin` marks the last fragment of a message.
    #[must_use]
    pub fn continuation(fin: bool, payload: impl Into<Bytes>) -> Self {
        Self {
            fin,
            reserved: 0,
            opcode: Opcode::Continuation,
            payload: payload.into(),
            mask: None,
        }
    }

    /// A ping carrying at most 125 bytes of application data.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ControlFrameTooLarge`] if the payload is
    /// longer than 125 bytes.
    pub fn ping(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        Self::new(true, Opcode::Ping, payload)
    }

    /// A pong carrying at most 125 bytes of application data.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ControlFrameTooLarge`] if the payload is
    /// longer than 125 bytes.
    pub fn pong(payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        Self::new(true, Opcode::Pong, payload)
    }

    /// A close frame carrying `code` and a reason truncated to fit.
    #[must_use]
    pub fn close(code: CloseCode, reason: &str) -> Self {
        Self::close_frame(CloseReason::new(code, reason).encode())
    }

    /// A close frame without a status code.
    #[must_use]
    pub fn close_empty() -> Self { Self::close_frame(Bytes::new()) }

    fn close_frame(payload: Bytes) -> Self {
        Self {
            fin: true,
            reserved: 0,
            opcode: Opcode::Close,
            payload,
            mask: None,
        }
    }

    fn data(opcode: Opcode, payload: Bytes) -> Self {
        Self {
            fin: true,
            reserved: 0,
            opcode,
            payload,
            mask: None,
        }
    }

    /// Attach a masking key. Client-originated frames must carry one.
    #[must_use]
    pub fn with_mask(mut self, key: [u8; 4]) -> Self {
        self.mask = Some(key);
        self
    }

    /// Drop the masking key.
    #[must_use]
    pub fn without_mask(mut self) -> Self {
        self.mask = None;
        self
    }

    /// Whether this is the final fragment of a message.
    #[must_use]
    pub const fn fin(&self) -> bool { self.fin }

    /// The three reserved bits, `RSV1` in the most significant position.
    #[must_use]
    pub const fn reserved(&self) -> u8 { self.reserved }

    /// Frame opcode.
    #[must_use]
    pub const fn opcode(&self) -> Opcode { self.opcode }

    /// Unmasked payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Consume the frame, returning the unmasked payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }

    /// Masking key, if any.
    #[must_use]
    pub const fn mask(&self) -> Option<[u8; 4]> { self.mask }

    /// Whether the opcode is `Close`, `Ping` or `Pong`.
    #[must_use]
    pub const fn is_control(&self) -> bool { self.opcode.is_control() }

    /// Exact number of bytes [`Frame::encode`] produces.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        header_len(self.payload.len(), self.mask.is_some()) + self.payload.len()
    }

    /// Encode into a fresh buffer.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut dst);
        dst.freeze()
    }

    /// Append the wire representation to `dst`.
    ///
    /// The length field uses the narrowest encoding. With a masking key the
    /// key is written in the clear, followed by the masked payload.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        let len = PayloadLen::for_len(self.payload.len());
        dst.reserve(self.encoded_len());

        let fin = if self.fin { FIN_BIT } else { 0 };
        dst.put_u8(fin | (self.reserved << RSV_SHIFT) | self.opcode.as_u8());
        let masked = if self.mask.is_some() { MASK_BIT } else { 0 };
        dst.put_u8(masked | len.marker());
        len.put_extended(dst);

        match self.mask {
            Some(key) => {
                dst.put_slice(&key);
                let start = dst.len();
                dst.put_slice(&self.payload);
                apply_mask(&mut dst[start..], key);
            }
            None => dst.put_slice(&self.payload),
        }
    }

    /// Decode exactly one frame, unmasking its payload if a key is present.
    ///
    /// Reserved bits must be zero. Use [`Frame::decode_with`] to change the
    /// masking or reserved-bit rules.
    ///
    /// # Errors
    ///
    /// Returns the [`ProtocolError`] raised by the parser,
    /// [`ProtocolError::Truncated`] when `bytes` holds less than a frame, or
    /// [`ProtocolError::TrailingBytes`] when it holds more.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let config = ParserConfig::default()
            .mask_policy(MaskPolicy::Optional)
            .max_frame_size(crate::parser::MAX_FRAME_SIZE);
        Self::decode_with(bytes, config)
    }

    /// Decode exactly one frame under `config`.
    ///
    /// # Errors
    ///
    /// See [`Frame::decode`].
    pub fn decode_with(bytes: &[u8], config: ParserConfig) -> Result<Self, ProtocolError> {
        let mut parser = FrameParser::new(config);
        parser.feed(bytes);
        let frame = parser
            .next_frame()?
            .ok_or(ProtocolError::Truncated {
                buffered: bytes.len(),
            })?;
        match parser.buffered_len() {
            0 => Ok(frame),
            len => Err(ProtocolError::TrailingBytes { len }),
        }
    }
}

pub(crate) fn validate_reserved(bits: u8, policy: ReservedBitsPolicy) -> Result<(), ProtocolError> {
    let out_of_range = bits & !RSV_MASK != 0;
    if out_of_range || (bits != 0 && policy == ReservedBitsPolicy::Reject) {
        return Err(ProtocolError::NonZeroReservedBits { bits });
    }
    Ok(())
}

pub(crate) fn validate_control(fin: bool, opcode: Opcode, len: usize) -> Result<(), ProtocolError> {
    if !opcode.is_control() {
        return Ok(());
    }
    if !fin {
        return Err(ProtocolError::FragmentedControlFrame { opcode });
    }
    if len > MAX_CONTROL_PAYLOAD {
        return Err(ProtocolError::ControlFrameTooLarge { len });
    }
    Ok(())
}
