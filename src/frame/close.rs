//! Close status codes and close frame bodies.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Largest reason that fits a control frame after the 2-byte status code.
pub const MAX_REASON_LEN: usize = 123;

/// RFC 6455 close status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CloseCode(u16);

impl CloseCode {
    /// Normal closure.
    pub const NORMAL: Self = Self(1000);
    /// Endpoint is going away (server shutdown, page navigation).
    pub const GOING_AWAY: Self = Self(1001);
    /// Protocol error.
    pub const PROTOCOL_ERROR: Self = Self(1002);
    /// Received a data type the endpoint cannot accept.
    pub const UNSUPPORTED_DATA: Self = Self(1003);
    /// Reserved; never sent.
    pub const RESERVED: Self = Self(1004);
    /// No status code was present. Logging only, never sent.
    pub const NO_STATUS: Self = Self(1005);
    /// Connection dropped without a close frame. Logging only, never sent.
    pub const ABNORMAL: Self = Self(1006);
    /// Message data inconsistent with its type, e.g. invalid UTF-8 text.
    pub const INVALID_PAYLOAD: Self = Self(1007);
    /// Policy violation.
    pub const POLICY_VIOLATION: Self = Self(1008);
    /// Message too large to process.
    pub const MESSAGE_TOO_BIG: Self = Self(1009);
    /// Client expected an extension the server did not negotiate.
    pub const MANDATORY_EXTENSION: Self = Self(1010);
    /// Unexpected server condition.
    pub const INTERNAL_ERROR: Self = Self(1011);

    /// Wrap a raw status value.
    #[must_use]
    pub const fn new(code: u16) -> Self { Self(code) }

    /// Raw status value.
    #[must_use]
    pub const fn as_u16(self) -> u16 { self.0 }

    /// Whether this code may appear in a close frame on the wire.
    ///
    /// Registered codes 1000-1003 and 1007-1011 are allowed, as is the
    /// 3000-4999 range reserved for libraries and applications.
    ///
    /// ```
    /// use wsframe::frame::CloseCode;
    ///
    /// assert!(CloseCode::NORMAL.is_sendable());
    /// assert!(CloseCode::new(4000).is_sendable());
    /// assert!(!CloseCode::NO_STATUS.is_sendable());
    /// assert!(!CloseCode::new(1016).is_sendable());
    /// ```
    #[must_use]
    pub const fn is_sendable(self) -> bool {
        matches!(self.0, 1000..=1003 | 1007..=1011 | 3000..=4999)
    }
}

impl From<u16> for CloseCode {
    fn from(value: u16) -> Self { Self(value) }
}

impl From<CloseCode> for u16 {
    fn from(value: CloseCode) -> Self { value.0 }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Decoded body of a close frame carrying a status code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseReason {
    code: CloseCode,
    reason: String,
}

impl CloseReason {
    /// Build a close body, truncating `reason` to [`MAX_REASON_LEN`] bytes on
    /// a character boundary.
    #[must_use]
    pub fn new(code: CloseCode, reason: &str) -> Self {
        Self {
            code,
            reason: truncate_to_boundary(reason, MAX_REASON_LEN).to_owned(),
        }
    }

    /// Status code.
    #[must_use]
    pub const fn code(&self) -> CloseCode { self.code }

    /// Human readable reason, possibly empty.
    #[must_use]
    pub fn reason(&self) -> &str { &self.reason }

    /// Parse a close frame payload.
    ///
    /// An empty payload carries no status and yields `Ok(None)`. When
    /// `validate_utf8` is false an invalid reason is replaced lossily instead
    /// of being rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidClosePayload`] for a single byte
    /// payload, [`ProtocolError::InvalidCloseCode`] for codes that may not be
    /// sent, and [`ProtocolError::InvalidUtf8`] for a malformed reason.
    pub fn parse(payload: &[u8], validate_utf8: bool) -> Result<Option<Self>, ProtocolError> {
        let (code, reason) = match payload {
            [] => return Ok(None),
            [_] => return Err(ProtocolError::InvalidClosePayload { len: 1 }),
            [hi, lo, rest @ ..] => (CloseCode(u16::from_be_bytes([*hi, *lo])), rest),
        };
        if !code.is_sendable() {
            return Err(ProtocolError::InvalidCloseCode { code: code.0 });
        }
        let reason = if validate_utf8 {
            std::str::from_utf8(reason)
                .map_err(|_| ProtocolError::InvalidUtf8)?
                .to_owned()
        } else {
            String::from_utf8_lossy(reason).into_owned()
        };
        Ok(Some(Self { code, reason }))
    }

    /// Encode as a close frame payload.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + self.reason.len());
        buf.put_u16(self.code.0);
        buf.put_slice(self.reason.as_bytes());
        buf.freeze()
    }
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
