//! Opening handshake helpers.
//!
//! The framing engine starts once the HTTP upgrade has completed. These
//! helpers cover the small part of RFC 6455 section 4 a server needs:
//! reading the request head, validating the upgrade headers and computing
//! `Sec-WebSocket-Accept`.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// GUID appended to the client key before hashing.
pub const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
/// The only protocol version this crate speaks.
pub const WEBSOCKET_VERSION: &str = "13";
/// Largest request head [`RequestHead::parse`] will buffer.
pub const MAX_HEAD_LEN: usize = 8 * 1024;

pub const SEC_WEBSOCKET_ACCEPT: &str = "Sec-WebSocket-Accept";
pub const SEC_WEBSOCKET_KEY: &str = "Sec-WebSocket-Key";
pub const SEC_WEBSOCKET_VERSION: &str = "Sec-WebSocket-Version";

/// Reasons an upgrade request is refused.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The request head is not valid HTTP/1.1.
    #[error("malformed request head")]
    Malformed,
    /// The request head exceeded [`MAX_HEAD_LEN`] bytes.
    #[error("request head exceeds {MAX_HEAD_LEN} bytes")]
    HeadTooLarge,
    /// Upgrades are only allowed on `GET`.
    #[error("method {0} cannot be upgraded")]
    Method(String),
    /// A required header is absent.
    #[error("missing header: {0}")]
    MissingHeader(&'static str),
    /// `Upgrade` or `Connection` does not request a WebSocket upgrade.
    #[error("request is not a websocket upgrade")]
    NotUpgrade,
    /// `Sec-WebSocket-Version` is not 13.
    #[error("unsupported websocket version: {0}")]
    UnsupportedVersion(String),
    /// `Sec-WebSocket-Key` is not 16 base64-encoded bytes.
    #[error("invalid Sec-WebSocket-Key")]
    InvalidKey,
}

/// Compute the `Sec-WebSocket-Accept` value for a client key.
///
/// ```
/// use wsframe::handshake::accept_key;
///
/// assert_eq!(
///     accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
///     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
/// );
/// ```
#[must_use]
pub fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(GUID.as_bytes());
    STANDARD.encode(sha1.finalize())
}

/// A fresh random `Sec-WebSocket-Key` for client requests.
#[must_use]
pub fn generate_key() -> String { STANDARD.encode(rand::random::<[u8; 16]>()) }

/// Parsed request line and headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHead {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Parse a request head from the start of `buf`.
    ///
    /// Returns `Ok(None)` until the blank line ending the head has arrived,
    /// otherwise the head and the number of bytes it occupied. Bytes after
    /// that belong to the WebSocket stream.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::HeadTooLarge`] once [`MAX_HEAD_LEN`] bytes
    /// arrive without a terminator and [`HandshakeError::Malformed`] for an
    /// unparseable head.
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, HandshakeError> {
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            if buf.len() >= MAX_HEAD_LEN {
                return Err(HandshakeError::HeadTooLarge);
            }
            return Ok(None);
        };
        if end + 4 > MAX_HEAD_LEN {
            return Err(HandshakeError::HeadTooLarge);
        }
        let text = std::str::from_utf8(&buf[..end]).map_err(|_| HandshakeError::Malformed)?;
        let mut lines = text.split("\r\n");
        let request_line = lines.next().ok_or(HandshakeError::Malformed)?;
        let mut parts = request_line.split(' ');
        let (Some(method), Some(path), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(HandshakeError::Malformed);
        };
        if version != "HTTP/1.1" {
            return Err(HandshakeError::Malformed);
        }
        let headers = lines
            .map(|line| {
                let (name, value) = line.split_once(':').ok_or(HandshakeError::Malformed)?;
                Ok((name.trim().to_owned(), value.trim().to_owned()))
            })
            .collect::<Result<Vec<_>, HandshakeError>>()?;
        let head = Self {
            method: method.to_owned(),
            path: path.to_owned(),
            headers,
        };
        Ok(Some((head, end + 4)))
    }

    #[must_use]
    pub fn method(&self) -> &str { &self.method }

    #[must_use]
    pub fn path(&self) -> &str { &self.path }

    /// First value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over every header in arrival order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check this head is a valid upgrade request; see [`validate_upgrade`].
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::Method`] for methods other than `GET`, or
    /// any error from [`validate_upgrade`].
    pub fn validate(&self) -> Result<&str, HandshakeError> {
        if self.method != "GET" {
            return Err(HandshakeError::Method(self.method.clone()));
        }
        validate_upgrade(|name| self.header(name))
    }
}

/// Validate the upgrade headers of a request, returning the client key.
///
/// `header` looks a header up by name, case-insensitively.
///
/// # Errors
///
/// Returns [`HandshakeError::MissingHeader`] for absent headers,
/// [`HandshakeError::NotUpgrade`] if `Upgrade: websocket` and
/// `Connection: Upgrade` are not both present,
/// [`HandshakeError::UnsupportedVersion`] for versions other than 13 and
/// [`HandshakeError::InvalidKey`] for a malformed key.
pub fn validate_upgrade<'a>(header: impl Fn(&str) -> Option<&'a str>) -> Result<&'a str, HandshakeError> {
    let upgrade = header("Upgrade").ok_or(HandshakeError::MissingHeader("Upgrade"))?;
    let connection = header("Connection").ok_or(HandshakeError::MissingHeader("Connection"))?;
    if !has_token(upgrade, "websocket") || !has_token(connection, "upgrade") {
        return Err(HandshakeError::NotUpgrade);
    }
    let version = header(SEC_WEBSOCKET_VERSION).ok_or(HandshakeError::MissingHeader(SEC_WEBSOCKET_VERSION))?;
    if version != WEBSOCKET_VERSION {
        return Err(HandshakeError::UnsupportedVersion(version.to_owned()));
    }
    let key = header(SEC_WEBSOCKET_KEY).ok_or(HandshakeError::MissingHeader(SEC_WEBSOCKET_KEY))?;
    match STANDARD.decode(key) {
        Ok(raw) if raw.len() == 16 => Ok(key),
        _ => Err(HandshakeError::InvalidKey),
    }
}

fn has_token(value: &str, token: &str) -> bool {
    value.split(',').any(|part| part.trim().eq_ignore_ascii_case(token))
}

/// The `101 Switching Protocols` response accepting `key`.
#[must_use]
pub fn response_head(key: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n{SEC_WEBSOCKET_ACCEPT}: {}\r\n\r\n",
        accept_key(key)
    )
}

/// A `400 Bad Request` response for a refused upgrade.
#[must_use]
pub fn rejection_head(err: &HandshakeError) -> String {
    let version = if matches!(err, HandshakeError::UnsupportedVersion(_)) {
        format!("{SEC_WEBSOCKET_VERSION}: {WEBSOCKET_VERSION}\r\n")
    } else {
        String::new()
    };
    format!("HTTP/1.1 400 Bad Request\r\n{version}Content-Length: 0\r\nConnection: close\r\n\r\n")
}
