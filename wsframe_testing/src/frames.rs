//! Wire byte builders.

use wsframe::{
    frame::Frame,
    parser::{FrameParser, ParserConfig, Role},
};

/// Masking key used for every client frame built here.
pub const CLIENT_KEY: [u8; 4] = [0x0a, 0x1b, 0x2c, 0x3d];

/// Encode `frame` as a client would send it, masked with [`CLIENT_KEY`].
#[must_use]
pub fn client_frame(frame: Frame) -> Vec<u8> { frame.with_mask(CLIENT_KEY).encode().to_vec() }

/// Concatenate several client frames.
#[must_use]
pub fn client_bytes(frames: impl IntoIterator<Item = Frame>) -> Vec<u8> {
    frames.into_iter().flat_map(client_frame).collect()
}

/// Split `bytes` into chunks of `size` bytes; the last may be shorter.
///
/// # Panics
///
/// Panics if `size` is zero.
#[must_use]
pub fn split_every(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    assert!(size > 0, "chunk size must be non-zero");
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}

/// Decode every frame in `bytes` as the peer in `receiver` would.
///
/// # Panics
///
/// Panics if `bytes` is not a whole number of valid frames.
#[must_use]
pub fn decode_all(bytes: &[u8], receiver: Role) -> Vec<Frame> {
    let mut parser = FrameParser::new(ParserConfig::for_role(receiver));
    parser.feed(bytes);
    let frames = parser
        .frames()
        .collect::<Result<Vec<_>, _>>()
        .expect("bytes hold valid frames");
    assert_eq!(parser.buffered_len(), 0, "trailing partial frame");
    frames
}
