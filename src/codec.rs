//! `tokio_util` codec adapter over the frame parser.
//!
//! [`WebSocketCodec`] lets the framing engine sit under a
//! [`Framed`](tokio_util::codec::Framed) transport. Decoding runs the same
//! state machine as [`FrameParser`](crate::parser::FrameParser), over the
//! buffer `Framed` owns. Protocol errors surface as
//! [`io::ErrorKind::InvalidData`]; a stream that ends mid-frame surfaces as
//! [`io::ErrorKind::UnexpectedEof`].

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    error::ProtocolError,
    frame::{Frame, random_mask},
    parser::{FrameDecoder, ParserConfig, ParserState, Role},
};

/// Frame codec for one end of a WebSocket connection.
///
/// In the client role, outbound frames without a masking key are masked
/// with a fresh random key.
#[derive(Debug)]
pub struct WebSocketCodec {
    decoder: FrameDecoder,
    role: Role,
}

impl WebSocketCodec {
    /// Codec with default limits for `role`.
    #[must_use]
    pub fn new(role: Role) -> Self { Self::with_config(role, ParserConfig::for_role(role)) }

    /// Codec with explicit parser settings.
    #[must_use]
    pub fn with_config(role: Role, config: ParserConfig) -> Self {
        Self {
            decoder: FrameDecoder::new(config),
            role,
        }
    }

    /// Maximum payload a decoded frame may carry.
    #[must_use]
    pub fn max_frame_size(&self) -> usize { self.decoder.config().frame_size_limit() }

    fn mid_frame(&self) -> bool { !matches!(self.decoder.state(), ParserState::AwaitingHeader) }
}

impl Default for WebSocketCodec {
    fn default() -> Self { Self::new(Role::Server) }
}

impl Decoder for WebSocketCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.decoder.decode(src)?)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() && !self.mid_frame() => Ok(None),
            None => {
                tracing::debug!(buffered = src.len(), "stream ended inside a frame");
                Err(ProtocolError::Truncated {
                    buffered: src.len(),
                }
                .into())
            }
        }
    }
}

impl Encoder<Frame> for WebSocketCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = if self.role.masks_outbound() && item.mask().is_none() {
            item.with_mask(random_mask())
        } else {
            item
        };
        frame.encode_into(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::{SinkExt, StreamExt};
    use rstest::rstest;
    use tokio_util::codec::{Decoder, Encoder, Framed};
    use tracing_test::traced_test;

    use super::*;
    use crate::frame::Opcode;

    #[test]
    fn client_encoder_masks_frames() {
        let mut client = WebSocketCodec::new(Role::Client);
        let mut server = WebSocketCodec::new(Role::Server);
        let mut buf = BytesMut::new();
        client
            .encode(Frame::text("hi"), &mut buf)
            .expect("encode should succeed");
        assert_ne!(buf[1] & crate::frame::MASK_BIT, 0);

        let frame = server
            .decode(&mut buf)
            .expect("decode should succeed")
            .expect("expected a frame");
        assert_eq!(frame.payload().as_ref(), b"hi");
    }

    #[test]
    fn server_encoder_leaves_frames_unmasked() {
        let mut codec = WebSocketCodec::default();
        let mut buf = BytesMut::new();
        codec
            .encode(Frame::text("Hello"), &mut buf)
            .expect("encode should succeed");
        assert_eq!(buf.as_ref(), b"\x81\x05Hello");
    }

    #[rstest]
    #[case::mid_header(&[0x81][..])]
    #[case::mid_payload(&[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f][..])]
    fn eof_inside_frame_is_unexpected_eof(#[case] wire: &[u8]) {
        let mut codec = WebSocketCodec::default();
        let mut buf = BytesMut::from(wire);
        let err = codec.decode_eof(&mut buf).expect_err("truncated frame");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    #[traced_test]
    fn truncated_stream_is_traced() {
        let mut codec = WebSocketCodec::default();
        let mut buf = BytesMut::from(&[0x82_u8, 0x80][..]);
        assert!(codec.decode_eof(&mut buf).is_err());
        assert!(logs_contain("stream ended inside a frame"));
    }

    #[test]
    fn eof_at_frame_boundary_is_clean() {
        let mut codec = WebSocketCodec::default();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).expect("clean eof").is_none());
    }

    #[test]
    fn protocol_error_is_invalid_data() {
        let mut codec = WebSocketCodec::default();
        let mut buf = BytesMut::from(&b"\x81\x00"[..]);
        let err = codec.decode(&mut buf).expect_err("unmasked client frame");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn framed_transports_exchange_frames() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let mut client = Framed::new(client_io, WebSocketCodec::new(Role::Client));
        let mut server = Framed::new(server_io, WebSocketCodec::new(Role::Server));

        client
            .send(Frame::binary(vec![9_u8; 200]))
            .await
            .expect("send should succeed");
        let frame = server
            .next()
            .await
            .expect("stream open")
            .expect("valid frame");
        assert_eq!(frame.opcode(), Opcode::Binary);
        assert_eq!(frame.payload().len(), 200);

        server
            .send(Frame::pong("ok").expect("small pong"))
            .await
            .expect("send should succeed");
        let reply = client
            .next()
            .await
            .expect("stream open")
            .expect("valid frame");
        assert_eq!(reply.opcode(), Opcode::Pong);
        assert!(reply.mask().is_none());
    }
}
