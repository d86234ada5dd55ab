//! Unit tests for the incremental frame parser.

use proptest::prelude::*;
use rstest::{fixture, rstest};

use super::*;
use crate::frame::{CloseCode, Opcode, RSV1, tests::frame_strategy};

const RFC_KEY: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

#[fixture]
#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
fn server() -> FrameParser { FrameParser::new(ParserConfig::default()) }

fn lenient() -> FrameParser {
    FrameParser::new(ParserConfig::default().mask_policy(MaskPolicy::Optional))
}

fn feed_in_chunks(parser: &mut FrameParser, wire: &[u8], sizes: &[usize]) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut rest = wire;
    let mut sizes = sizes.iter().copied().cycle();
    while !rest.is_empty() {
        let size = sizes.next().unwrap_or(1).clamp(1, rest.len());
        let (chunk, tail) = rest.split_at(size);
        parser.feed(chunk);
        for frame in parser.frames() {
            frames.push(frame.expect("valid wire input"));
        }
        rest = tail;
    }
    frames
}

#[rstest]
fn parses_masked_frame_fed_one_byte_at_a_time(mut server: FrameParser) {
    let wire = Frame::text("Hello").with_mask(RFC_KEY).encode();
    let (last, prefix) = wire.split_last().expect("non-empty wire");
    for byte in prefix {
        server.feed(std::slice::from_ref(byte));
        assert_eq!(server.next_frame(), Ok(None));
    }
    server.feed(&[*last]);
    let frame = server.next_frame().expect("valid").expect("complete");
    assert_eq!(frame.payload().as_ref(), b"Hello");
    assert_eq!(server.state(), &ParserState::AwaitingHeader);
    assert_eq!(server.buffered_len(), 0);
}

#[rstest]
fn walks_through_each_phase(mut server: FrameParser) {
    let wire = Frame::binary(vec![7_u8; 300]).with_mask(RFC_KEY).encode();

    server.feed(&wire[..2]);
    assert_eq!(server.next_frame(), Ok(None));
    assert!(matches!(
        server.state(),
        ParserState::AwaitingExtendedLength {
            width: LengthWidth::Medium,
            ..
        }
    ));

    server.feed(&wire[2..4]);
    assert_eq!(server.next_frame(), Ok(None));
    assert!(matches!(
        server.state(),
        ParserState::AwaitingMask { len: 300, .. }
    ));

    server.feed(&wire[4..8]);
    assert_eq!(server.next_frame(), Ok(None));
    assert!(matches!(
        server.state(),
        ParserState::AwaitingPayload {
            len: 300,
            mask: Some(RFC_KEY),
            ..
        }
    ));

    server.feed(&wire[8..]);
    let frame = server.next_frame().expect("valid").expect("complete");
    assert_eq!(frame.payload().len(), 300);
    assert!(frame.payload().iter().all(|&byte| byte == 7));
}

#[rstest]
fn yields_pipelined_frames_in_order(mut server: FrameParser) {
    let frames = [
        Frame::text("one").with_mask(RFC_KEY),
        Frame::ping("p").expect("small ping").with_mask(RFC_KEY),
        Frame::binary(vec![1_u8; 70_000]).with_mask(RFC_KEY),
    ];
    let mut wire = Vec::new();
    for frame in &frames {
        wire.extend_from_slice(&frame.encode());
    }
    server.feed(&wire);
    let decoded: Vec<_> = server.frames().collect::<Result<_, _>>().expect("valid");
    assert_eq!(decoded, frames);
}

#[test]
fn rejects_oversized_length_before_allocating() {
    let mut parser = FrameParser::new(ParserConfig::default().max_frame_size(1024));
    let mut wire = vec![0x82, 0xff];
    wire.extend_from_slice(&(1_u64 << 40).to_be_bytes());
    parser.feed(&wire);
    assert_eq!(
        parser.next_frame(),
        Err(ProtocolError::FrameTooLarge {
            size: 1 << 40,
            max: 1024,
        })
    );
    assert_eq!(parser.buffered_len(), 0);
    assert!(parser.buffer.capacity() < 1 << 20);
}

#[rstest]
fn large_declared_length_does_not_reserve_payload(mut server: FrameParser) {
    let mut wire = vec![0x82, 0xff];
    wire.extend_from_slice(&(1_u64 << 24).to_be_bytes());
    wire.extend_from_slice(&[1, 2, 3, 4]);
    server.feed(&wire);

    assert_eq!(server.next_frame(), Ok(None));
    assert!(matches!(server.state(), ParserState::AwaitingPayload { len, .. } if *len == 1 << 24));
    assert!(server.buffer.capacity() <= INITIAL_BUFFER_CAPACITY);

    server.feed(&[0_u8; 512]);
    assert_eq!(server.next_frame(), Ok(None));
    assert!(server.buffer.capacity() <= INITIAL_BUFFER_CAPACITY);
}

#[test]
fn rejects_medium_length_over_limit() {
    let config = ParserConfig::default()
        .mask_policy(MaskPolicy::Optional)
        .max_frame_size(200);
    let mut parser = FrameParser::new(config);
    parser.feed(&[0x82, 0x7e, 0x01, 0x00]);
    assert_eq!(
        parser.next_frame(),
        Err(ProtocolError::FrameTooLarge { size: 256, max: 200 })
    );
}

#[rstest]
fn rejects_length_with_most_significant_bit_set(mut server: FrameParser) {
    let mut wire = vec![0x82, 0xff];
    wire.extend_from_slice(&u64::MAX.to_be_bytes());
    server.feed(&wire);
    assert_eq!(server.next_frame(), Err(ProtocolError::InvalidLengthEncoding));
}

#[rstest]
#[case::reserved_opcode(&[0x83, 0x80][..], ProtocolError::InvalidOpcode { opcode: 0x3 })]
#[case::reserved_control_opcode(&[0x8b, 0x80][..], ProtocolError::InvalidOpcode { opcode: 0xb })]
#[case::rsv1(&[0xc1, 0x80][..], ProtocolError::NonZeroReservedBits { bits: RSV1 })]
#[case::unmasked(&[0x81, 0x00][..], ProtocolError::MissingMask)]
#[case::fragmented_ping(&[0x09, 0x80][..], ProtocolError::FragmentedControlFrame { opcode: Opcode::Ping })]
#[case::large_close(&[0x88, 0xfe][..], ProtocolError::ControlFrameTooLarge { len: 126 })]
fn rejects_invalid_headers(
    mut server: FrameParser,
    #[case] wire: &[u8],
    #[case] expected: ProtocolError,
) {
    server.feed(wire);
    assert_eq!(server.next_frame(), Err(expected));
}

#[test]
fn client_rejects_masked_frames() {
    let mut parser = FrameParser::new(ParserConfig::for_role(Role::Client));
    parser.feed(&Frame::text("x").with_mask(RFC_KEY).encode());
    assert_eq!(parser.next_frame(), Err(ProtocolError::UnexpectedMask));
}

#[test]
fn pass_through_preserves_reserved_bits() {
    let config = ParserConfig::default()
        .mask_policy(MaskPolicy::Optional)
        .reserved_bits(ReservedBitsPolicy::PassThrough);
    let mut parser = FrameParser::new(config);
    parser.feed(&[0xc1, 0x01, b'a']);
    let frame = parser.next_frame().expect("accepted").expect("complete");
    assert_eq!(frame.reserved(), RSV1);
    assert_eq!(frame.payload().as_ref(), b"a");
}

#[rstest]
fn failure_is_terminal(mut server: FrameParser) {
    server.feed(&[0x81, 0x00]);
    assert_eq!(server.next_frame(), Err(ProtocolError::MissingMask));
    assert!(server.is_failed());

    server.feed(&Frame::text("late").with_mask(RFC_KEY).encode());
    assert_eq!(server.next_frame(), Err(ProtocolError::MissingMask));
    let mut frames = server.frames();
    assert_eq!(frames.next(), Some(Err(ProtocolError::MissingMask)));
    assert_eq!(frames.next(), None);
}

#[rstest]
fn frames_iterator_stops_at_first_error(mut server: FrameParser) {
    let mut wire = Frame::text("ok").with_mask(RFC_KEY).encode().to_vec();
    wire.extend_from_slice(&[0x83, 0x80]);
    wire.extend_from_slice(&Frame::text("never").with_mask(RFC_KEY).encode());
    server.feed(&wire);
    let results: Vec<_> = server.frames().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert_eq!(results[1], Err(ProtocolError::InvalidOpcode { opcode: 0x3 }));
}

#[rstest]
fn decodes_close_frame_payload(mut server: FrameParser) {
    server.feed(&Frame::close(CloseCode::NORMAL, "done").with_mask(RFC_KEY).encode());
    let frame = server.next_frame().expect("valid").expect("complete");
    assert_eq!(frame.opcode(), Opcode::Close);
    assert_eq!(frame.payload().as_ref(), b"\x03\xe8done");
}

#[test]
fn decodes_empty_unmasked_frame() {
    let mut parser = lenient();
    parser.feed(&[0x8a, 0x00]);
    let frame = parser.next_frame().expect("valid").expect("complete");
    assert_eq!(frame.opcode(), Opcode::Pong);
    assert!(frame.payload().is_empty());
}

proptest! {
    #[test]
    fn arbitrary_chunking_yields_the_same_frame(
        frame in frame_strategy(),
        sizes in proptest::collection::vec(1_usize..32, 1..16),
    ) {
        let mut parser = lenient();
        let frames = feed_in_chunks(&mut parser, &frame.encode(), &sizes);
        prop_assert_eq!(frames, vec![frame]);
        prop_assert_eq!(parser.buffered_len(), 0);
    }

    #[test]
    fn single_byte_feeds_yield_the_same_frame(frame in frame_strategy()) {
        let mut parser = lenient();
        let frames = feed_in_chunks(&mut parser, &frame.encode(), &[1]);
        prop_assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn pipelined_frames_survive_arbitrary_chunking(
        expected in proptest::collection::vec(frame_strategy(), 3),
        sizes in proptest::collection::vec(1_usize..64, 1..16),
    ) {
        let wire: Vec<u8> = expected.iter().flat_map(|frame| frame.encode().to_vec()).collect();
        let mut parser = lenient();
        let frames = feed_in_chunks(&mut parser, &wire, &sizes);
        prop_assert_eq!(frames, expected);
    }
}
