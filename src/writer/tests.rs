//! Unit tests for the frame writer.

use std::io;

use proptest::prelude::*;
use rstest::{fixture, rstest};

use super::*;
use crate::frame::{CloseCode, Opcode};

/// Accepts at most `limit` bytes per call.
struct Trickle {
    limit: usize,
    bytes: Vec<u8>,
}

impl ByteSink for Trickle {
    fn try_send(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
        let n = bytes.len().min(self.limit);
        self.bytes.extend_from_slice(&bytes[..n]);
        Ok(n)
    }
}

struct Broken;

impl ByteSink for Broken {
    fn try_send(&mut self, _: &[u8]) -> Result<usize, SinkError> {
        Err(SinkError::Io(io::Error::from(io::ErrorKind::BrokenPipe)))
    }
}

#[fixture]
#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
fn writer() -> FrameWriter { FrameWriter::new() }

fn drain<S: ByteSink>(writer: &mut FrameWriter, sink: &mut S) -> Vec<Frame> {
    let mut sent = Vec::new();
    while writer.can_write() {
        if let WriteOutcome::Sent(frame) = writer.write(sink).expect("sink never fails") {
            sent.push(frame);
        }
    }
    sent
}

#[rstest]
fn idle_writer_reports_idle(mut writer: FrameWriter) {
    assert!(!writer.can_write());
    assert_eq!(writer.write(&mut Broken).expect("no bytes pending"), WriteOutcome::Idle);
}

#[rstest]
fn resumes_mid_frame_after_backpressure(mut writer: FrameWriter) {
    let frame = Frame::text("Hello");
    writer.enqueue(frame.clone());
    let mut sink = Trickle {
        limit: 3,
        bytes: Vec::new(),
    };

    assert_eq!(
        writer.write(&mut sink).expect("trickle"),
        WriteOutcome::Pending { remaining: 4 }
    );
    assert!(writer.can_write());
    assert_eq!(writer.in_flight(), Some(&frame));
    assert_eq!(
        writer.write(&mut sink).expect("trickle"),
        WriteOutcome::Pending { remaining: 1 }
    );
    assert_eq!(writer.write(&mut sink).expect("trickle"), WriteOutcome::Sent(frame));
    assert_eq!(sink.bytes, b"\x81\x05Hello");
    assert_eq!(writer.bytes_flushed(), 7);
    assert!(!writer.can_write());
}

#[rstest]
fn zero_byte_acceptance_is_backpressure(mut writer: FrameWriter) {
    writer.enqueue(Frame::binary(vec![1_u8; 10]));
    let mut sink = Trickle {
        limit: 0,
        bytes: Vec::new(),
    };
    assert_eq!(
        writer.write(&mut sink).expect("backpressure is not an error"),
        WriteOutcome::Pending { remaining: 12 }
    );
    assert_eq!(writer.remaining(), 12);
}

#[rstest]
fn control_frame_waits_for_in_flight_data(mut writer: FrameWriter) {
    writer.enqueue(Frame::text("abcdef"));
    let mut sink = Trickle {
        limit: 2,
        bytes: Vec::new(),
    };
    assert!(matches!(
        writer.write(&mut sink),
        Ok(WriteOutcome::Pending { .. })
    ));

    writer.enqueue(Frame::pong("").expect("empty pong"));
    writer.enqueue(Frame::text("next"));
    let sent = drain(&mut writer, &mut sink);
    let opcodes: Vec<_> = sent.iter().map(Frame::opcode).collect();
    assert_eq!(opcodes, [Opcode::Text, Opcode::Pong, Opcode::Text]);
    assert_eq!(sent[0].payload().as_ref(), b"abcdef");
}

#[rstest]
fn sink_failure_with_pending_bytes_is_fatal(mut writer: FrameWriter) {
    writer.enqueue(Frame::close(CloseCode::NORMAL, ""));
    let err = writer.write(&mut Broken).expect_err("broken sink");
    let WriteError::Sink { unsent, source } = err;
    assert_eq!(unsent, 4);
    assert!(matches!(source, SinkError::Io(_)));
    assert!(writer.can_write(), "frame stays in flight");
}

#[rstest]
fn discard_drops_in_flight_and_queued_frames(mut writer: FrameWriter) {
    writer.enqueue(Frame::text("a"));
    writer.enqueue(Frame::text("b"));
    let mut sink = Trickle {
        limit: 1,
        bytes: Vec::new(),
    };
    assert!(matches!(
        writer.write(&mut sink),
        Ok(WriteOutcome::Pending { .. })
    ));
    writer.discard();
    assert!(!writer.can_write());
    assert_eq!(writer.in_flight(), None);
    assert_eq!(writer.write(&mut sink).expect("idle"), WriteOutcome::Idle);
}

proptest! {
    #[test]
    fn trickled_output_matches_unbounded_output(
        payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..400), 1..6),
        limit in 1_usize..8,
    ) {
        let frames: Vec<_> = payloads.into_iter().map(Frame::binary).collect();

        let mut whole: Vec<u8> = Vec::new();
        let mut fast = FrameWriter::new();
        frames.iter().cloned().for_each(|frame| { fast.enqueue(frame); });
        let sent_fast = drain(&mut fast, &mut whole);

        let mut trickle = Trickle { limit, bytes: Vec::new() };
        let mut slow = FrameWriter::new();
        frames.iter().cloned().for_each(|frame| { slow.enqueue(frame); });
        let sent_slow = drain(&mut slow, &mut trickle);

        prop_assert_eq!(&trickle.bytes, &whole);
        prop_assert_eq!(&sent_slow, &frames);
        prop_assert_eq!(sent_fast, frames);
        prop_assert_eq!(slow.bytes_flushed(), whole.len() as u64);
    }
}
