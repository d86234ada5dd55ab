//! Frame writer behaviour against scripted sinks.

use proptest::prelude::*;
use rstest::rstest;
use wsframe::{
    frame::Frame,
    parser::Role,
    writer::{FrameWriter, WriteError, WriteOutcome},
};
use wsframe_testing::{ChunkedSink, FailingSink, decode_all};

fn drain(writer: &mut FrameWriter, sink: &mut ChunkedSink) -> Vec<Frame> {
    let mut sent = Vec::new();
    while writer.can_write() {
        if let WriteOutcome::Sent(frame) = writer.write(sink).expect("chunked sink never fails") {
            sent.push(frame);
        }
    }
    sent
}

#[test]
fn control_frame_jumps_the_data_queue() {
    let mut writer = FrameWriter::new();
    writer.enqueue(Frame::text("data1"));
    writer.enqueue(Frame::ping(&b"!"[..]).expect("ping"));
    writer.enqueue(Frame::text("data2"));

    let mut sink = ChunkedSink::new(usize::MAX);
    let sent = drain(&mut writer, &mut sink);
    assert_eq!(sent, vec![
        Frame::ping(&b"!"[..]).expect("ping"),
        Frame::text("data1"),
        Frame::text("data2"),
    ]);
    assert_eq!(decode_all(sink.bytes(), Role::Client), sent);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(7)]
fn trickling_sink_matches_unbounded_output(#[case] limit: usize) {
    let frames = [
        Frame::binary(vec![5_u8; 130]),
        Frame::text("tail"),
        Frame::pong(&b"pong"[..]).expect("pong"),
    ];

    let mut unbounded = FrameWriter::new();
    let mut trickled = FrameWriter::new();
    for frame in &frames {
        unbounded.enqueue(frame.clone());
        trickled.enqueue(frame.clone());
    }
    let mut all = ChunkedSink::new(usize::MAX);
    let mut slow = ChunkedSink::new(limit);
    drain(&mut unbounded, &mut all);
    drain(&mut trickled, &mut slow);

    assert_eq!(slow.bytes(), all.bytes());
    assert!(slow.calls() >= all.bytes().len() / limit);
    assert_eq!(trickled.bytes_flushed(), all.bytes().len() as u64);
}

#[test]
fn stalled_sink_keeps_frame_in_flight() {
    let mut writer = FrameWriter::new();
    writer.enqueue(Frame::text("stuck"));
    let mut sink = ChunkedSink::new(0);
    for _ in 0..3 {
        assert_eq!(
            writer.write(&mut sink).expect("no failure"),
            WriteOutcome::Pending { remaining: 7 }
        );
    }
    assert!(writer.in_flight().is_some());
    sink.set_limit(usize::MAX);
    assert!(matches!(writer.write(&mut sink), Ok(WriteOutcome::Sent(_))));
}

#[test]
fn failure_reports_unsent_bytes() {
    let mut writer = FrameWriter::new();
    writer.enqueue(Frame::binary(vec![0_u8; 10]));
    let mut sink = FailingSink::after(4);
    assert_eq!(writer.write(&mut sink).expect("partial"), WriteOutcome::Pending { remaining: 8 });
    let err = writer.write(&mut sink).expect_err("sink gone");
    assert!(matches!(err, WriteError::Sink { unsent: 8, .. }));
}

proptest! {
    #[test]
    fn any_chunk_limit_preserves_the_byte_stream(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 1..6),
        limit in 1_usize..64,
    ) {
        let mut unbounded = FrameWriter::new();
        let mut trickled = FrameWriter::new();
        for payload in payloads {
            unbounded.enqueue(Frame::binary(payload.clone()));
            trickled.enqueue(Frame::binary(payload));
        }
        let mut all = ChunkedSink::new(usize::MAX);
        let mut slow = ChunkedSink::new(limit);
        drain(&mut unbounded, &mut all);
        drain(&mut trickled, &mut slow);
        prop_assert_eq!(slow.bytes(), all.bytes());
    }
}
