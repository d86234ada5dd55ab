//! Outbound frame queue with control-frame priority.
//!
//! Close, Ping and Pong frames go to a control lane that always drains
//! before the data lane, so a long backlog of data frames cannot delay the
//! control channel. Order is FIFO within each lane.

use std::collections::VecDeque;

use crate::frame::Frame;

/// Lane a frame was queued on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramePriority {
    /// Close, Ping and Pong.
    Control,
    /// Text, Binary and Continuation.
    Data,
}

impl FramePriority {
    /// Lane for `frame`, decided by its opcode.
    #[must_use]
    pub fn of(frame: &Frame) -> Self {
        if frame.is_control() {
            Self::Control
        } else {
            Self::Data
        }
    }
}

/// Pending outbound frames for one connection.
///
/// # Examples
///
/// ```
/// use wsframe::{frame::{Frame, Opcode}, queue::FrameQueue};
///
/// let mut queue = FrameQueue::new();
/// queue.enqueue(Frame::text("data 1"));
/// queue.enqueue(Frame::ping("").expect("empty ping"));
/// queue.enqueue(Frame::text("data 2"));
///
/// let order: Vec<_> = std::iter::from_fn(|| queue.extract())
///     .map(|frame| frame.opcode())
///     .collect();
/// assert_eq!(order, [Opcode::Ping, Opcode::Text, Opcode::Text]);
/// ```
#[derive(Debug, Default)]
pub struct FrameQueue {
    control: VecDeque<Frame>,
    data: VecDeque<Frame>,
}

impl FrameQueue {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Queue `frame` on the lane its opcode selects.
    pub fn enqueue(&mut self, frame: Frame) -> FramePriority {
        let priority = FramePriority::of(&frame);
        match priority {
            FramePriority::Control => self.control.push_back(frame),
            FramePriority::Data => self.data.push_back(frame),
        }
        priority
    }

    /// Remove the next frame to send, or `None` when both lanes are empty.
    pub fn extract(&mut self) -> Option<Frame> {
        self.control
            .pop_front()
            .or_else(|| self.data.pop_front())
    }

    /// Total number of pending frames.
    #[must_use]
    pub fn count(&self) -> usize { self.control.len() + self.data.len() }

    /// Pending frames on one lane.
    #[must_use]
    pub fn count_of(&self, priority: FramePriority) -> usize {
        match priority {
            FramePriority::Control => self.control.len(),
            FramePriority::Data => self.data.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.count() == 0 }

    /// Drop every pending frame.
    pub fn clear(&mut self) {
        self.control.clear();
        self.data.clear();
    }

    /// Drop pending data frames, keeping control frames.
    pub fn clear_data(&mut self) -> usize {
        let dropped = self.data.len();
        self.data.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::frame::{CloseCode, Opcode};

    #[fixture]
    #[allow(
        unused_braces,
        reason = "rustc false positive for single line rstest fixtures"
    )]
    fn queue() -> FrameQueue { FrameQueue::new() }

    fn drain(queue: &mut FrameQueue) -> Vec<Frame> { std::iter::from_fn(|| queue.extract()).collect() }

    #[rstest]
    fn control_frames_jump_the_data_lane(mut queue: FrameQueue) {
        let data1 = Frame::text("data1");
        let ping = Frame::ping("p").expect("small ping");
        let data2 = Frame::binary(&b"data2"[..]);
        assert_eq!(queue.enqueue(data1.clone()), FramePriority::Data);
        assert_eq!(queue.enqueue(ping.clone()), FramePriority::Control);
        assert_eq!(queue.enqueue(data2.clone()), FramePriority::Data);
        assert_eq!(queue.count(), 3);

        assert_eq!(drain(&mut queue), vec![ping, data1, data2]);
        assert!(queue.is_empty());
    }

    #[rstest]
    fn lanes_are_fifo(mut queue: FrameQueue) {
        let pong = Frame::pong("a").expect("small pong");
        let close = Frame::close(CloseCode::NORMAL, "");
        let first = Frame::continuation(false, "1");
        let second = Frame::continuation(true, "2");
        for frame in [first.clone(), pong.clone(), second.clone(), close.clone()] {
            queue.enqueue(frame);
        }
        assert_eq!(queue.count_of(FramePriority::Control), 2);
        assert_eq!(drain(&mut queue), vec![pong, close, first, second]);
    }

    #[rstest]
    fn extract_from_empty_queue_is_none(mut queue: FrameQueue) {
        assert_eq!(queue.extract(), None);
        assert_eq!(queue.count(), 0);
    }

    #[rstest]
    fn clear_data_keeps_control_frames(mut queue: FrameQueue) {
        queue.enqueue(Frame::text("a"));
        queue.enqueue(Frame::text("b"));
        queue.enqueue(Frame::close_empty());
        assert_eq!(queue.clear_data(), 2);
        let remaining = drain(&mut queue);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].opcode(), Opcode::Close);
    }
}
