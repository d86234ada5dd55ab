//! Byte sinks with scripted behaviour.

use wsframe::writer::{ByteSink, SinkError};

/// Accepts at most `limit` bytes per call and records everything accepted.
#[derive(Debug, Default)]
pub struct ChunkedSink {
    limit: usize,
    bytes: Vec<u8>,
    calls: usize,
}

impl ChunkedSink {
    /// A sink accepting `limit` bytes per call. Zero simulates a sink
    /// that is never writable.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            bytes: Vec::new(),
            calls: 0,
        }
    }

    /// Everything accepted so far.
    #[must_use]
    pub fn bytes(&self) -> &[u8] { &self.bytes }

    /// Number of `try_send` calls made.
    #[must_use]
    pub fn calls(&self) -> usize { self.calls }

    /// Change the per-call limit, e.g. to let a stalled sink drain.
    pub fn set_limit(&mut self, limit: usize) { self.limit = limit; }

    /// Take the accepted bytes, leaving the sink empty.
    pub fn take(&mut self) -> Vec<u8> { std::mem::take(&mut self.bytes) }
}

impl ByteSink for ChunkedSink {
    fn try_send(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
        self.calls += 1;
        let n = bytes.len().min(self.limit);
        self.bytes.extend_from_slice(&bytes[..n]);
        Ok(n)
    }
}

/// Accepts `budget` bytes in total and then reports the peer gone.
#[derive(Debug)]
pub struct FailingSink {
    budget: usize,
    bytes: Vec<u8>,
}

impl FailingSink {
    #[must_use]
    pub fn after(budget: usize) -> Self {
        Self {
            budget,
            bytes: Vec::new(),
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] { &self.bytes }
}

impl ByteSink for FailingSink {
    fn try_send(&mut self, bytes: &[u8]) -> Result<usize, SinkError> {
        if self.budget == 0 {
            return Err(SinkError::Closed);
        }
        let n = bytes.len().min(self.budget);
        self.budget -= n;
        self.bytes.extend_from_slice(&bytes[..n]);
        Ok(n)
    }
}
