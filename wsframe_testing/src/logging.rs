//! Serialised access to a global `log` capture.

use std::sync::{Mutex, MutexGuard, OnceLock};

use logtest::Logger;
use rstest::fixture;

/// Exclusive handle to the process-wide [`logtest::Logger`].
///
/// Tests in one binary share a single logger, so each test holds this guard
/// for its whole body and clears stale records first.
pub struct LoggerHandle {
    guard: MutexGuard<'static, Logger>,
}

impl LoggerHandle {
    /// Acquire the logger, installing it on first use.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder panicked while holding the guard.
    #[must_use]
    pub fn new() -> Self {
        static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

        let logger = LOGGER.get_or_init(|| Mutex::new(Logger::start()));
        let guard = logger.lock().expect("logger poisoned");
        Self { guard }
    }

    /// Drop every captured record.
    pub fn clear(&mut self) { while self.guard.pop().is_some() {} }

    /// Whether any remaining record at `level` contains `needle`.
    ///
    /// Records are consumed while searching.
    pub fn contains(&mut self, level: log::Level, needle: &str) -> bool {
        while let Some(record) = self.guard.pop() {
            if record.level() == level && record.args().contains(needle) {
                return true;
            }
        }
        false
    }
}

impl Default for LoggerHandle {
    fn default() -> Self { Self::new() }
}

impl std::ops::Deref for LoggerHandle {
    type Target = Logger;

    fn deref(&self) -> &Self::Target { &self.guard }
}

impl std::ops::DerefMut for LoggerHandle {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.guard }
}

#[fixture]
#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
pub fn logger() -> LoggerHandle { LoggerHandle::new() }
