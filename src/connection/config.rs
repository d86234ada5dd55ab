//! Settings for the connection driver.

use std::time::Duration;

use crate::session::ConfigError;

/// Default size of the buffer each `try_read` fills.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024;
/// Default time to wait for the peer's Close after sending ours.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default time allowed for the opening handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Reactor-side settings for one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    read_buffer_size: usize,
    close_timeout: Duration,
    handshake_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl DriverConfig {
    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> DriverConfigBuilder { DriverConfigBuilder { config: Self::default() } }

    #[must_use]
    pub const fn read_buffer_size(&self) -> usize { self.read_buffer_size }

    #[must_use]
    pub const fn close_timeout(&self) -> Duration { self.close_timeout }

    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration { self.handshake_timeout }
}

/// Builder for [`DriverConfig`].
///
/// ```
/// use std::time::Duration;
///
/// use wsframe::connection::DriverConfig;
///
/// let config = DriverConfig::builder()
///     .read_buffer_size(4096)
///     .close_timeout(Duration::from_millis(250))
///     .build()
///     .expect("valid config");
/// assert_eq!(config.read_buffer_size(), 4096);
/// ```
#[derive(Clone, Debug)]
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    #[must_use]
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set how long a closing connection waits for the peer's Close.
    #[must_use]
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.config.close_timeout = timeout;
        self
    }

    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroLimit`] for a zero read buffer.
    pub fn build(self) -> Result<DriverConfig, ConfigError> {
        if self.config.read_buffer_size == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "read_buffer_size",
            });
        }
        Ok(self.config)
    }
}
