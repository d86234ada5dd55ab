//! Per-connection session settings.

use thiserror::Error;

use crate::{
    frame::ReservedBitsPolicy,
    parser::{DEFAULT_MAX_FRAME_SIZE, ParserConfig, Role},
};

/// Default maximum assembled message size (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Errors returned when building a [`SessionConfig`].
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A size limit was zero.
    #[error("invalid {name}: must be >= 1")]
    ZeroLimit {
        /// Name of the offending setting.
        name: &'static str,
    },
}

/// Settings shared by every connection a server accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    role: Role,
    parser: ParserConfig,
    max_message_size: usize,
    validate_utf8: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: Role::Server,
            parser: ParserConfig::for_role(Role::Server),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            validate_utf8: true,
        }
    }
}

impl SessionConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> SessionConfigBuilder { SessionConfigBuilder::default() }

    #[must_use]
    pub const fn role(&self) -> Role { self.role }

    /// Settings handed to the connection's frame parser.
    #[must_use]
    pub const fn parser(&self) -> ParserConfig { self.parser }

    #[must_use]
    pub const fn max_message_size(&self) -> usize { self.max_message_size }

    /// Whether text messages and close reasons are checked for UTF-8.
    #[must_use]
    pub const fn validate_utf8(&self) -> bool { self.validate_utf8 }
}

/// Builder for [`SessionConfig`].
///
/// Defaults: server role, 16 MiB frames and messages, UTF-8 validation on,
/// reserved bits rejected.
///
/// # Examples
///
/// ```
/// use wsframe::{parser::Role, session::SessionConfig};
///
/// let config = SessionConfig::builder()
///     .role(Role::Client)
///     .max_message_size(1 << 20)
///     .build()
///     .expect("valid limits");
/// assert_eq!(config.max_message_size(), 1 << 20);
/// ```
#[derive(Clone, Debug)]
pub struct SessionConfigBuilder {
    role: Role,
    max_frame_size: usize,
    max_message_size: usize,
    validate_utf8: bool,
    reserved_bits: ReservedBitsPolicy,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self {
            role: Role::Server,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            validate_utf8: true,
            reserved_bits: ReservedBitsPolicy::Reject,
        }
    }
}

impl SessionConfigBuilder {
    /// Set which end of the connection the session plays.
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the largest payload a single inbound frame may declare.
    ///
    /// Clamped to the parser's supported range on build.
    #[must_use]
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set the largest message that may be assembled from fragments.
    #[must_use]
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Enable or disable UTF-8 validation of text payloads.
    #[must_use]
    pub fn validate_utf8(mut self, enabled: bool) -> Self {
        self.validate_utf8 = enabled;
        self
    }

    /// Set how reserved header bits are treated.
    #[must_use]
    pub fn reserved_bits(mut self, policy: ReservedBitsPolicy) -> Self {
        self.reserved_bits = policy;
        self
    }

    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroLimit`] if either size limit is zero.
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        if self.max_frame_size == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "max_frame_size",
            });
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::ZeroLimit {
                name: "max_message_size",
            });
        }
        let parser = ParserConfig::for_role(self.role)
            .max_frame_size(self.max_frame_size)
            .reserved_bits(self.reserved_bits);
        Ok(SessionConfig {
            role: self.role,
            parser,
            max_message_size: self.max_message_size,
            validate_utf8: self.validate_utf8,
        })
    }
}
