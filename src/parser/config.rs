//! Parser limits and direction rules.

use static_assertions::const_assert;

use crate::{error::ProtocolError, frame::ReservedBitsPolicy};

/// Default maximum frame payload size (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Smallest accepted frame size limit.
///
/// Limits are clamped to at least this value so every control frame fits.
pub const MIN_FRAME_SIZE: usize = crate::frame::MAX_CONTROL_PAYLOAD;

/// Largest accepted frame size limit (256 MiB).
///
/// Limits are clamped to at most this value to bound the allocation a single
/// header can request.
pub const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

const_assert!(MIN_FRAME_SIZE <= DEFAULT_MAX_FRAME_SIZE);
const_assert!(DEFAULT_MAX_FRAME_SIZE <= MAX_FRAME_SIZE);

pub(crate) fn clamp_frame_size(value: usize) -> usize { value.clamp(MIN_FRAME_SIZE, MAX_FRAME_SIZE) }

/// Which end of the connection this endpoint is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Role {
    /// Accepts masked frames and sends unmasked ones.
    #[default]
    Server,
    /// Accepts unmasked frames and sends masked ones.
    Client,
}

impl Role {
    /// Mask rule applied to frames arriving at this endpoint.
    #[must_use]
    pub const fn inbound_mask_policy(self) -> MaskPolicy {
        match self {
            Self::Server => MaskPolicy::Required,
            Self::Client => MaskPolicy::Forbidden,
        }
    }

    /// Whether frames sent by this endpoint must carry a masking key.
    #[must_use]
    pub const fn masks_outbound(self) -> bool { matches!(self, Self::Client) }
}

/// Rule for the mask bit of inbound frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskPolicy {
    /// Every frame must be masked (client to server).
    Required,
    /// No frame may be masked (server to client).
    Forbidden,
    /// Either is accepted. Useful for offline decoding only.
    Optional,
}

impl MaskPolicy {
    pub(crate) fn check(self, masked: bool) -> Result<(), ProtocolError> {
        match (self, masked) {
            (Self::Required, false) => Err(ProtocolError::MissingMask),
            (Self::Forbidden, true) => Err(ProtocolError::UnexpectedMask),
            _ => Ok(()),
        }
    }
}

/// Settings for a [`FrameParser`](super::FrameParser).
///
/// # Examples
///
/// ```
/// use wsframe::parser::{MaskPolicy, ParserConfig, Role};
///
/// let config = ParserConfig::for_role(Role::Client).max_frame_size(4096);
/// assert_eq!(config.inbound_mask_policy(), MaskPolicy::Forbidden);
/// assert_eq!(config.frame_size_limit(), 4096);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    max_frame_size: usize,
    mask_policy: MaskPolicy,
    reserved_bits: ReservedBitsPolicy,
}

impl Default for ParserConfig {
    fn default() -> Self { Self::for_role(Role::Server) }
}

impl ParserConfig {
    /// Defaults for an endpoint acting as `role`.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            mask_policy: role.inbound_mask_policy(),
            reserved_bits: ReservedBitsPolicy::Reject,
        }
    }

    /// Set the largest payload a single frame may declare.
    ///
    /// The value is clamped to `MIN_FRAME_SIZE..=MAX_FRAME_SIZE`.
    #[must_use]
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = clamp_frame_size(size);
        self
    }

    /// Set the mask rule for inbound frames.
    #[must_use]
    pub const fn mask_policy(mut self, policy: MaskPolicy) -> Self {
        self.mask_policy = policy;
        self
    }

    /// Set how non-zero reserved bits are treated.
    #[must_use]
    pub const fn reserved_bits(mut self, policy: ReservedBitsPolicy) -> Self {
        self.reserved_bits = policy;
        self
    }

    #[must_use]
    pub const fn frame_size_limit(&self) -> usize { self.max_frame_size }

    #[must_use]
    pub const fn inbound_mask_policy(&self) -> MaskPolicy { self.mask_policy }

    #[must_use]
    pub const fn reserved_bits_policy(&self) -> ReservedBitsPolicy { self.reserved_bits }
}
