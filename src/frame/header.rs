//! Header layout constants and payload length encoding.

use bytes::BufMut;

/// `FIN` flag in the first header byte.
pub const FIN_BIT: u8 = 0b1000_0000;
/// Mask of the three reserved bits once shifted down by [`RSV_SHIFT`].
pub const RSV_MASK: u8 = 0b0111;
/// Shift applied to the first header byte to reach the reserved bits.
pub const RSV_SHIFT: u8 = 4;
/// `RSV1`, used by `permessage-deflate`.
pub const RSV1: u8 = 0b100;
/// `RSV2`.
pub const RSV2: u8 = 0b010;
/// `RSV3`.
pub const RSV3: u8 = 0b001;
/// Opcode nibble of the first header byte.
pub const OPCODE_MASK: u8 = 0b0000_1111;
/// `MASK` flag in the second header byte.
pub const MASK_BIT: u8 = 0b1000_0000;
/// 7-bit base length of the second header byte.
pub const LEN_MASK: u8 = 0b0111_1111;

/// Largest payload expressible with the 7-bit length.
pub const MAX_SHORT_LEN: usize = 125;
/// Base length marker announcing a 16-bit extended length.
pub const LEN16_MARKER: u8 = 126;
/// Base length marker announcing a 64-bit extended length.
pub const LEN64_MARKER: u8 = 127;
/// Masking key size.
pub const MASK_LEN: usize = 4;
/// Upper bound on header size: 2 fixed bytes, 8 length bytes, 4 key bytes.
pub const MAX_HEADER_LEN: usize = 2 + 8 + MASK_LEN;

/// Payload length in its narrowest wire representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadLen {
    /// Fits the 7-bit base length (0-125).
    Short(u8),
    /// 16-bit extended length (126-65535).
    Medium(u16),
    /// 64-bit extended length.
    Long(u64),
}

impl PayloadLen {
    /// Choose the encoding for `len` payload bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use wsframe::frame::PayloadLen;
    ///
    /// assert_eq!(PayloadLen::for_len(125), PayloadLen::Short(125));
    /// assert_eq!(PayloadLen::for_len(126), PayloadLen::Medium(126));
    /// assert_eq!(PayloadLen::for_len(65_536), PayloadLen::Long(65_536));
    /// ```
    #[must_use]
    pub fn for_len(len: usize) -> Self {
        if let Ok(short) = u8::try_from(len)
            && usize::from(short) <= MAX_SHORT_LEN
        {
            Self::Short(short)
        } else if let Ok(medium) = u16::try_from(len) {
            Self::Medium(medium)
        } else {
            Self::Long(len as u64)
        }
    }

    /// Value placed in the 7-bit base length field.
    #[must_use]
    pub const fn marker(self) -> u8 {
        match self {
            Self::Short(len) => len,
            Self::Medium(_) => LEN16_MARKER,
            Self::Long(_) => LEN64_MARKER,
        }
    }

    /// Number of extended length bytes following the fixed header.
    #[must_use]
    pub const fn extended_len(self) -> usize {
        match self {
            Self::Short(_) => 0,
            Self::Medium(_) => 2,
            Self::Long(_) => 8,
        }
    }

    /// Append the extended length bytes, big-endian, to `dst`.
    pub fn put_extended(self, dst: &mut impl BufMut) {
        match self {
            Self::Short(_) => {}
            Self::Medium(len) => dst.put_u16(len),
            Self::Long(len) => dst.put_u64(len),
        }
    }
}

/// Total header size for a payload of `len` bytes.
#[must_use]
pub fn header_len(len: usize, masked: bool) -> usize {
    2 + PayloadLen::for_len(len).extended_len() + if masked { MASK_LEN } else { 0 }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, false, 2)]
    #[case(125, false, 2)]
    #[case(126, false, 4)]
    #[case(65_535, true, 8)]
    #[case(65_536, false, 10)]
    #[case(65_536, true, MAX_HEADER_LEN)]
    fn header_len_tracks_length_encoding(
        #[case] len: usize,
        #[case] masked: bool,
        #[case] expected: usize,
    ) {
        assert_eq!(header_len(len, masked), expected);
    }

    #[test]
    fn extended_lengths_are_big_endian() {
        let mut buf = Vec::new();
        PayloadLen::for_len(0x1234).put_extended(&mut buf);
        assert_eq!(buf, [0x12, 0x34]);

        buf.clear();
        PayloadLen::for_len(0x0001_0000).put_extended(&mut buf);
        assert_eq!(buf, [0, 0, 0, 0, 0, 1, 0, 0]);
    }
}
