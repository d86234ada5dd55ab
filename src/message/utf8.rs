//! Incremental UTF-8 validation across fragment boundaries.

use std::str;

use crate::error::ProtocolError;

const MAX_CHAR_LEN: usize = 4;

/// Validates a text message chunk by chunk.
///
/// A code point split across two chunks is carried over, so chunking never
/// changes the verdict. Invalid sequences are reported as soon as they are
/// seen rather than at the end of the message.
#[derive(Debug, Default)]
pub(crate) struct Utf8Validator {
    pending: [u8; MAX_CHAR_LEN],
    pending_len: usize,
}

impl Utf8Validator {
    pub(crate) fn new() -> Self { Self::default() }

    /// Check `chunk`. `is_final` marks the last chunk of the message, after
    /// which no partial code point may remain.
    pub(crate) fn feed(&mut self, chunk: &[u8], is_final: bool) -> Result<(), ProtocolError> {
        let rest = self.complete_pending(chunk)?;
        if self.pending_len > 0 {
            return if is_final {
                Err(ProtocolError::InvalidUtf8)
            } else {
                Ok(())
            };
        }
        match str::from_utf8(rest) {
            Ok(_) => Ok(()),
            Err(err) if err.error_len().is_some() => Err(ProtocolError::InvalidUtf8),
            Err(err) => {
                let tail = &rest[err.valid_up_to()..];
                if is_final {
                    return Err(ProtocolError::InvalidUtf8);
                }
                self.pending[..tail.len()].copy_from_slice(tail);
                self.pending_len = tail.len();
                Ok(())
            }
        }
    }

    /// Extend a carried-over partial code point from the front of `chunk`,
    /// returning the bytes after it.
    fn complete_pending<'a>(&mut self, chunk: &'a [u8]) -> Result<&'a [u8], ProtocolError> {
        if self.pending_len == 0 {
            return Ok(chunk);
        }
        let width = char_width(self.pending[0]);
        let take = (width - self.pending_len).min(chunk.len());
        self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&chunk[..take]);
        self.pending_len += take;

        match str::from_utf8(&self.pending[..self.pending_len]) {
            Ok(_) => self.pending_len = 0,
            Err(err) if err.error_len().is_some() => return Err(ProtocolError::InvalidUtf8),
            Err(_) if self.pending_len == width => return Err(ProtocolError::InvalidUtf8),
            Err(_) => {}
        }
        Ok(&chunk[take..])
    }
}

fn char_width(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => MAX_CHAR_LEN,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn validate_split(bytes: &[u8], at: &[usize]) -> Result<(), ProtocolError> {
        let mut validator = Utf8Validator::new();
        let mut start = 0;
        for &end in at {
            validator.feed(&bytes[start..end], false)?;
            start = end;
        }
        validator.feed(&bytes[start..], true)
    }

    #[rstest]
    #[case::two_byte("é".as_bytes(), &[1][..])]
    #[case::three_byte("€".as_bytes(), &[1, 2][..])]
    #[case::four_byte("𝄞".as_bytes(), &[1, 2, 3][..])]
    #[case::four_byte_in_two("𝄞x".as_bytes(), &[2][..])]
    fn accepts_code_points_split_across_chunks(#[case] bytes: &[u8], #[case] at: &[usize]) {
        assert_eq!(validate_split(bytes, at), Ok(()));
    }

    #[rstest]
    #[case::truncated_at_end(&[0xe2, 0x82][..], &[][..])]
    #[case::truncated_after_split(&[0xf0, 0x9d, 0x84][..], &[1][..])]
    #[case::bad_continuation(&[0xe2, 0x28, 0xa1][..], &[1][..])]
    #[case::overlong(&[0xc0, 0xaf][..], &[1][..])]
    #[case::surrogate(&[0xed, 0xa0, 0x80][..], &[][..])]
    #[case::stray_continuation(&[b'a', 0x80][..], &[][..])]
    fn rejects_invalid_sequences(#[case] bytes: &[u8], #[case] at: &[usize]) {
        assert_eq!(validate_split(bytes, at), Err(ProtocolError::InvalidUtf8));
    }

    #[test]
    fn reports_invalid_bytes_before_the_final_chunk() {
        let mut validator = Utf8Validator::new();
        assert_eq!(validator.feed(&[0xff], false), Err(ProtocolError::InvalidUtf8));
    }

    proptest! {
        #[test]
        fn verdict_does_not_depend_on_chunking(text in "\\PC{0,40}", cut in any::<prop::sample::Index>()) {
            let bytes = text.as_bytes();
            let at = if bytes.is_empty() { 0 } else { cut.index(bytes.len()) };
            prop_assert_eq!(validate_split(bytes, &[at]), Ok(()));
        }
    }
}
