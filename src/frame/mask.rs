//! Payload masking.
//!
//! Masking is an involution: applying the same key twice restores the
//! original bytes, so the same routine serves both directions.

/// XOR `buf` with `key`, cycling the key as `key[i % 4]`.
///
/// # Examples
///
/// ```
/// use wsframe::frame::apply_mask;
///
/// let key = [0x37, 0xfa, 0x21, 0x3d];
/// let mut data = *b"Hello";
/// apply_mask(&mut data, key);
/// assert_eq!(data, [0x7f, 0x9f, 0x4d, 0x51, 0x58]);
/// apply_mask(&mut data, key);
/// assert_eq!(&data, b"Hello");
/// ```
pub fn apply_mask(buf: &mut [u8], key: [u8; 4]) {
    let mut chunks = buf.chunks_exact_mut(4);
    for chunk in &mut chunks {
        for (byte, k) in chunk.iter_mut().zip(key) {
            *byte ^= k;
        }
    }
    for (byte, k) in chunks.into_remainder().iter_mut().zip(key) {
        *byte ^= k;
    }
}

/// Draw a fresh masking key for a client-originated frame.
#[must_use]
pub fn random_mask() -> [u8; 4] { rand::random() }

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::apply_mask;

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(4)]
    #[case(7)]
    #[case(130)]
    fn masking_twice_restores_payload(#[case] len: usize) {
        let original: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        let mut data = original.clone();
        let key = [0xde, 0xad, 0xbe, 0xef];

        apply_mask(&mut data, key);
        for (i, (masked, plain)) in data.iter().zip(&original).enumerate() {
            assert_eq!(*masked, plain ^ key[i % 4], "byte {i}");
        }
        apply_mask(&mut data, key);
        assert_eq!(data, original);
    }
}
