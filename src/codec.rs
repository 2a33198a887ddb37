//! Fixed-width escape encoding for sequences of non-negative integers
//!
//! Each element is written as zero or more chunks holding the width's
//! maximum value, followed by one chunk holding the remainder (possibly
//! zero). A chunk below the maximum terminates the element. Chunks are
//! big-endian and either 2 or 4 bytes wide.
//!
//! Decoding accepts any byte string: a trailing partial chunk is dropped,
//! and so is a running total that was never terminated.

/// Chunk width used by the encoder and decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkWidth {
    /// 2-byte chunks, escape value 0xFFFF
    Two,
    /// 4-byte chunks, escape value 0xFFFF_FFFF
    Four,
}

impl ChunkWidth {
    /// Escape value: a chunk holding it continues the current element
    pub fn max_value(self) -> u64 {
        match self {
            ChunkWidth::Two => 0xFFFF,
            ChunkWidth::Four => 0xFFFF_FFFF,
        }
    }

    /// Bytes per chunk
    pub fn size(self) -> usize {
        match self {
            ChunkWidth::Two => 2,
            ChunkWidth::Four => 4,
        }
    }

    fn push_chunk(self, out: &mut Vec<u8>, value: u64) {
        match self {
            ChunkWidth::Two => out.extend_from_slice(&(value as u16).to_be_bytes()),
            ChunkWidth::Four => out.extend_from_slice(&(value as u32).to_be_bytes()),
        }
    }

    fn read_chunk(self, chunk: &[u8]) -> u64 {
        chunk.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    }
}

/// Encode `values` with the given chunk width
pub fn encode(width: ChunkWidth, values: &[u64]) -> Vec<u8> {
    let max = width.max_value();
    let mut out = Vec::with_capacity(values.len() * width.size());

    for &value in values {
        let mut remaining = value;
        while remaining >= max {
            width.push_chunk(&mut out, max);
            remaining -= max;
        }
        width.push_chunk(&mut out, remaining);
    }

    out
}

/// Decode a byte string produced by [`encode`] with the same width
pub fn decode(width: ChunkWidth, input: &[u8]) -> Vec<u64> {
    let max = width.max_value();
    let mut result = Vec::new();
    let mut total: u64 = 0;

    for chunk in input.chunks_exact(width.size()) {
        let value = width.read_chunk(chunk);
        total = total.saturating_add(value);
        if value < max {
            result.push(total);
            total = 0;
        }
    }

    result
}

/// Encode with 2-byte chunks
pub fn encode_vector(values: &[u64]) -> Vec<u8> {
    encode(ChunkWidth::Two, values)
}

/// Decode 2-byte chunks
pub fn decode_vector(input: &[u8]) -> Vec<u64> {
    decode(ChunkWidth::Two, input)
}

/// Encode with 4-byte chunks
pub fn encode_vector4(values: &[u64]) -> Vec<u8> {
    encode(ChunkWidth::Four, values)
}

/// Decode 4-byte chunks
pub fn decode_vector4(input: &[u8]) -> Vec<u64> {
    decode(ChunkWidth::Four, input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_value_encoding() {
        assert_eq!(encode_vector(&[65535]), vec![0xFF, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn test_small_values_encoding() {
        assert_eq!(encode_vector(&[0, 10]), vec![0x00, 0x00, 0x00, 0x0A]);
    }

    #[test]
    fn test_four_byte_encoding() {
        assert_eq!(encode_vector4(&[1]), vec![0, 0, 0, 1]);
        assert_eq!(
            encode_vector4(&[0xFFFF_FFFF + 2]),
            vec![0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 2]
        );
    }

    #[test]
    fn test_empty_sequence() {
        assert!(encode_vector(&[]).is_empty());
        assert!(decode_vector(&[]).is_empty());
        assert!(decode_vector4(&[]).is_empty());
    }

    #[test]
    fn test_roundtrip_two_byte() {
        let seq = vec![0, 1, 65534, 65535, 65536, 200_000, 3, 0];
        assert_eq!(decode_vector(&encode_vector(&seq)), seq);
    }

    #[test]
    fn test_roundtrip_four_byte() {
        let seq = vec![0, 0xFFFF_FFFE, 0xFFFF_FFFF, 0x1_0000_0000, 12_345_678_901, 7];
        assert_eq!(decode_vector4(&encode_vector4(&seq)), seq);
    }

    /// Values at and around every multiple of the escape value up to 4x,
    /// followed by a pseudo-random tail below 4x
    fn boundary_sequence(max: u64, seed: u64) -> Vec<u64> {
        let mut seq = Vec::new();
        for k in 0..=4u64 {
            let base = k * max;
            for delta in [-2i64, -1, 0, 1, 2] {
                if let Some(v) = base.checked_add_signed(delta) {
                    seq.push(v);
                }
            }
        }

        let mut state = seed;
        for _ in 0..200 {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            seq.push((state >> 11) % (4 * max));
        }
        seq
    }

    #[test]
    fn test_roundtrip_generated_sequences() {
        for width in [ChunkWidth::Two, ChunkWidth::Four] {
            for seed in 1..=8u64 {
                let seq = boundary_sequence(width.max_value(), seed);
                let encoded = encode(width, &seq);
                assert_eq!(encoded.len() % width.size(), 0);
                assert_eq!(decode(width, &encoded), seq, "{:?} seed {}", width, seed);

                // Prefixes round-trip on their own
                for len in [0, 1, 7, 25] {
                    let prefix = &seq[..len];
                    assert_eq!(decode(width, &encode(width, prefix)), prefix);
                }
            }
        }
    }

    #[test]
    fn test_multiple_escape_chunks() {
        let encoded = encode_vector(&[65535 * 3 + 4]);
        assert_eq!(encoded.len(), 8);
        assert_eq!(decode_vector(&encoded), vec![65535 * 3 + 4]);
    }

    #[test]
    fn test_trailing_partial_chunk_dropped() {
        // 00 05 then a stray byte
        assert_eq!(decode_vector(&[0x00, 0x05, 0x07]), vec![5]);
        assert_eq!(decode_vector4(&[0, 0, 0, 9, 1, 2]), vec![9]);
    }

    #[test]
    fn test_unterminated_total_dropped() {
        assert_eq!(decode_vector(&[0x00, 0x01, 0xFF, 0xFF]), vec![1]);
    }
}
