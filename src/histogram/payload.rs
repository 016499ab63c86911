//! Binary channel payload
//!
//! A worker publishes exactly one payload: 26 counts as little-endian `u64`,
//! `a` first, with no header or framing. The reader knows the size up front,
//! so anything shorter is a transfer failure.

use super::{Histogram, ALPHA_LETTERS};

const COUNT_WIDTH: usize = std::mem::size_of::<u64>();

/// Size in bytes of one encoded histogram.
pub const PAYLOAD_LEN: usize = ALPHA_LETTERS * COUNT_WIDTH;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload has {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },
}

impl Histogram {
    pub fn to_payload(&self) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        for (chunk, count) in payload.chunks_exact_mut(COUNT_WIDTH).zip(self.counts()) {
            chunk.copy_from_slice(&count.to_le_bytes());
        }
        payload
    }

    pub fn from_payload(payload: &[u8; PAYLOAD_LEN]) -> Self {
        let mut counts = [0u64; ALPHA_LETTERS];
        for (count, chunk) in counts.iter_mut().zip(payload.chunks_exact(COUNT_WIDTH)) {
            let mut bytes = [0u8; COUNT_WIDTH];
            bytes.copy_from_slice(chunk);
            *count = u64::from_le_bytes(bytes);
        }
        Self::from_counts(counts)
    }

    /// Decode a payload of unchecked length.
    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        let payload: &[u8; PAYLOAD_LEN] = bytes.try_into().map_err(|_| PayloadError::Length {
            expected: PAYLOAD_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self::from_payload(payload))
    }
}
