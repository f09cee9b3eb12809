//! Reduced-bandwidth DAX audio: mono `i16`, big-endian
//!
//! Each wire sample becomes one stereo frame with the same value on both
//! channels.

use crate::audio::frame::CanonicalFrame;
use crate::constants::INT16_SCALE;
use crate::error::CodecError;

/// Bytes per mono sample on the wire
pub const REDUCED_SAMPLE_BYTES: usize = 2;

pub struct ReducedBandwidthProcessor {
    frame: CanonicalFrame,
}

impl ReducedBandwidthProcessor {
    pub fn new() -> Self {
        Self {
            frame: CanonicalFrame::with_capacity(128),
        }
    }

    /// Byte-swap, normalize by `i16::MAX`, fan out to both channels
    pub fn process(&mut self, payload: &[u8]) -> Result<&CanonicalFrame, CodecError> {
        if payload.len() % REDUCED_SAMPLE_BYTES != 0 {
            return Err(CodecError::InvalidPayloadLength {
                len: payload.len(),
                unit: REDUCED_SAMPLE_BYTES,
            });
        }

        self.frame.clear();
        for chunk in payload.chunks_exact(REDUCED_SAMPLE_BYTES) {
            let sample = i16::from_be_bytes([chunk[0], chunk[1]]) as f32 / INT16_SCALE;
            self.frame.push(sample, sample);
        }
        Ok(&self.frame)
    }
}

impl Default for ReducedBandwidthProcessor {
    fn default() -> Self {
        Self::new()
    }
}
