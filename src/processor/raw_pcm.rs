//! Full-bandwidth DAX audio: interleaved stereo `f32`, big-endian

use crate::audio::frame::CanonicalFrame;
use crate::constants::CHANNELS;
use crate::error::CodecError;

/// Bytes per stereo frame on the wire
pub const RAW_FRAME_BYTES: usize = 4 * CHANNELS;

/// Typical DAX packet: 128 stereo frames
pub const RAW_FRAMES_PER_PACKET: usize = 128;

pub struct RawPcmProcessor {
    frame: CanonicalFrame,
}

impl RawPcmProcessor {
    pub fn new() -> Self {
        Self {
            frame: CanonicalFrame::with_capacity(RAW_FRAMES_PER_PACKET),
        }
    }

    /// Byte-swap and de-interleave one payload
    pub fn process(&mut self, payload: &[u8]) -> Result<&CanonicalFrame, CodecError> {
        if payload.len() % RAW_FRAME_BYTES != 0 {
            return Err(CodecError::InvalidPayloadLength {
                len: payload.len(),
                unit: RAW_FRAME_BYTES,
            });
        }

        self.frame.clear();
        for chunk in payload.chunks_exact(RAW_FRAME_BYTES) {
            let left = f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let right = f32::from_be_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            self.frame.push(left, right);
        }
        Ok(&self.frame)
    }
}

impl Default for RawPcmProcessor {
    fn default() -> Self {
        Self::new()
    }
}
