//! Opus-compressed remote audio
//!
//! Each stream owns its decoder. An empty payload is the radio's marker for
//! a lost frame and is turned into packet loss concealment.

use crate::audio::frame::CanonicalFrame;
use crate::codec::{DecoderStats, OpusDecoder};
use crate::constants::OPUS_MAX_FRAME_SAMPLES;
use crate::error::CodecError;

pub struct OpusProcessor {
    decoder: OpusDecoder,
    frame: CanonicalFrame,
}

impl OpusProcessor {
    pub fn new() -> Result<Self, CodecError> {
        Ok(Self {
            decoder: OpusDecoder::new()?,
            frame: CanonicalFrame::with_capacity(OPUS_MAX_FRAME_SAMPLES),
        })
    }

    /// Decode (or conceal) one frame and de-interleave it.
    ///
    /// On decode failure nothing is produced and decoder state is kept.
    pub fn process(&mut self, payload: &[u8]) -> Result<&CanonicalFrame, CodecError> {
        let interleaved = if payload.is_empty() {
            self.decoder.conceal()?
        } else {
            self.decoder.decode(payload)?
        };
        self.frame.fill_from_interleaved(interleaved);
        Ok(&self.frame)
    }

    /// Drop codec history on explicit stream restart
    pub fn reset(&mut self) -> Result<(), CodecError> {
        self.frame.clear();
        self.decoder.reset()
    }

    pub fn decoder_stats(&self) -> DecoderStats {
        self.decoder.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{OPUS_FRAME_SAMPLES, SAMPLE_RATE};

    fn encode_frames(count: usize) -> Vec<Vec<u8>> {
        let mut encoder = ::opus::Encoder::new(
            SAMPLE_RATE,
            ::opus::Channels::Stereo,
            ::opus::Application::Audio,
        )
        .unwrap();
        (0..count)
            .map(|n| {
                let samples: Vec<f32> = (0..OPUS_FRAME_SAMPLES)
                    .flat_map(|i| {
                        let t = (n * OPUS_FRAME_SAMPLES + i) as f32 / SAMPLE_RATE as f32;
                        let v = (t * 600.0 * 2.0 * std::f32::consts::PI).sin() * 0.3;
                        [v, -v]
                    })
                    .collect();
                encoder.encode_vec_float(&samples, 4000).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_decode_produces_canonical_frame() {
        let packets = encode_frames(1);
        let mut proc = OpusProcessor::new().unwrap();
        let frame = proc.process(&packets[0]).unwrap();
        assert_eq!(frame.frames(), OPUS_FRAME_SAMPLES);
        assert_eq!(frame.left().len(), frame.right().len());
    }

    #[test]
    fn test_empty_payload_conceals() {
        let packets = encode_frames(3);
        let mut proc = OpusProcessor::new().unwrap();
        proc.process(&packets[0]).unwrap();
        proc.process(&packets[1]).unwrap();

        let concealed = proc.process(&[]).unwrap();
        assert_eq!(concealed.frames(), OPUS_FRAME_SAMPLES);

        proc.process(&packets[2]).unwrap();
        let stats = proc.decoder_stats();
        assert_eq!(stats.frames_decoded, 3);
        assert_eq!(stats.frames_concealed, 1);
    }

    #[test]
    fn test_failure_keeps_decoder_usable() {
        let packets = encode_frames(2);
        let mut proc = OpusProcessor::new().unwrap();
        proc.process(&packets[0]).unwrap();

        assert!(proc.process(&[0x03, 0xFF]).is_err());
        assert_eq!(proc.process(&packets[1]).unwrap().frames(), OPUS_FRAME_SAMPLES);
    }
}
