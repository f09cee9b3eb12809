//! Opus decoder wrapper
//!
//! Decodes remote audio at the canonical rate and channel count, with
//! packet loss concealment for frames the radio marks as missing.

use opus::{Channels, Decoder};

use crate::constants::{CHANNELS, OPUS_FRAME_SAMPLES, OPUS_MAX_FRAME_SAMPLES, SAMPLE_RATE};
use crate::error::CodecError;

/// Opus decoder wrapper
pub struct OpusDecoder {
    decoder: Decoder,
    /// Interleaved decode buffer (reused to avoid allocations)
    decode_buffer: Vec<f32>,
    /// Samples per channel of the last decoded frame; sizes PLC output
    last_frame_size: usize,
    /// Frames decoded from real packets
    frames_decoded: u64,
    /// Frames synthesized by PLC
    frames_concealed: u64,
    /// Total samples produced (all channels)
    samples_produced: u64,
}

impl OpusDecoder {
    /// Create a decoder for 24 kHz stereo
    pub fn new() -> Result<Self, CodecError> {
        let decoder = Decoder::new(SAMPLE_RATE, Channels::Stereo)
            .map_err(|e| CodecError::DecoderInit(e.to_string()))?;

        Ok(Self {
            decoder,
            decode_buffer: vec![0.0f32; OPUS_MAX_FRAME_SAMPLES * CHANNELS],
            last_frame_size: OPUS_FRAME_SAMPLES,
            frames_decoded: 0,
            frames_concealed: 0,
            samples_produced: 0,
        })
    }

    /// Decode one Opus packet.
    ///
    /// Returns interleaved stereo samples borrowed from the internal buffer.
    pub fn decode(&mut self, data: &[u8]) -> Result<&[f32], CodecError> {
        let samples = self
            .decoder
            .decode_float(data, &mut self.decode_buffer, false)
            .map_err(|e| CodecError::DecodingFailed(e.to_string()))?;

        self.last_frame_size = samples;
        self.frames_decoded += 1;
        self.samples_produced += (samples * CHANNELS) as u64;

        Ok(&self.decode_buffer[..samples * CHANNELS])
    }

    /// Generate packet loss concealment for one missing frame.
    ///
    /// The concealed frame has the duration of the last decoded one.
    pub fn conceal(&mut self) -> Result<&[f32], CodecError> {
        let len = self.last_frame_size * CHANNELS;
        let samples = self
            .decoder
            .decode_float(&[], &mut self.decode_buffer[..len], false)
            .map_err(|e| CodecError::DecodingFailed(e.to_string()))?;

        self.frames_concealed += 1;
        self.samples_produced += (samples * CHANNELS) as u64;

        Ok(&self.decode_buffer[..samples * CHANNELS])
    }

    /// Reset decoder state; used only on explicit stream restart
    pub fn reset(&mut self) -> Result<(), CodecError> {
        self.last_frame_size = OPUS_FRAME_SAMPLES;
        self.decoder
            .reset_state()
            .map_err(|e| CodecError::DecoderInit(e.to_string()))
    }

    /// Samples per channel that PLC will produce next
    pub fn frame_size(&self) -> usize {
        self.last_frame_size
    }

    /// Get statistics
    pub fn stats(&self) -> DecoderStats {
        let total = self.frames_decoded + self.frames_concealed;
        DecoderStats {
            frames_decoded: self.frames_decoded,
            frames_concealed: self.frames_concealed,
            samples_produced: self.samples_produced,
            loss_rate: if total > 0 {
                self.frames_concealed as f32 / total as f32
            } else {
                0.0
            },
        }
    }
}

/// Decoder statistics
#[derive(Debug, Clone)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub frames_concealed: u64,
    pub samples_produced: u64,
    pub loss_rate: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_tone(frame_size: usize) -> Vec<u8> {
        let mut encoder =
            opus::Encoder::new(SAMPLE_RATE, Channels::Stereo, opus::Application::Audio).unwrap();
        let mut samples = Vec::with_capacity(frame_size * CHANNELS);
        for i in 0..frame_size {
            let t = i as f32 / SAMPLE_RATE as f32;
            let val = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
            samples.push(val);
            samples.push(val);
        }
        encoder.encode_vec_float(&samples, 4000).unwrap()
    }

    #[test]
    fn test_decoder_creation() {
        let decoder = OpusDecoder::new();
        assert!(decoder.is_ok());
        assert_eq!(decoder.unwrap().frame_size(), OPUS_FRAME_SAMPLES);
    }

    #[test]
    fn test_decode_tone() {
        let mut decoder = OpusDecoder::new().unwrap();
        let packet = encode_tone(480);

        let decoded = decoder.decode(&packet).unwrap();
        assert_eq!(decoded.len(), 480 * CHANNELS);
        assert_eq!(decoder.frame_size(), 480);
    }

    #[test]
    fn test_plc_follows_last_frame_size() {
        let mut decoder = OpusDecoder::new().unwrap();

        let concealed = decoder.conceal().unwrap().len();
        assert_eq!(concealed, OPUS_FRAME_SAMPLES * CHANNELS);

        decoder.decode(&encode_tone(480)).unwrap();
        let concealed = decoder.conceal().unwrap().len();
        assert_eq!(concealed, 480 * CHANNELS);

        let stats = decoder.stats();
        assert_eq!(stats.frames_decoded, 1);
        assert_eq!(stats.frames_concealed, 2);
    }

    #[test]
    fn test_corrupt_packet_is_error() {
        let mut decoder = OpusDecoder::new().unwrap();
        // TOC for a code 3 packet with an impossible frame count
        let result = decoder.decode(&[0x03, 0xFF]);
        assert!(matches!(result, Err(CodecError::DecodingFailed(_))));
    }

    #[test]
    fn test_reset_restores_nominal_frame_size() {
        let mut decoder = OpusDecoder::new().unwrap();
        decoder.decode(&encode_tone(480)).unwrap();
        decoder.reset().unwrap();
        assert_eq!(decoder.frame_size(), OPUS_FRAME_SAMPLES);
    }
}
