//! Format processors
//!
//! One variant per supported wire encoding, chosen once when a stream's
//! context is created. All variants turn a payload into exactly one
//! [`CanonicalFrame`](crate::audio::CanonicalFrame), or fail without
//! producing anything.

pub mod opus;
pub mod raw_pcm;
pub mod reduced;

pub use self::opus::OpusProcessor;
pub use raw_pcm::RawPcmProcessor;
pub use reduced::ReducedBandwidthProcessor;

use crate::audio::frame::CanonicalFrame;
use crate::error::{CodecError, Error, StreamError};
use crate::network::vita::ClassCode;

/// Per-stream decoder, selected by class code
pub enum FormatProcessor {
    RawPcm(RawPcmProcessor),
    ReducedBandwidth(ReducedBandwidthProcessor),
    Opus(OpusProcessor),
}

impl FormatProcessor {
    /// Build the processor for an audio class
    pub fn for_class(class: ClassCode) -> Result<Self, Error> {
        match class {
            ClassCode::DaxAudio => Ok(FormatProcessor::RawPcm(RawPcmProcessor::new())),
            ClassCode::DaxReducedBw => Ok(FormatProcessor::ReducedBandwidth(
                ReducedBandwidthProcessor::new(),
            )),
            ClassCode::Opus => Ok(FormatProcessor::Opus(OpusProcessor::new()?)),
            other => Err(StreamError::NotAudio(other.raw()).into()),
        }
    }

    /// Convert one payload into the canonical frame format
    #[inline]
    pub fn process(&mut self, payload: &[u8]) -> Result<&CanonicalFrame, CodecError> {
        match self {
            FormatProcessor::RawPcm(p) => p.process(payload),
            FormatProcessor::ReducedBandwidth(p) => p.process(payload),
            FormatProcessor::Opus(p) => p.process(payload),
        }
    }

    /// Reset decoder state for a stream restart
    pub fn reset(&mut self) -> Result<(), CodecError> {
        match self {
            FormatProcessor::Opus(p) => p.reset(),
            FormatProcessor::RawPcm(_) | FormatProcessor::ReducedBandwidth(_) => Ok(()),
        }
    }

    pub fn class_code(&self) -> ClassCode {
        match self {
            FormatProcessor::RawPcm(_) => ClassCode::DaxAudio,
            FormatProcessor::ReducedBandwidth(_) => ClassCode::DaxReducedBw,
            FormatProcessor::Opus(_) => ClassCode::Opus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_selection() {
        for class in [ClassCode::DaxAudio, ClassCode::DaxReducedBw, ClassCode::Opus] {
            let proc = FormatProcessor::for_class(class).unwrap();
            assert_eq!(proc.class_code(), class);
        }
    }

    #[test]
    fn test_non_audio_class_rejected() {
        let err = FormatProcessor::for_class(ClassCode::Meter).err().unwrap();
        assert!(matches!(err, Error::Stream(StreamError::NotAudio(0x8002))));
    }

    #[test]
    fn test_same_shape_across_encodings() {
        let mut raw = FormatProcessor::for_class(ClassCode::DaxAudio).unwrap();
        let mut reduced = FormatProcessor::for_class(ClassCode::DaxReducedBw).unwrap();

        let raw_frame = raw.process(&[0u8; 64]).unwrap();
        assert_eq!((raw_frame.channel_count(), raw_frame.sample_rate()), (2, 24_000));

        let reduced_frame = reduced.process(&[0u8; 16]).unwrap();
        assert_eq!((reduced_frame.channel_count(), reduced_frame.sample_rate()), (2, 24_000));
        assert_eq!(reduced_frame.frames(), 8);
    }
}
