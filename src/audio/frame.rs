//! Canonical audio frame
//!
//! Every wire encoding is normalized into this one representation before it
//! reaches a ring buffer: 24 kHz, stereo, `f32`, one contiguous array per
//! channel.

use crate::constants::{CHANNELS, SAMPLE_RATE};

/// Non-interleaved stereo block of `f32` samples
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFrame {
    channels: [Vec<f32>; CHANNELS],
}

impl CanonicalFrame {
    /// Create an empty frame that can hold `capacity` frames without
    /// reallocating
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: [Vec::with_capacity(capacity), Vec::with_capacity(capacity)],
        }
    }

    /// Build a frame from two equal-length channel vectors
    pub fn from_channels(left: Vec<f32>, right: Vec<f32>) -> Self {
        assert_eq!(left.len(), right.len(), "channel lengths differ");
        Self {
            channels: [left, right],
        }
    }

    /// Build a frame from interleaved `[L0, R0, L1, R1, ...]` samples
    pub fn from_interleaved(samples: &[f32]) -> Self {
        let mut frame = Self::with_capacity(samples.len() / CHANNELS);
        frame.fill_from_interleaved(samples);
        frame
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn channel_count(&self) -> usize {
        CHANNELS
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    /// Samples of one channel
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn left(&self) -> &[f32] {
        &self.channels[0]
    }

    pub fn right(&self) -> &[f32] {
        &self.channels[1]
    }

    /// Frame duration in microseconds
    pub fn duration_us(&self) -> u64 {
        (self.frames() as u64 * 1_000_000) / SAMPLE_RATE as u64
    }

    /// Drop all samples, keeping the allocation
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
    }

    /// Append one stereo frame
    #[inline]
    pub fn push(&mut self, left: f32, right: f32) {
        self.channels[0].push(left);
        self.channels[1].push(right);
    }

    /// Replace contents with de-interleaved stereo samples
    pub fn fill_from_interleaved(&mut self, samples: &[f32]) {
        self.clear();
        for pair in samples.chunks_exact(CHANNELS) {
            self.push(pair[0], pair[1]);
        }
    }
}

impl Default for CanonicalFrame {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave() {
        let frame = CanonicalFrame::from_interleaved(&[0.1, -0.1, 0.2, -0.2, 0.3, -0.3]);
        assert_eq!(frame.frames(), 3);
        assert_eq!(frame.left(), &[0.1, 0.2, 0.3]);
        assert_eq!(frame.right(), &[-0.1, -0.2, -0.3]);
        assert_eq!(frame.channel_count(), 2);
        assert_eq!(frame.sample_rate(), 24_000);
    }

    #[test]
    fn test_odd_trailing_sample_dropped() {
        let frame = CanonicalFrame::from_interleaved(&[1.0, 2.0, 3.0]);
        assert_eq!(frame.frames(), 1);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut frame = CanonicalFrame::with_capacity(128);
        frame.push(0.5, 0.5);
        frame.clear();
        assert!(frame.is_empty());
        assert!(frame.channels[0].capacity() >= 128);
    }

    #[test]
    fn test_duration() {
        let frame = CanonicalFrame::from_channels(vec![0.0; 240], vec![0.0; 240]);
        assert_eq!(frame.duration_us(), 10_000);
    }
}
