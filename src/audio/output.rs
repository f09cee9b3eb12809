//! Consumer-side handle for a reconstructed stream
//!
//! A [`StreamOutput`] is what a hardware callback holds. Each call hands
//! back exactly the number of frames asked for, real audio first and
//! silence after, without blocking, allocating or failing. The only state
//! it touches is the ring's read cursor.

use crate::audio::buffer::{RingMonitor, RingReader, RingStats};

/// Pull-side of one stream's audio
pub struct StreamOutput {
    stream_id: u32,
    reader: RingReader,
}

impl StreamOutput {
    pub(crate) fn new(stream_id: u32, reader: RingReader) -> Self {
        Self { stream_id, reader }
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    /// Fill both channel slices; returns the count of real frames
    #[inline]
    pub fn read(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        self.reader.read(left, right)
    }

    /// Fill an interleaved stereo buffer; returns the count of real frames
    #[inline]
    pub fn read_interleaved(&mut self, out: &mut [f32]) -> usize {
        self.reader.read_interleaved(out)
    }

    /// Frames ready to be pulled
    pub fn available(&self) -> usize {
        self.reader.available()
    }

    pub fn stats(&self) -> RingStats {
        self.reader.monitor().stats()
    }

    pub fn monitor(&self) -> RingMonitor {
        self.reader.monitor()
    }
}

impl std::fmt::Debug for StreamOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamOutput")
            .field("stream_id", &format_args!("0x{:08X}", self.stream_id))
            .field("available", &self.available())
            .finish()
    }
}
