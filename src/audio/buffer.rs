//! Lock-free ring buffer for canonical audio
//!
//! Single-producer single-consumer (SPSC) circular buffer of non-interleaved
//! stereo `f32` frames. The producer is a stream's format processor running
//! in the network domain; the consumer is a hardware-paced real-time
//! callback.
//!
//! The two ends are separate handles, [`RingWriter`] and [`RingReader`].
//! Neither is `Clone` and both take `&mut self`, so at most one writer and
//! one reader can exist per ring. A [`RingMonitor`] may be cloned freely for
//! statistics and for requesting a clear.
//!
//! Cursors are monotonically increasing frame counts. The writer publishes
//! its cursor with `Release` only after the samples are in place, and the
//! reader observes it with `Acquire`; the reverse holds for the read cursor.
//! The top bit of the read cursor is set while the reader is copying, which
//! lets the writer apply a pending clear itself when the reader is idle.
//!
//! Overflow policy is drop-newest: a frame that does not fit in the free
//! space is discarded whole and already buffered audio is left untouched.

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::audio::frame::CanonicalFrame;
use crate::constants::CHANNELS;
use crate::error::AudioError;

/// Lifecycle of a stream's ring as seen from the outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingState {
    /// Nothing buffered
    Empty,
    /// Audio buffered, consumer has not pulled yet
    Filling,
    /// Reads and writes interleaving
    Steady,
    /// Writer closed, remaining audio is being consumed
    Draining,
}

struct Shared {
    /// Channel-major backing store: `CHANNELS * capacity` samples
    data: Box<[UnsafeCell<f32>]>,
    capacity: usize,

    write: CachePadded<AtomicUsize>,
    read: CachePadded<AtomicUsize>,

    clear_requested: AtomicBool,
    clear_mark: AtomicUsize,
    closed: AtomicBool,
    reading_started: AtomicBool,

    frames_written: AtomicU64,
    frames_read: AtomicU64,
    overruns: AtomicU64,
    underruns: AtomicU64,
}

// Samples in `data` are only touched in disjoint regions: the writer owns
// [write, read + capacity) and the reader owns [read, write). Ownership of a
// region moves through the Release/Acquire cursor pair. The writer only moves
// the read cursor by CAS while READER_BUSY is clear.
unsafe impl Sync for Shared {}

/// Set in the read cursor while the reader holds a claimed region
const READER_BUSY: usize = 1 << (usize::BITS - 1);
const CURSOR_MASK: usize = !READER_BUSY;

#[inline]
fn distance(from: usize, to: usize) -> usize {
    to.wrapping_sub(from) & CURSOR_MASK
}

#[inline]
fn advance(cursor: usize, frames: usize) -> usize {
    cursor.wrapping_add(frames) & CURSOR_MASK
}

impl Shared {
    #[inline]
    fn channel_ptr(&self, channel: usize, index: usize) -> *mut f32 {
        debug_assert!(channel < CHANNELS && index < self.capacity);
        UnsafeCell::raw_get(self.data[channel * self.capacity + index..].as_ptr())
    }

    /// Read position after applying a clear at `mark`. A mark at or behind
    /// `read` has already been consumed and changes nothing.
    #[inline]
    fn cleared_position(&self, read: usize, mark: usize) -> usize {
        let ahead = distance(read, mark);
        if ahead > 0 && ahead <= self.capacity {
            mark
        } else {
            read
        }
    }

    /// Frames visible to the reader, honoring a pending clear
    fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let mut read = self.read.load(Ordering::Acquire) & CURSOR_MASK;
        if self.clear_requested.load(Ordering::Acquire) {
            read = self.cleared_position(read, self.clear_mark.load(Ordering::Acquire));
        }
        distance(read, write)
    }
}

/// Create a ring holding up to `capacity` frames.
///
/// Returns the producer end, the consumer end and a monitor handle.
pub fn ring_buffer(capacity: usize) -> (RingWriter, RingReader, RingMonitor) {
    assert!(capacity > 0, "ring capacity must be non-zero");

    let data: Box<[UnsafeCell<f32>]> = (0..capacity * CHANNELS)
        .map(|_| UnsafeCell::new(0.0))
        .collect();

    let shared = Arc::new(Shared {
        data,
        capacity,
        write: CachePadded::new(AtomicUsize::new(0)),
        read: CachePadded::new(AtomicUsize::new(0)),
        clear_requested: AtomicBool::new(false),
        clear_mark: AtomicUsize::new(0),
        closed: AtomicBool::new(false),
        reading_started: AtomicBool::new(false),
        frames_written: AtomicU64::new(0),
        frames_read: AtomicU64::new(0),
        overruns: AtomicU64::new(0),
        underruns: AtomicU64::new(0),
    });

    (
        RingWriter {
            shared: shared.clone(),
        },
        RingReader {
            shared: shared.clone(),
        },
        RingMonitor { shared },
    )
}

/// Producer end of a ring
pub struct RingWriter {
    shared: Arc<Shared>,
}

impl RingWriter {
    /// Copy a frame into the ring.
    ///
    /// Returns the number of frames written. A frame that does not fit is
    /// dropped whole and reported as [`AudioError::BufferOverrun`].
    pub fn write(&mut self, frame: &CanonicalFrame) -> Result<usize, AudioError> {
        let shared = &*self.shared;
        if shared.closed.load(Ordering::Acquire) {
            return Err(AudioError::WriterClosed);
        }

        let frames = frame.frames();
        if frames == 0 {
            return Ok(0);
        }

        let write = shared.write.load(Ordering::Relaxed);
        let read = self.read_position();
        let free = shared.capacity - distance(read, write);
        if frames > free {
            shared.overruns.fetch_add(1, Ordering::Relaxed);
            return Err(AudioError::BufferOverrun {
                requested: frames,
                free,
            });
        }

        let start = write % shared.capacity;
        let first = frames.min(shared.capacity - start);
        for channel in 0..CHANNELS {
            let src = frame.channel(channel);
            // SAFETY: [start, start + first) and [0, frames - first) lie in
            // the free region, which the reader does not touch until the
            // write cursor is published below.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    src.as_ptr(),
                    shared.channel_ptr(channel, start),
                    first,
                );
                if frames > first {
                    std::ptr::copy_nonoverlapping(
                        src[first..].as_ptr(),
                        shared.channel_ptr(channel, 0),
                        frames - first,
                    );
                }
            }
        }

        shared.write.store(advance(write, frames), Ordering::Release);
        shared
            .frames_written
            .fetch_add(frames as u64, Ordering::Relaxed);
        Ok(frames)
    }

    /// Frames that can be written without overrun
    pub fn free(&self) -> usize {
        let write = self.shared.write.load(Ordering::Relaxed);
        self.shared.capacity - distance(self.read_position(), write)
    }

    /// Read cursor as seen by the writer.
    ///
    /// A pending clear is applied here when the reader is idle, so discarded
    /// frames stop occupying space before the next read. While the reader
    /// holds a region the clear is left for it to apply.
    fn read_position(&self) -> usize {
        let shared = &*self.shared;
        let observed = shared.read.load(Ordering::Acquire);
        if observed & READER_BUSY != 0 || !shared.clear_requested.load(Ordering::Acquire) {
            return observed & CURSOR_MASK;
        }
        if !shared.clear_requested.swap(false, Ordering::AcqRel) {
            return observed;
        }

        let target = shared.cleared_position(observed, shared.clear_mark.load(Ordering::Acquire));
        if target == observed {
            return observed;
        }
        match shared
            .read
            .compare_exchange(observed, target, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => target,
            Err(current) => {
                // reader claimed in between; it applies the clear instead
                shared.clear_requested.store(true, Ordering::Release);
                current & CURSOR_MASK
            }
        }
    }

    /// Stop accepting writes; the reader drains what is left
    pub fn close(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl Drop for RingWriter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consumer end of a ring.
///
/// Every method is wait-free and allocation-free.
pub struct RingReader {
    shared: Arc<Shared>,
}

impl RingReader {
    /// Claim up to `wanted` readable frames, returning (cursor, count).
    ///
    /// Marks the reader busy until `release`.
    #[inline]
    fn claim(&mut self, wanted: usize) -> (usize, usize) {
        let shared = &*self.shared;
        let mut read = shared.read.fetch_or(READER_BUSY, Ordering::AcqRel) & CURSOR_MASK;
        if shared.clear_requested.swap(false, Ordering::AcqRel) {
            read = shared.cleared_position(read, shared.clear_mark.load(Ordering::Acquire));
        }
        let write = shared.write.load(Ordering::Acquire);
        (read, distance(read, write).min(wanted))
    }

    #[inline]
    fn release(&mut self, read: usize, taken: usize, wanted: usize) {
        let shared = &*self.shared;
        // also clears READER_BUSY
        shared.read.store(advance(read, taken), Ordering::Release);
        shared.frames_read.fetch_add(taken as u64, Ordering::Relaxed);
        if taken < wanted {
            shared.underruns.fetch_add(1, Ordering::Relaxed);
        }
        shared.reading_started.store(true, Ordering::Relaxed);
    }

    /// Fill `left` and `right` with up to `min(left.len(), right.len())`
    /// frames.
    ///
    /// Returns how many real frames were copied. Everything past that in
    /// both slices is set to silence.
    pub fn read(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        let wanted = left.len().min(right.len());
        let (read, taken) = self.claim(wanted);

        let capacity = self.shared.capacity;
        let start = read % capacity;
        let first = taken.min(capacity - start);
        for (channel, dest) in [&mut *left, &mut *right].into_iter().enumerate() {
            // SAFETY: [read, read + taken) was published by the writer and
            // stays reserved for the reader until `release`.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.shared.channel_ptr(channel, start),
                    dest.as_mut_ptr(),
                    first,
                );
                if taken > first {
                    std::ptr::copy_nonoverlapping(
                        self.shared.channel_ptr(channel, 0),
                        dest[first..].as_mut_ptr(),
                        taken - first,
                    );
                }
            }
            dest[taken..].fill(0.0);
        }

        self.release(read, taken, wanted);
        taken
    }

    /// Fill `out` with interleaved stereo, `out.len() / 2` frames.
    ///
    /// Same guarantees as [`read`](Self::read); a trailing odd sample is
    /// zeroed.
    pub fn read_interleaved(&mut self, out: &mut [f32]) -> usize {
        let wanted = out.len() / CHANNELS;
        let (read, taken) = self.claim(wanted);

        let capacity = self.shared.capacity;
        for (i, pair) in out.chunks_exact_mut(CHANNELS).take(taken).enumerate() {
            let index = advance(read, i) % capacity;
            for (channel, sample) in pair.iter_mut().enumerate() {
                // SAFETY: see `read`
                *sample = unsafe { *self.shared.channel_ptr(channel, index) };
            }
        }
        out[taken * CHANNELS..].fill(0.0);

        self.release(read, taken, wanted);
        taken
    }

    /// Frames currently readable
    pub fn available(&self) -> usize {
        self.shared.len()
    }

    /// Monitor handle sharing this ring
    pub fn monitor(&self) -> RingMonitor {
        RingMonitor {
            shared: self.shared.clone(),
        }
    }
}

/// Snapshot of a ring's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingStats {
    pub capacity: usize,
    pub buffered: usize,
    pub frames_written: u64,
    pub frames_read: u64,
    pub overruns: u64,
    pub underruns: u64,
}

impl RingStats {
    /// Fill level as a fraction of capacity
    pub fn fill_level(&self) -> f32 {
        self.buffered as f32 / self.capacity as f32
    }
}

/// Shared observer of a ring. Can request a clear from any thread.
#[derive(Clone)]
pub struct RingMonitor {
    shared: Arc<Shared>,
}

impl RingMonitor {
    /// Discard everything written so far.
    ///
    /// The next read returns none of the discarded frames, and the writer
    /// can reuse their space as soon as the reader is not mid-read. Frames
    /// written after this call are kept.
    pub fn clear(&self) {
        let shared = &*self.shared;
        let write = shared.write.load(Ordering::Acquire);
        shared.clear_mark.store(write, Ordering::Release);
        shared.clear_requested.store(true, Ordering::Release);
        shared.reading_started.store(false, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn state(&self) -> RingState {
        let len = self.len();
        if self.shared.closed.load(Ordering::Acquire) {
            if len == 0 {
                RingState::Empty
            } else {
                RingState::Draining
            }
        } else if self.shared.reading_started.load(Ordering::Relaxed) {
            RingState::Steady
        } else if len == 0 {
            RingState::Empty
        } else {
            RingState::Filling
        }
    }

    pub fn stats(&self) -> RingStats {
        let shared = &*self.shared;
        RingStats {
            capacity: shared.capacity,
            buffered: self.len(),
            frames_written: shared.frames_written.load(Ordering::Relaxed),
            frames_read: shared.frames_read.load(Ordering::Relaxed),
            overruns: shared.overruns.load(Ordering::Relaxed),
            underruns: shared.underruns.load(Ordering::Relaxed),
        }
    }

    /// Reset statistics
    pub fn reset_stats(&self) {
        let shared = &*self.shared;
        shared.frames_written.store(0, Ordering::Relaxed);
        shared.frames_read.store(0, Ordering::Relaxed);
        shared.overruns.store(0, Ordering::Relaxed);
        shared.underruns.store(0, Ordering::Relaxed);
    }
}
