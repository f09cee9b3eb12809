//! Per-stream state
//!
//! A context owns the stream's format processor and the producer end of its
//! ring. It is only touched from the network side, under the registry's
//! per-stream lock.

use crate::audio::buffer::{ring_buffer, RingMonitor, RingReader, RingWriter};
use crate::error::{AudioError, CodecError, Error};
use crate::network::vita::{ClassCode, VitaPacket};
use crate::processor::FormatProcessor;

/// Packet counts this far behind the newest one are treated as late
/// arrivals rather than a wrap past 16 lost packets
const REORDER_WINDOW: u8 = 3;

/// What happened to one routed packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Frames were written to the stream's ring
    Enqueued { frames: usize },
    /// The payload decoded to zero frames
    Empty,
    /// The ring was full; the frame was dropped
    Overrun,
    /// The processor rejected the payload
    DecodeFailed,
    /// No context could be created for a new stream id
    ContextFailed,
    /// The stream was torn down while the packet was in flight
    Stale,
    /// Stream id is live with a different audio class
    ClassMismatch,
    /// Datagram could not be decoded
    Malformed,
    /// Non-audio class handed to the forward channel
    Forwarded,
    /// Non-audio class with nowhere to go
    Ignored,
}

/// Per-stream counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub packets: u64,
    pub frames_enqueued: u64,
    pub lost_packets: u64,
    pub duplicate_packets: u64,
    pub reordered_packets: u64,
    pub decode_failures: u64,
    pub overruns: u64,
}

pub struct StreamContext {
    stream_id: u32,
    class: ClassCode,
    processor: FormatProcessor,
    writer: RingWriter,
    monitor: RingMonitor,
    last_sequence: Option<u8>,
    /// Cleared on teardown; checked right before every ring write
    alive: bool,
    /// Set once the control plane has announced the stream
    started: bool,
    stats: StreamStats,
}

impl StreamContext {
    /// Create a context and the consumer end of its ring
    pub fn new(
        stream_id: u32,
        class: ClassCode,
        ring_capacity: usize,
    ) -> Result<(Self, RingReader), Error> {
        if ring_capacity == 0 {
            return Err(AudioError::InvalidCapacity(ring_capacity).into());
        }
        let processor = FormatProcessor::for_class(class)?;
        let (writer, reader, monitor) = ring_buffer(ring_capacity);

        let context = Self {
            stream_id,
            class,
            processor,
            writer,
            monitor,
            last_sequence: None,
            alive: true,
            started: false,
            stats: StreamStats::default(),
        };
        Ok((context, reader))
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    pub fn class_code(&self) -> ClassCode {
        self.class
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn monitor(&self) -> &RingMonitor {
        &self.monitor
    }

    /// Count packets missing between the last sequence and `sequence`.
    ///
    /// A packet up to [`REORDER_WINDOW`] counts behind the newest is late,
    /// not a sign of loss, and does not move the newest count back.
    fn track_sequence(&mut self, sequence: u8) -> u8 {
        let Some(last) = self.last_sequence else {
            self.last_sequence = Some(sequence);
            return 0;
        };

        let step = sequence.wrapping_sub(last) & 0x0F;
        match step {
            0 => {
                self.stats.duplicate_packets += 1;
                0
            }
            s if s > 0x0F - REORDER_WINDOW => {
                self.stats.reordered_packets += 1;
                0
            }
            s => {
                self.last_sequence = Some(sequence);
                s - 1
            }
        }
    }

    /// Decode one packet and enqueue the resulting frame
    pub fn process(&mut self, packet: &VitaPacket<'_>) -> RouteOutcome {
        self.stats.packets += 1;

        let lost = self.track_sequence(packet.sequence());
        if lost > 0 {
            self.stats.lost_packets += lost as u64;
            tracing::debug!(
                stream_id = format_args!("0x{:08X}", self.stream_id),
                lost,
                sequence = packet.sequence(),
                "Sequence gap"
            );
        }

        let frame = match self.processor.process(packet.payload) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.decode_failures += 1;
                tracing::warn!(
                    stream_id = format_args!("0x{:08X}", self.stream_id),
                    class = ?self.class,
                    error = %e,
                    "Dropping undecodable payload"
                );
                return RouteOutcome::DecodeFailed;
            }
        };

        if !self.alive {
            return RouteOutcome::Stale;
        }

        match self.writer.write(frame) {
            Ok(0) => RouteOutcome::Empty,
            Ok(frames) => {
                self.stats.frames_enqueued += frames as u64;
                RouteOutcome::Enqueued { frames }
            }
            Err(AudioError::BufferOverrun { requested, free }) => {
                self.stats.overruns += 1;
                tracing::debug!(
                    stream_id = format_args!("0x{:08X}", self.stream_id),
                    requested,
                    free,
                    "Ring full, dropping newest frame"
                );
                RouteOutcome::Overrun
            }
            Err(_) => RouteOutcome::Stale,
        }
    }

    /// Restart in place: discard buffered audio and codec history
    pub fn restart(&mut self) -> Result<(), CodecError> {
        self.monitor.clear();
        self.last_sequence = None;
        self.processor.reset()
    }

    /// Tear down: no further writes reach the ring
    pub fn shutdown(&mut self) {
        self.alive = false;
        self.writer.close();
    }
}
