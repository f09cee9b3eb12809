//! Stream router
//!
//! The registry owns every active [`StreamContext`], keyed by VITA stream id.
//! Audio packets for an unseen stream id create a context on demand; the
//! control plane can announce and tear down streams explicitly. Packets of
//! non-audio classes are handed to a forward channel for sibling pipelines.

use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::audio::buffer::{RingMonitor, RingStats};
use crate::audio::output::StreamOutput;
use crate::config::StreamsConfig;
use crate::error::{Error, StreamError};
use crate::network::vita::{self, ClassCode, VitaHeader, VitaPacket};
use crate::streams::context::{RouteOutcome, StreamContext, StreamStats};

/// Non-audio packet handed to another pipeline
#[derive(Debug, Clone)]
pub struct ForwardedPacket {
    pub header: VitaHeader,
    /// Zero-copy slice of the original datagram
    pub payload: Bytes,
}

struct StreamEntry {
    context: Arc<Mutex<StreamContext>>,
    monitor: RingMonitor,
    /// Consumer end, until someone takes it
    output: Option<StreamOutput>,
}

#[derive(Default)]
struct RegistryCounters {
    datagrams: AtomicU64,
    malformed: AtomicU64,
    forwarded: AtomicU64,
    forward_dropped: AtomicU64,
    class_mismatch: AtomicU64,
    streams_created: AtomicU64,
    context_failures: AtomicU64,
    dropped_after_stop: AtomicU64,
}

/// Registry-wide counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub datagrams: u64,
    pub malformed: u64,
    pub forwarded: u64,
    pub forward_dropped: u64,
    pub class_mismatch: u64,
    pub streams_created: u64,
    pub context_failures: u64,
    pub dropped_after_stop: u64,
    pub active_streams: usize,
}

/// Owner of all stream contexts
pub struct StreamRegistry {
    streams: DashMap<u32, StreamEntry>,
    /// Ids stopped by the control plane and not started again
    stopped: DashSet<u32>,
    ring_capacity: usize,
    forward_tx: Option<Sender<ForwardedPacket>>,
    counters: RegistryCounters,
}

impl StreamRegistry {
    pub fn new(config: &StreamsConfig) -> Self {
        Self {
            streams: DashMap::new(),
            stopped: DashSet::new(),
            ring_capacity: config.ring_capacity_frames,
            forward_tx: None,
            counters: RegistryCounters::default(),
        }
    }

    /// Registry that forwards non-audio packets to the returned receiver
    pub fn with_forwarding(config: &StreamsConfig) -> (Self, Receiver<ForwardedPacket>) {
        let (tx, rx) = bounded(config.forward_capacity);
        let mut registry = Self::new(config);
        registry.forward_tx = Some(tx);
        (registry, rx)
    }

    fn create_entry(&self, stream_id: u32, class: ClassCode) -> Result<StreamEntry, Error> {
        let (context, reader) = StreamContext::new(stream_id, class, self.ring_capacity)?;
        let monitor = context.monitor().clone();
        self.counters.streams_created.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            stream_id = format_args!("0x{:08X}", stream_id),
            class = ?class,
            "Created audio stream"
        );
        Ok(StreamEntry {
            context: Arc::new(Mutex::new(context)),
            monitor,
            output: Some(StreamOutput::new(stream_id, reader)),
        })
    }

    /// Context for `stream_id`, created on first sight
    fn context_for(
        &self,
        stream_id: u32,
        class: ClassCode,
    ) -> Result<Arc<Mutex<StreamContext>>, Error> {
        if let Some(entry) = self.streams.get(&stream_id) {
            return Ok(entry.context.clone());
        }

        let entry = self.create_entry(stream_id, class)?;
        Ok(self
            .streams
            .entry(stream_id)
            .or_insert(entry)
            .context
            .clone())
    }

    /// Route one decoded packet to its stream's processor
    pub fn route(&self, packet: &VitaPacket<'_>) -> RouteOutcome {
        let class = packet.class_code();
        if !class.is_audio() {
            return RouteOutcome::Ignored;
        }

        let stream_id = packet.stream_id();
        if self.stopped.contains(&stream_id) {
            // trailing packets of a torn down session
            self.counters.dropped_after_stop.fetch_add(1, Ordering::Relaxed);
            return RouteOutcome::Stale;
        }

        let context = match self.context_for(stream_id, class) {
            Ok(context) => context,
            Err(e) => {
                self.counters.context_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    stream_id = format_args!("0x{:08X}", stream_id),
                    error = %e,
                    "Failed to create stream context"
                );
                return RouteOutcome::ContextFailed;
            }
        };

        let mut context = context.lock();
        if context.class_code() != class {
            self.counters.class_mismatch.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                stream_id = format_args!("0x{:08X}", stream_id),
                expected = ?context.class_code(),
                got = ?class,
                "Class code mismatch, packet ignored"
            );
            return RouteOutcome::ClassMismatch;
        }
        context.process(packet)
    }

    /// Decode a raw datagram and route or forward it
    pub fn ingest(&self, datagram: Bytes) -> RouteOutcome {
        self.counters.datagrams.fetch_add(1, Ordering::Relaxed);

        let packet = match vita::decode(&datagram) {
            Ok(packet) => packet,
            Err(e) => {
                self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(len = datagram.len(), error = %e, "Malformed VITA packet");
                return RouteOutcome::Malformed;
            }
        };

        if packet.class_code().is_audio() {
            return self.route(&packet);
        }

        let Some(tx) = &self.forward_tx else {
            return RouteOutcome::Ignored;
        };
        let forwarded = ForwardedPacket {
            header: packet.header,
            payload: datagram.slice(packet.payload_range()),
        };
        match tx.try_send(forwarded) {
            Ok(()) => {
                self.counters.forwarded.fetch_add(1, Ordering::Relaxed);
                RouteOutcome::Forwarded
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.counters.forward_dropped.fetch_add(1, Ordering::Relaxed);
                RouteOutcome::Ignored
            }
        }
    }

    /// Control plane announced a stream.
    ///
    /// A context created on demand by earlier packets is adopted as is,
    /// unless the id was stopped before: a packet that slipped past the stop
    /// may have created it, so it is restarted. A stream that was already
    /// announced is restarted too: its ring is cleared and its decoder
    /// reset. A different class replaces the context.
    pub fn stream_started(&self, stream_id: u32, class: ClassCode) -> Result<(), Error> {
        if !class.is_audio() {
            return Err(StreamError::NotAudio(class.raw()).into());
        }
        let was_stopped = self.stopped.remove(&stream_id).is_some();

        let existing = self.streams.get(&stream_id).map(|e| e.context.clone());
        if let Some(context) = existing {
            let mut context = context.lock();
            if context.class_code() == class {
                if context.is_started() || was_stopped {
                    context.restart()?;
                    tracing::info!(
                        stream_id = format_args!("0x{:08X}", stream_id),
                        "Restarted audio stream"
                    );
                }
                context.mark_started();
                return Ok(());
            }
            context.shutdown();
        }

        let entry = self.create_entry(stream_id, class)?;
        entry.context.lock().mark_started();
        self.streams.insert(stream_id, entry);
        Ok(())
    }

    /// Control plane tore a stream down.
    ///
    /// Packets for the id are dropped until it is started again.
    pub fn stream_stopped(&self, stream_id: u32) -> Result<(), StreamError> {
        let (_, entry) = self
            .streams
            .remove(&stream_id)
            .ok_or(StreamError::NotFound(stream_id))?;
        self.stopped.insert(stream_id);
        entry.context.lock().shutdown();
        tracing::info!(
            stream_id = format_args!("0x{:08X}", stream_id),
            "Stopped audio stream"
        );
        Ok(())
    }

    /// Hand out the consumer end of a stream; once per context
    pub fn take_output(&self, stream_id: u32) -> Result<StreamOutput, StreamError> {
        let mut entry = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::NotFound(stream_id))?;
        entry
            .output
            .take()
            .ok_or(StreamError::OutputTaken(stream_id))
    }

    /// Request a clear of a stream's ring
    pub fn clear(&self, stream_id: u32) -> Result<(), StreamError> {
        let entry = self
            .streams
            .get(&stream_id)
            .ok_or(StreamError::NotFound(stream_id))?;
        entry.monitor.clear();
        Ok(())
    }

    pub fn contains(&self, stream_id: u32) -> bool {
        self.streams.contains_key(&stream_id)
    }

    pub fn stream_ids(&self) -> Vec<u32> {
        self.streams.iter().map(|e| *e.key()).collect()
    }

    pub fn class_code(&self, stream_id: u32) -> Option<ClassCode> {
        let context = self.streams.get(&stream_id)?.context.clone();
        let class = context.lock().class_code();
        Some(class)
    }

    pub fn stream_stats(&self, stream_id: u32) -> Option<StreamStats> {
        let context = self.streams.get(&stream_id)?.context.clone();
        let stats = context.lock().stats();
        Some(stats)
    }

    pub fn ring_stats(&self, stream_id: u32) -> Option<RingStats> {
        self.streams.get(&stream_id).map(|e| e.monitor.stats())
    }

    pub fn stats(&self) -> RegistryStats {
        let c = &self.counters;
        RegistryStats {
            datagrams: c.datagrams.load(Ordering::Relaxed),
            malformed: c.malformed.load(Ordering::Relaxed),
            forwarded: c.forwarded.load(Ordering::Relaxed),
            forward_dropped: c.forward_dropped.load(Ordering::Relaxed),
            class_mismatch: c.class_mismatch.load(Ordering::Relaxed),
            streams_created: c.streams_created.load(Ordering::Relaxed),
            context_failures: c.context_failures.load(Ordering::Relaxed),
            dropped_after_stop: c.dropped_after_stop.load(Ordering::Relaxed),
            active_streams: self.streams.len(),
        }
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new(&StreamsConfig::default())
    }
}
