//! # VITA Audio
//!
//! Client-side reconstruction of real-time audio carried in VITA-49 UDP
//! datagrams from a SmartSDR radio.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                UDP Receiver (network::receiver)                      │
//! │                one task, datagrams in arrival order                  │
//! └──────────────────────────────┬───────────────────────────────────────┘
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │        Packet Decoder (network::vita) -> VitaPacket                  │
//! └──────────────────────────────┬───────────────────────────────────────┘
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │        Stream Router (streams::registry) - demux by stream id        │
//! │   non-audio classes ──► forward channel (meters, FFT, waterfall)     │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐        │
//! │  │ Stream 0x0400… │   │ Stream 0x0400… │   │ Stream 0x4A00… │        │
//! │  │  Raw PCM proc  │   │ Reduced BW proc│   │   Opus proc    │        │
//! │  └───────┬────────┘   └───────┬────────┘   └───────┬────────┘        │
//! │          ▼                    ▼                    ▼                 │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐        │
//! │  │  SPSC ring     │   │  SPSC ring     │   │  SPSC ring     │        │
//! │  └───────┬────────┘   └───────┬────────┘   └───────┬────────┘        │
//! └──────────┼────────────────────┼────────────────────┼─────────────────┘
//!            ▼                    ▼                    ▼
//!      StreamOutput         StreamOutput         StreamOutput
//!   (real-time callback, no locks, no allocation, silence on underrun)
//! ```
//!
//! Every wire encoding is normalized to one canonical format: 24 kHz,
//! stereo, `f32`, non-interleaved.

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod processor;
pub mod streams;

pub use audio::{CanonicalFrame, StreamOutput};
pub use error::{Error, Result};
pub use network::vita::{ClassCode, VitaPacket};
pub use streams::StreamRegistry;

/// Application-wide constants
pub mod constants {
    /// Canonical sample rate for every reconstructed stream
    pub const SAMPLE_RATE: u32 = 24_000;

    /// Canonical channel count (stereo)
    pub const CHANNELS: usize = 2;

    /// Nominal Opus frame: 10 ms at 24 kHz
    pub const OPUS_FRAME_SAMPLES: usize = 240;

    /// Largest Opus frame: 120 ms at 24 kHz
    pub const OPUS_MAX_FRAME_SAMPLES: usize = 2_880;

    /// Extra ring room on top of the Opus worst case
    pub const RING_OVERAGE_FRAMES: usize = 1_024;

    /// Ring capacity in frames (samples per channel)
    pub const RING_CAPACITY_FRAMES: usize = OPUS_MAX_FRAME_SAMPLES * 20 + RING_OVERAGE_FRAMES;

    /// Normalization divisor for 16-bit wire samples (`i16::MAX`)
    pub const INT16_SCALE: f32 = 32_767.0;

    /// SmartSDR VITA-49 UDP port
    pub const DEFAULT_UDP_PORT: u16 = 4991;

    /// Maximum datagram we expect on the VITA port
    pub const MAX_PACKET_SIZE: usize = 16_384;

    /// Queue depth for packets forwarded to non-audio pipelines
    pub const FORWARD_CHANNEL_CAPACITY: usize = 1_024;
}
