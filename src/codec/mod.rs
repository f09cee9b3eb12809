//! Opus codec wrapper
//!
//! Per-stream Opus decoding at the canonical rate with packet loss
//! concealment.

pub mod decoder;

pub use decoder::{DecoderStats, OpusDecoder};
