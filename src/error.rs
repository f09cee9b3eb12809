//! Error types for the VITA audio pipeline

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed VITA-49 datagrams
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Packet too short: {len} bytes, header needs {needed}")]
    TooShort { len: usize, needed: usize },

    #[error("Declared size {declared} bytes exceeds buffer length {len}")]
    SizeExceedsBuffer { declared: usize, len: usize },

    #[error("Declared size {declared} bytes is smaller than header and trailer ({minimum})")]
    SizeBelowHeader { declared: usize, minimum: usize },
}

/// Format conversion and Opus codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Decoder initialization failed: {0}")]
    DecoderInit(String),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Payload length {len} is not a multiple of {unit} bytes")]
    InvalidPayloadLength { len: usize, unit: usize },
}

/// Ring buffer and hardware sink errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Buffer overrun: {requested} frames offered, {free} free")]
    BufferOverrun { requested: usize, free: usize },

    #[error("Writer is closed")]
    WriterClosed,

    #[error("Invalid ring capacity: {0} frames")]
    InvalidCapacity(usize),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Receiver already running")]
    AlreadyRunning,
}

/// Stream lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Stream not found: 0x{0:08X}")]
    NotFound(u32),

    #[error("Class code 0x{0:04X} is not an audio class")]
    NotAudio(u16),

    #[error("Output for stream 0x{0:08X} already taken")]
    OutputTaken(u32),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
