//! Audio subsystem module

pub mod buffer;
pub mod frame;
pub mod output;

#[cfg(feature = "playback")]
pub mod device;
#[cfg(feature = "playback")]
pub mod playback;

pub use buffer::{ring_buffer, RingMonitor, RingReader, RingState, RingStats, RingWriter};
pub use frame::CanonicalFrame;
pub use output::StreamOutput;

#[cfg(feature = "playback")]
pub use device::{list_output_devices, get_output_device, AudioDevice};
#[cfg(feature = "playback")]
pub use playback::AudioPlayback;
