//! Hardware playback of a reconstructed stream
//!
//! Opens a cpal output stream in the canonical format and pulls frames from
//! a [`StreamOutput`] inside the device callback.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver};

use crate::audio::device::{get_default_output_device, get_output_device};
use crate::audio::output::StreamOutput;
use crate::constants::{CHANNELS, SAMPLE_RATE};
use crate::error::AudioError;

/// Running output stream for one VITA audio stream
pub struct AudioPlayback {
    stream_id: u32,
    device_name: String,
    stream: cpal::Stream,
    error_rx: Receiver<AudioError>,
}

impl AudioPlayback {
    /// Open `device_id` (or the default device) and start pulling from
    /// `output`
    pub fn start(device_id: Option<&str>, mut output: StreamOutput) -> Result<Self, AudioError> {
        let device = match device_id {
            Some(id) => get_output_device(id)?,
            None => get_default_output_device()?,
        };
        let device_name = device.name.clone();
        let stream_id = output.stream_id();

        let config = StreamConfig {
            channels: CHANNELS as u16,
            sample_rate: cpal::SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let (error_tx, error_rx) = bounded::<AudioError>(16);

        let stream = device
            .into_inner()
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    output.read_interleaved(data);
                },
                move |err| {
                    let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        tracing::info!(
            stream_id = format_args!("0x{:08X}", stream_id),
            device = %device_name,
            "Playback started"
        );

        Ok(Self {
            stream_id,
            device_name,
            stream,
            error_rx,
        })
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Pause the device stream
    pub fn pause(&self) -> Result<(), AudioError> {
        self.stream
            .pause()
            .map_err(|e| AudioError::StreamError(e.to_string()))
    }

    /// Check for errors reported by the device callback
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.try_recv().ok()
    }
}
