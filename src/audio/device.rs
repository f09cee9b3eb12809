//! Output device enumeration

use cpal::traits::{DeviceTrait, HostTrait};

use crate::constants::{CHANNELS, SAMPLE_RATE};
use crate::error::AudioError;

/// Description of an output device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    /// Whether the device advertises 24 kHz stereo f32
    pub supports_canonical: bool,
}

/// Wrapper around a cpal output device
pub struct AudioDevice {
    inner: cpal::Device,
    pub name: String,
}

impl AudioDevice {
    pub fn from_cpal(device: cpal::Device) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        Self {
            inner: device,
            name,
        }
    }

    pub fn inner(&self) -> &cpal::Device {
        &self.inner
    }

    pub fn into_inner(self) -> cpal::Device {
        self.inner
    }
}

fn supports_canonical(device: &cpal::Device) -> bool {
    let rate = cpal::SampleRate(SAMPLE_RATE);
    device
        .supported_output_configs()
        .map(|mut configs| {
            configs.any(|c| {
                c.channels() as usize == CHANNELS
                    && c.sample_format() == cpal::SampleFormat::F32
                    && rate >= c.min_sample_rate()
                    && rate <= c.max_sample_rate()
            })
        })
        .unwrap_or(false)
}

/// List output devices on the default host
pub fn list_output_devices() -> Vec<OutputDeviceInfo> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device.name() {
                devices.push(OutputDeviceInfo {
                    id: format!("output:{}", name),
                    is_default: default_name.as_ref() == Some(&name),
                    supports_canonical: supports_canonical(&device),
                    name,
                });
            }
        }
    }
    devices
}

/// Find an output device by id (`output:<name>`) or bare name
pub fn get_output_device(id: &str) -> Result<AudioDevice, AudioError> {
    let name = id.strip_prefix("output:").unwrap_or(id);
    let host = cpal::default_host();
    let outputs = host
        .output_devices()
        .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;

    for device in outputs {
        if device.name().ok().as_deref() == Some(name) {
            return Ok(AudioDevice::from_cpal(device));
        }
    }

    Err(AudioError::DeviceNotFound(id.to_string()))
}

/// Default output device
pub fn get_default_output_device() -> Result<AudioDevice, AudioError> {
    cpal::default_host()
        .default_output_device()
        .map(AudioDevice::from_cpal)
        .ok_or_else(|| AudioError::DeviceNotFound("No default output device".to_string()))
}
