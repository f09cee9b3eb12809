//! Application configuration
//!
//! Loaded from TOML. Every section and field is optional; missing values
//! fall back to the defaults below.
//!
//! ```toml
//! [network]
//! bind_address = "0.0.0.0"
//! udp_port = 4991
//!
//! [streams]
//! ring_capacity_frames = 58624
//!
//! [playback]
//! stream_id = 0x04000008
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_UDP_PORT, FORWARD_CHANNEL_CAPACITY, MAX_PACKET_SIZE, OPUS_MAX_FRAME_SAMPLES,
    RING_CAPACITY_FRAMES,
};
use crate::error::{Error, Result};
use crate::network::vita::HEADER_SIZE;

/// UDP receive settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: String,
    pub udp_port: u16,
    /// Requested SO_RCVBUF size
    pub recv_buffer_bytes: usize,
    /// Receive buffer size per datagram
    pub max_datagram: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            udp_port: DEFAULT_UDP_PORT,
            recv_buffer_bytes: 4 * 1024 * 1024,
            max_datagram: MAX_PACKET_SIZE,
        }
    }
}

impl NetworkConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address {}: {}", self.bind_address, e)))?;
        Ok(SocketAddr::new(ip, self.udp_port))
    }
}

/// Per-stream buffering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamsConfig {
    /// Ring capacity in frames (samples per channel)
    pub ring_capacity_frames: usize,
    /// Queue depth for forwarded non-audio packets
    pub forward_capacity: usize,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            ring_capacity_frames: RING_CAPACITY_FRAMES,
            forward_capacity: FORWARD_CHANNEL_CAPACITY,
        }
    }
}

/// Optional hardware playback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Output device id; default device when unset
    pub device: Option<String>,
    /// Stream to play; playback is off when unset
    pub stream_id: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub streams: StreamsConfig,
    pub playback: PlaybackConfig,
}

impl AppConfig {
    /// Parse and validate a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Default location: `<config dir>/vita-audio/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "vita-audio")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the default location if the file exists
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::info!(path = %path.display(), "Loading configuration");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.streams.ring_capacity_frames < OPUS_MAX_FRAME_SAMPLES {
            return Err(Error::Config(format!(
                "ring_capacity_frames {} is below one Opus frame ({})",
                self.streams.ring_capacity_frames, OPUS_MAX_FRAME_SAMPLES
            )));
        }
        if self.streams.forward_capacity == 0 {
            return Err(Error::Config("forward_capacity must be non-zero".into()));
        }
        if self.network.max_datagram < HEADER_SIZE {
            return Err(Error::Config(format!(
                "max_datagram {} is smaller than a VITA header",
                self.network.max_datagram
            )));
        }
        self.network.socket_addr()?;
        Ok(())
    }
}
