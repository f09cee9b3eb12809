//! VITA Audio Receiver
//!
//! Listens on the SmartSDR VITA port, reconstructs every audio stream it
//! sees and optionally plays one of them on a local output device.
//!
//! Usage: `vita-receiver [config.toml]`

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vita_audio::{
    config::AppConfig,
    network::VitaReceiver,
    streams::StreamRegistry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting VITA Audio Receiver");

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => AppConfig::load(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::load_or_default()?,
    };

    let (registry, forwarded_rx) = StreamRegistry::with_forwarding(&config.streams);
    let registry = Arc::new(registry);

    // Non-audio packets have no consumer here; drain them so the channel
    // never backs up.
    std::thread::Builder::new()
        .name("vita-forward-drain".into())
        .spawn(move || {
            for packet in forwarded_rx.iter() {
                tracing::trace!(
                    stream_id = format_args!("0x{:08X}", packet.header.stream_id),
                    class = ?packet.header.class_code,
                    len = packet.payload.len(),
                    "Forwarded non-audio packet"
                );
            }
        })?;

    let mut receiver = VitaReceiver::new(registry.clone());
    let local_addr = receiver.start(&config.network)?;
    tracing::info!("Listening for VITA packets on {}", local_addr);

    #[cfg(feature = "playback")]
    let _playback = match config.playback.stream_id {
        Some(stream_id) => {
            for device in vita_audio::audio::list_output_devices() {
                tracing::info!(
                    id = %device.id,
                    default = device.is_default,
                    canonical = device.supports_canonical,
                    "Output device"
                );
            }
            let output = wait_for_output(&registry, stream_id).await;
            Some(vita_audio::audio::AudioPlayback::start(
                config.playback.device.as_deref(),
                output,
            )?)
        }
        None => None,
    };

    let mut stats_interval = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            _ = stats_interval.tick() => log_stats(&receiver, &registry),
        }
    }

    receiver.stop();
    Ok(())
}

#[cfg(feature = "playback")]
async fn wait_for_output(registry: &StreamRegistry, stream_id: u32) -> vita_audio::StreamOutput {
    tracing::info!(
        stream_id = format_args!("0x{:08X}", stream_id),
        "Waiting for stream to appear"
    );
    loop {
        if let Ok(output) = registry.take_output(stream_id) {
            return output;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn log_stats(receiver: &VitaReceiver, registry: &StreamRegistry) {
    let recv = receiver.stats();
    let reg = registry.stats();
    tracing::info!(
        "Receiver: {} datagrams, {:.1} KB, {} malformed, {} forwarded, {} dropped after stop, {} context failures, {} streams",
        recv.datagrams,
        recv.bytes as f64 / 1024.0,
        reg.malformed,
        reg.forwarded,
        reg.dropped_after_stop,
        reg.context_failures,
        reg.active_streams
    );

    for stream_id in registry.stream_ids() {
        let (Some(stream), Some(ring)) =
            (registry.stream_stats(stream_id), registry.ring_stats(stream_id))
        else {
            continue;
        };
        tracing::info!(
            "Stream 0x{:08X}: {} packets, {} lost, {} decode failures, ring {}/{} ({} overruns, {} underruns)",
            stream_id,
            stream.packets,
            stream.lost_packets,
            stream.decode_failures,
            ring.buffered,
            ring.capacity,
            ring.overruns,
            ring.underruns
        );
    }
}
