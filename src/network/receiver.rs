//! VITA datagram receiver
//!
//! A single task reads the VITA port and feeds every datagram straight into
//! the [`StreamRegistry`]. Handling datagrams inline on one task keeps each
//! stream's packets in arrival order.

use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::NetworkConfig;
use crate::error::{NetworkError, Result};
use crate::network::udp::create_socket;
use crate::streams::StreamRegistry;

#[derive(Default)]
struct ReceiverCounters {
    datagrams: AtomicU64,
    bytes: AtomicU64,
    errors: AtomicU64,
}

/// Receiver statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverStats {
    pub datagrams: u64,
    pub bytes: u64,
    pub errors: u64,
}

pub struct VitaReceiver {
    registry: Arc<StreamRegistry>,
    counters: Arc<ReceiverCounters>,
    local_addr: Option<SocketAddr>,
    handle: Option<JoinHandle<()>>,
}

impl VitaReceiver {
    pub fn new(registry: Arc<StreamRegistry>) -> Self {
        Self {
            registry,
            counters: Arc::new(ReceiverCounters::default()),
            local_addr: None,
            handle: None,
        }
    }

    /// Bind and start receiving. Must be called inside a tokio runtime.
    pub fn start(&mut self, config: &NetworkConfig) -> Result<SocketAddr> {
        if self.handle.is_some() {
            return Err(NetworkError::AlreadyRunning.into());
        }

        let socket = tokio::net::UdpSocket::from_std(create_socket(config)?)?;
        let local_addr = socket.local_addr()?;
        let registry = self.registry.clone();
        let counters = self.counters.clone();
        let max_datagram = config.max_datagram;

        self.handle = Some(tokio::spawn(async move {
            let mut buf = BytesMut::with_capacity(max_datagram);
            loop {
                buf.clear();
                buf.resize(max_datagram, 0);
                match socket.recv_from(&mut buf).await {
                    Ok((len, _peer)) => {
                        counters.datagrams.fetch_add(1, Ordering::Relaxed);
                        counters.bytes.fetch_add(len as u64, Ordering::Relaxed);
                        buf.truncate(len);
                        registry.ingest(buf.split().freeze());
                    }
                    Err(e) => {
                        counters.errors.fetch_add(1, Ordering::Relaxed);
                        tracing::trace!(error = %e, "UDP receive error");
                    }
                }
            }
        }));
        self.local_addr = Some(local_addr);

        tracing::info!(%local_addr, "VITA receiver started");
        Ok(local_addr)
    }

    /// Stop the receive task
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("VITA receiver stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> ReceiverStats {
        ReceiverStats {
            datagrams: self.counters.datagrams.load(Ordering::Relaxed),
            bytes: self.counters.bytes.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }
}

impl Drop for VitaReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}
