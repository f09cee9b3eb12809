//! UDP socket setup

use socket2::{Domain, Protocol, Socket, Type};

use crate::config::NetworkConfig;
use crate::error::{Error, NetworkError, Result};

/// Bind a non-blocking UDP socket for the VITA port.
///
/// The receive buffer is enlarged so bursts of audio and spectrum packets
/// survive short scheduling stalls.
pub fn create_socket(config: &NetworkConfig) -> Result<std::net::UdpSocket> {
    let addr = config.socket_addr()?;
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    if let Err(e) = socket.set_recv_buffer_size(config.recv_buffer_bytes) {
        tracing::warn!(
            requested = config.recv_buffer_bytes,
            error = %e,
            "Could not set UDP receive buffer size"
        );
    }
    socket.set_nonblocking(true)?;
    socket
        .bind(&addr.into())
        .map_err(|e| Error::Network(NetworkError::BindFailed(format!("{}: {}", addr, e))))?;

    tracing::debug!(
        %addr,
        recv_buffer = socket.recv_buffer_size().unwrap_or(0),
        "UDP socket bound"
    );
    Ok(socket.into())
}
