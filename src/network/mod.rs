//! Network subsystem: VITA-49 decoding and UDP transport

pub mod receiver;
pub mod udp;
pub mod vita;

pub use receiver::{ReceiverStats, VitaReceiver};
pub use udp::create_socket;
pub use vita::{decode, ClassCode, VitaHeader, VitaPacket};
