//! Stream management module

pub mod context;
pub mod registry;

pub use context::{RouteOutcome, StreamContext, StreamStats};
pub use registry::{ForwardedPacket, RegistryStats, StreamRegistry};
