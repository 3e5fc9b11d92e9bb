//! Telemetry source implementations

pub mod memory;
pub mod udp;

pub use memory::MemoryProvider;
pub use udp::UdpProvider;
