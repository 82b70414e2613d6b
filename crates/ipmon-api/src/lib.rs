// ipmon-api: Async Rust client for the IP monitor backend

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{IpmonClient, PRODUCTION_PREFIX, base_prefix_for};
pub use error::Error;
pub use models::{ApiReply, DeviceRecord, TestDetails};
pub use transport::{TlsMode, TransportConfig};
