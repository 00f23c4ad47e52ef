// Streaming session driver and wire protocol

pub mod manager;
pub mod protocol;

pub use manager::ConnectionManager;
pub use protocol::{BusLocationMessage, ClientMessage};
