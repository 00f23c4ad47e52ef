// HTTP and WebSocket APIs

pub mod buses;
pub mod location;
pub mod websocket;

pub use buses::{create_buses_router, BusesAppState};
pub use location::{create_location_router, LocationAppState};
pub use websocket::{create_ws_router, ws_handler, WsAppState};
