pub mod messages;
pub mod transport;
pub mod websocket;

pub use messages::Speaker;
pub use transport::{ServerEvent, SessionTransport, TransportConfig, TransportHandle};
pub use websocket::WebSocketTransport;
