mod factory;
mod transport;

pub use factory::WebSocketTransport;
pub use transport::{FrameSink, FrameStream, Transport, TransportConnection, TransportFrame};
