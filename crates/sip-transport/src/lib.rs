//! UDP SIP transport for the GB28181 signaling stack.
//!
//! A single socket bound to the configured `host:port`. Reads are
//! framed one datagram per `recv`; writes take a serialized message and a
//! destination address.

pub mod error;
pub mod transport;

pub use error::{Error, Result};
pub use transport::udp::{resolve_self_ip, UdpTransport};
pub use transport::{Transport, TransportEvent};

/// Binds a UDP transport to `addr`.
pub async fn bind_udp(addr: std::net::SocketAddr) -> Result<(UdpTransport, tokio::sync::mpsc::Receiver<TransportEvent>)> {
    UdpTransport::bind(addr, None).await
}

pub mod prelude {
    pub use crate::{bind_udp, resolve_self_ip, Error, Result, Transport, TransportEvent, UdpTransport};
}
