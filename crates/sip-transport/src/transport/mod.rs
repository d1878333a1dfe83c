pub mod udp;

use std::net::SocketAddr;

use async_trait::async_trait;
use gb28181_sip_core::Message;

use crate::error::Result;

/// Events the transport layer reports to the read loop. A datagram that
/// fails to parse becomes a [`TransportEvent::ParseError`] rather than
/// being silently dropped, but still carries no `Message`: a parse
/// failure is logged and dropped, never responded to, since we can't
/// reliably attribute it to a transaction.
#[derive(Debug)]
pub enum TransportEvent {
    MessageReceived {
        message: Message,
        source: SocketAddr,
        destination: SocketAddr,
    },
    ParseError {
        error: gb28181_sip_core::Error,
        source: SocketAddr,
    },
    Closed,
}

/// The narrow interface the transaction layer needs from a transport: send
/// a message to a destination, and know whether it's still usable. GB28181
/// only ever runs over UDP, but keeping this as a trait rather than
/// hard-wiring `UdpTransport` everywhere keeps the transaction layer
/// decoupled from the concrete socket implementation.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    fn local_addr(&self) -> Result<SocketAddr>;
    async fn send_message(&self, message: Message, destination: SocketAddr) -> Result<()>;
    async fn close(&self) -> Result<()>;
    fn is_closed(&self) -> bool;
}
