use std::net::SocketAddr;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Transport-layer failures. Parse errors from the codec are reported via
/// [`TransportEvent::ParseError`](crate::transport::TransportEvent::ParseError)
/// rather than this enum, since a malformed datagram is not a transport
/// fault and must not stop the read loop.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to bind UDP socket to {addr}: {source}")]
    Bind { addr: SocketAddr, source: std::io::Error },

    #[error("failed to send {len} bytes to {destination}: {source}")]
    Send {
        len: usize,
        destination: SocketAddr,
        source: std::io::Error,
    },

    #[error("transport is closed")]
    Closed,

    #[error("could not resolve a non-loopback local IP address")]
    NoLocalAddress,
}
