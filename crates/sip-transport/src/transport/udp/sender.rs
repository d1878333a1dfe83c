use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

use crate::error::{Error, Result};

/// Thin wrapper around the shared socket for writes. The OS socket itself
/// serializes concurrent sends, so this holds no lock of its own.
#[derive(Clone)]
pub struct UdpSender {
    socket: Arc<UdpSocket>,
}

impl UdpSender {
    pub fn new(socket: Arc<UdpSocket>) -> Result<Self> {
        Ok(UdpSender { socket })
    }

    pub async fn send(&self, bytes: &[u8], destination: SocketAddr) -> Result<()> {
        self.socket
            .send_to(bytes, destination)
            .await
            .map(|_| ())
            .map_err(|source| Error::Send {
                len: bytes.len(),
                destination,
                source,
            })
    }
}
