use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

use crate::error::{Error, Result};

const MAX_DATAGRAM_SIZE: usize = 65507;

/// Owns the bound UDP socket and reads one datagram at a time.
pub struct UdpListener {
    socket: Arc<UdpSocket>,
}

impl UdpListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        Ok(UdpListener {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|source| Error::Bind { addr: "0.0.0.0:0".parse().unwrap(), source })
    }

    pub fn clone_socket(&self) -> Arc<UdpSocket> {
        self.socket.clone()
    }

    /// Reads exactly one datagram, copied into an owned buffer so the read
    /// loop never holds a borrow across the handoff to the parser.
    pub async fn receive(&self) -> std::io::Result<(Vec<u8>, SocketAddr, SocketAddr)> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, source) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        let local = self.socket.local_addr()?;
        Ok((buf, source, local))
    }
}
