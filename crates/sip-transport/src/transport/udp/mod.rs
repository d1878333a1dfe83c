mod listener;
mod sender;

pub use listener::UdpListener;
pub use sender::UdpSender;

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use gb28181_sip_core::Message;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportEvent};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// The GB28181 UDP SIP endpoint. A single socket bound to the configured
/// `udp` address; every inbound datagram the reader picks up is parsed and
/// forwarded as a [`TransportEvent`] over the returned channel, so the
/// reader itself never blocks on handler logic.
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

struct UdpTransportInner {
    sender: UdpSender,
    listener: Arc<UdpListener>,
    closed: AtomicBool,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr, channel_capacity: Option<usize>) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let capacity = channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        let listener = UdpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("SIP UDP transport bound to {}", local_addr);

        let sender = UdpSender::new(listener.clone_socket())?;

        let transport = UdpTransport {
            inner: Arc::new(UdpTransportInner {
                sender,
                listener: Arc::new(listener),
                closed: AtomicBool::new(false),
                events_tx,
            }),
        };

        transport.spawn_receive_loop();

        Ok((transport, events_rx))
    }

    fn spawn_receive_loop(&self) {
        let transport = self.clone();

        tokio::spawn(async move {
            let inner = &transport.inner;
            let listener = inner.listener.clone();

            while !inner.closed.load(Ordering::Relaxed) {
                match listener.receive().await {
                    Ok((packet, source, local_addr)) => {
                        debug!("received {} bytes from {}", packet.len(), source);
                        match gb28181_sip_core::parse(&packet, source) {
                            Ok(message) => {
                                let event = TransportEvent::MessageReceived {
                                    message,
                                    source,
                                    destination: local_addr,
                                };
                                if inner.events_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(error) => {
                                warn!(%error, %source, "dropping malformed SIP datagram");
                                let _ = inner.events_tx.send(TransportEvent::ParseError { error, source }).await;
                            }
                        }
                    }
                    Err(e) => {
                        if inner.closed.load(Ordering::Relaxed) {
                            break;
                        }
                        error!("UDP receive error: {}", e);
                    }
                }
            }

            let _ = inner.events_tx.send(TransportEvent::Closed).await;
            info!("UDP receive loop terminated");
        });
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.listener.local_addr()
    }

    async fn send_message(&self, message: Message, destination: SocketAddr) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let bytes = gb28181_sip_core::serialize(&message);
        debug!("sending {} bytes to {}", bytes.len(), destination);
        self.inner.sender.send(&bytes, destination).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.listener.local_addr() {
            Ok(addr) => write!(f, "UdpTransport({})", addr),
            Err(_) => write!(f, "UdpTransport(<unbound>)"),
        }
    }
}

/// Resolves the process's own IP once at startup: the first non-loopback
/// IPv4 address, for use in `Via`/`Contact` headers of requests this
/// server originates.
pub fn resolve_self_ip() -> Result<IpAddr> {
    use std::net::UdpSocket as StdUdpSocket;
    // Dialing out (without actually sending) forces the OS to pick the
    // route/interface it would use, which is the simplest portable way to
    // learn our own non-loopback address.
    let socket = StdUdpSocket::bind("0.0.0.0:0").map_err(|_| Error::NoLocalAddress)?;
    socket.connect("8.8.8.8:80").map_err(|_| Error::NoLocalAddress)?;
    socket.local_addr().map(|a| a.ip()).map_err(|_| Error::NoLocalAddress)
}
