//! The media session coordinator.
//!
//! Owns the stream table and RTP port pool, drives the INVITE a play
//! request builds, and runs the periodic sweep that reaps idle streams and
//! expired recordings as a single ticking task rather than separate
//! cron-style jobs.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use gb28181_infra_common::config::RecordConfig;
use gb28181_sip_core::sdp::{MediaOffer, PlayMode};
use gb28181_sip_core::types::via::generate_branch;
use gb28181_sip_core::{Header, Message, Method, Request, Response, StatusCode, Uri};
use gb28181_sip_transport::Transport;
use gb28181_transaction_core::TransactionManager;

use crate::error::{Error, Result};
use crate::media_client::{MediaServerClient, OpenPortRequest};
use crate::ports::PortPool;
use crate::recordings::sweep_recordings;
use crate::stream::{PlayModeDto, Stream, StreamKey, StreamState};
use crate::ssrc;
use crate::table::StreamTable;

/// How long a `Playing` stream may go without a touch before the sweep
/// tears it down.
pub const IDLE_THRESHOLD: Duration = Duration::from_secs(5 * 60);
/// Cadence of the reaper/expiry sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Default deadline for the play-request INVITE.
pub const INVITE_TIMEOUT: Duration = Duration::from_secs(30);

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct SessionCoordinator {
    transport: Arc<dyn Transport>,
    transactions: Arc<TransactionManager>,
    table: Arc<StreamTable>,
    ports: PortPool,
    media: Arc<dyn MediaServerClient>,
    record: RecordConfig,
    local_ip: IpAddr,
    /// This server's own GB28181 device id (`gb28181.lid`), used as the
    /// `From` user of INVITE/BYE requests it originates.
    server_id: String,
    cseq_counter: AtomicU64,
}

impl SessionCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        transactions: Arc<TransactionManager>,
        media: Arc<dyn MediaServerClient>,
        record: RecordConfig,
        local_ip: IpAddr,
        server_id: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(SessionCoordinator {
            transport,
            transactions,
            table: Arc::new(StreamTable::new()),
            ports: PortPool::default(),
            media,
            record,
            local_ip,
            server_id: server_id.into(),
            cseq_counter: AtomicU64::new(1),
        })
    }

    pub fn table(&self) -> &Arc<StreamTable> {
        &self.table
    }

    fn next_cseq(&self) -> u64 {
        self.cseq_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Drives a play request end to end: allocates a port/SSRC, opens the
    /// media-server receive port, sends the INVITE, and on `200 OK` ACKs
    /// the device and records the stream as `Playing`.
    pub async fn play(
        &self,
        device_id: &str,
        channel_id: &str,
        region_host: &str,
        destination: SocketAddr,
        mode: PlayMode,
        range: Option<(u64, u64)>,
    ) -> Result<Stream> {
        let key = StreamKey { device_id: device_id.to_string(), channel_id: channel_id.to_string() };
        let rtp_port = self.ports.allocate()?;
        let ssrc = ssrc::derive(&key, 0);

        let open = self
            .media
            .open_receive_port(OpenPortRequest { ssrc, port: rtp_port })
            .await;
        if let Err(err) = open {
            self.ports.release(rtp_port);
            return Err(err);
        }

        let call_id = format!("{}-{}", key, now_unix());
        let offer = MediaOffer {
            mode,
            session_id: now_unix() as u64,
            session_version: 1,
            local_ip: self.local_ip,
            device_id: device_id.to_string(),
            rtp_port,
            ssrc,
            range,
        };

        let mut request = Request::new(Method::Invite, Uri::sip(device_id, region_host, None));
        let branch = generate_branch();
        request.headers.push(Header::new(
            "Via",
            format!("SIP/2.0/UDP {};branch={}", destination_via_host(self.local_ip), branch),
        ));
        request.headers.push(Header::new("From", format!("<sip:{}@{}>;tag={}", self.server_id, region_host, branch)));
        request.headers.push(Header::new("To", format!("<sip:{}@{}>", device_id, region_host)));
        request.headers.push(Header::new("Call-ID", call_id.clone()));
        request.headers.push(Header::new("CSeq", format!("{} INVITE", self.next_cseq())));
        request.headers.push(Header::new("Max-Forwards", "70"));
        request.headers.push(Header::new("Contact", format!("<sip:{}@{}>", self.server_id, region_host)));
        request.headers.push(Header::new("Content-Type", "application/sdp"));
        request.body = offer.render().into_bytes();
        request.headers.push(Header::new("Content-Length", request.body.len().to_string()));

        let stream = Stream {
            key: key.clone(),
            ssrc,
            rtp_port,
            mode: PlayModeDto::from(mode),
            state: StreamState::Invited,
            created_at: now_unix(),
            last_touched: now_unix(),
            call_id: call_id.clone(),
        };
        self.table.insert(stream);

        let transaction = self.transactions.create_client(request.clone(), destination).await?;
        let response = match transaction.await_response(INVITE_TIMEOUT).await {
            Ok(resp) => resp,
            Err(err) => {
                self.table.remove(&key);
                self.ports.release(rtp_port);
                let _ = self.media.close_receive_port(rtp_port).await;
                return Err(Error::Transaction(err));
            }
        };

        if response.status != StatusCode::OK {
            self.table.remove(&key);
            self.ports.release(rtp_port);
            let _ = self.media.close_receive_port(rtp_port).await;
            return Err(Error::NoAnswer(device_id.to_string()));
        }

        self.send_ack(&request, &response, destination).await;
        self.table.update(&key, |s| {
            s.state = StreamState::Playing;
            s.touch(now_unix());
        });
        info!(%device_id, %channel_id, %ssrc, %rtp_port, "stream playing");
        Ok(self.table.get(&key).expect("just inserted"))
    }

    /// ACK for a 2xx response to INVITE travels end to end, outside the
    /// transaction (RFC 3261 §13.2.2.4), sent directly over the transport.
    async fn send_ack(&self, invite: &Request, response: &Response, destination: SocketAddr) {
        let mut ack = Request::new(Method::Ack, invite.uri.clone());
        if let Some(via) = invite.header("Via") {
            ack.headers.push(Header::new("Via", via.to_string()));
        }
        if let Some(from) = invite.header("From") {
            ack.headers.push(Header::new("From", from.to_string()));
        }
        let to = response.header("To").or_else(|| invite.header("To")).unwrap_or_default();
        ack.headers.push(Header::new("To", to.to_string()));
        if let Some(call_id) = invite.header("Call-ID") {
            ack.headers.push(Header::new("Call-ID", call_id.to_string()));
        }
        if let Some(cseq) = invite.cseq() {
            ack.headers.push(Header::new("CSeq", format!("{} ACK", cseq.seq)));
        }
        ack.headers.push(Header::new("Max-Forwards", "70"));
        ack.headers.push(Header::new("Content-Length", "0"));
        if let Err(err) = self.transport.send_message(Message::Request(ack), destination).await {
            warn!(%err, "failed to send ACK for INVITE 200 OK");
        }
    }

    /// Tears a stream down on an inbound BYE: closes the media-server port
    /// and removes it from the table. Idempotent if the stream is already
    /// gone.
    pub async fn terminate(&self, key: &StreamKey) {
        if let Some(stream) = self.table.remove(key) {
            let _ = self.media.close_receive_port(stream.rtp_port).await;
            self.ports.release(stream.rtp_port);
            info!(%key, "stream terminated");
        }
    }

    /// Sends a BYE toward a device to tear down a stale stream found by the sweep.
    async fn send_bye(&self, stream: &Stream, device_id: &str, region_host: &str, destination: SocketAddr) -> Result<()> {
        let mut request = Request::new(Method::Bye, Uri::sip(device_id, region_host, None));
        let branch = generate_branch();
        request.headers.push(Header::new(
            "Via",
            format!("SIP/2.0/UDP {};branch={}", destination_via_host(self.local_ip), branch),
        ));
        request.headers.push(Header::new("From", format!("<sip:{}@{}>;tag={}", self.server_id, region_host, branch)));
        request.headers.push(Header::new("To", format!("<sip:{}@{}>", device_id, region_host)));
        request.headers.push(Header::new("Call-ID", stream.call_id.clone()));
        request.headers.push(Header::new("CSeq", format!("{} BYE", self.next_cseq())));
        request.headers.push(Header::new("Max-Forwards", "70"));
        request.headers.push(Header::new("Content-Length", "0"));

        let transaction = self.transactions.create_client(request, destination).await?;
        let _ = transaction.await_response(Duration::from_secs(10)).await;
        Ok(())
    }

    /// Reaps idle streams and expired recording files. Spawned once as a
    /// ticking background task; `resolve` maps a device id back to the
    /// socket address to BYE (the registrar's device registry, typically).
    pub fn spawn_sweep(
        self: &Arc<Self>,
        resolve: impl Fn(&str) -> Option<SocketAddr> + Send + Sync + 'static,
        region_host: String,
    ) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                coordinator.sweep_idle_streams(&resolve, &region_host).await;
                if let Err(err) = sweep_recordings(&coordinator.record) {
                    warn!(%err, "recording expiry sweep failed");
                }
            }
        })
    }

    async fn sweep_idle_streams(&self, resolve: &(impl Fn(&str) -> Option<SocketAddr> + Send + Sync), region_host: &str) {
        let now = now_unix();
        let idle = self
            .table
            .all()
            .into_iter()
            .filter(|s| s.is_idle(now, IDLE_THRESHOLD.as_secs() as i64))
            .collect::<Vec<_>>();
        for stream in idle {
            let Some(destination) = resolve(&stream.key.device_id) else {
                warn!(device_id = %stream.key.device_id, "cannot BYE idle stream: device has no known address");
                continue;
            };
            info!(key = %stream.key, "reaping idle stream");
            if let Err(err) = self.send_bye(&stream, &stream.key.device_id, region_host, destination).await {
                warn!(%err, "failed to send BYE for idle stream");
            }
            self.terminate(&stream.key).await;
        }
    }
}

fn destination_via_host(ip: IpAddr) -> String {
    ip.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_client::MediaStreamInfo;
    use async_trait::async_trait;
    use gb28181_sip_transport::{Result as TransportResult, TransportEvent};
    use tokio::sync::mpsc;

    #[derive(Debug)]
    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        fn local_addr(&self) -> TransportResult<SocketAddr> {
            Ok("127.0.0.1:5060".parse().unwrap())
        }
        async fn send_message(&self, _message: Message, _destination: SocketAddr) -> TransportResult<()> {
            Ok(())
        }
        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }
        fn is_closed(&self) -> bool {
            false
        }
    }

    struct StubMedia;

    #[async_trait]
    impl MediaServerClient for StubMedia {
        async fn open_receive_port(&self, req: OpenPortRequest) -> Result<crate::media_client::OpenPortResponse> {
            Ok(crate::media_client::OpenPortResponse { port: req.port, ssrc_accepted: true })
        }
        async fn close_receive_port(&self, _port: u16) -> Result<()> {
            Ok(())
        }
        async fn list_streams(&self) -> Result<Vec<MediaStreamInfo>> {
            Ok(Vec::new())
        }
        async fn close_stream(&self, _stream_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn coordinator() -> Arc<SessionCoordinator> {
        let (_tx, _rx) = mpsc::channel::<TransportEvent>(1);
        let transport: Arc<dyn Transport> = Arc::new(NullTransport);
        let transactions = TransactionManager::new(transport.clone());
        SessionCoordinator::new(
            transport,
            transactions,
            Arc::new(StubMedia),
            RecordConfig::default(),
            "127.0.0.1".parse().unwrap(),
            "34020000002000000001",
        )
    }

    #[tokio::test(start_paused = true)]
    async fn play_fails_when_device_never_answers() {
        let coordinator = coordinator();
        let destination: SocketAddr = "10.0.0.5:5060".parse().unwrap();
        let result = coordinator
            .play("34020000001320000001", "34020000001320000002", "3402000000", destination, PlayMode::Live, None)
            .await;
        assert!(result.is_err());
        assert!(coordinator.table().is_empty());
    }
}
