use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use gb28181_sip_core::{Message, Request, Response};
use gb28181_sip_transport::Transport;

use crate::error::{Error, Result};
use crate::key::TransactionKey;
use crate::manager::TransactionManager;
use crate::state::{Role, TransactionState};
use crate::timer;

const RESPONSE_CHANNEL_CAPACITY: usize = 16;

struct Inner {
    state: TransactionState,
    last_request: Option<Request>,
    last_response: Option<Response>,
    timer_handle: Option<JoinHandle<()>>,
}

/// A single SIP transaction: the correlation unit between a request and
/// its final response. Owns its own retransmit timer and a broadcast
/// channel so one or more `await_response` callers are woken on arrival.
///
/// The transaction manager exclusively owns these; handlers only ever see
/// an `Arc<Transaction>` and never hold a reference that outlives it.
pub struct Transaction {
    pub key: TransactionKey,
    pub role: Role,
    pub destination: SocketAddr,
    transport: Arc<dyn Transport>,
    manager: Weak<TransactionManager>,
    inner: AsyncMutex<Inner>,
    response_tx: broadcast::Sender<Response>,
    canceled: tokio::sync::Notify,
}

impl Transaction {
    pub(crate) fn new_server(
        key: TransactionKey,
        transport: Arc<dyn Transport>,
        destination: SocketAddr,
        request: Request,
        manager: Weak<TransactionManager>,
    ) -> Arc<Self> {
        let (response_tx, _) = broadcast::channel(RESPONSE_CHANNEL_CAPACITY);
        Arc::new(Transaction {
            key,
            role: Role::Server,
            destination,
            transport,
            manager,
            inner: AsyncMutex::new(Inner {
                state: TransactionState::Proceeding,
                last_request: Some(request),
                last_response: None,
                timer_handle: None,
            }),
            response_tx,
            canceled: tokio::sync::Notify::new(),
        })
    }

    pub(crate) fn new_client(
        key: TransactionKey,
        transport: Arc<dyn Transport>,
        destination: SocketAddr,
        request: Request,
        manager: Weak<TransactionManager>,
    ) -> Arc<Self> {
        let (response_tx, _) = broadcast::channel(RESPONSE_CHANNEL_CAPACITY);
        Arc::new(Transaction {
            key,
            role: Role::Client,
            destination,
            transport,
            manager,
            inner: AsyncMutex::new(Inner {
                state: TransactionState::Calling,
                last_request: Some(request),
                last_response: None,
                timer_handle: None,
            }),
            response_tx,
            canceled: tokio::sync::Notify::new(),
        })
    }

    pub async fn state(&self) -> TransactionState {
        self.inner.lock().await.state
    }

    pub async fn last_response(&self) -> Option<Response> {
        self.inner.lock().await.last_response.clone()
    }

    pub async fn last_request(&self) -> Option<Request> {
        self.inner.lock().await.last_request.clone()
    }

    /// Server-role: send a response for this transaction. A final response
    /// moves the transaction to `Completed` and schedules its removal
    /// after the retransmit grace period; a provisional response leaves it
    /// in `Proceeding`.
    pub async fn respond(self: &Arc<Self>, response: Response) -> Result<()> {
        self.transport
            .send_message(Message::Response(response.clone()), self.destination)
            .await?;

        let is_final = response.status.is_final();
        {
            let mut inner = self.inner.lock().await;
            inner.last_response = Some(response.clone());
            if is_final {
                inner.state = TransactionState::Completed;
            }
        }

        if is_final {
            self.schedule_completed_grace();
        }
        Ok(())
    }

    /// Called when a retransmitted copy of the original request arrives:
    /// re-sends the last response instead of re-running the handler.
    pub async fn retransmit_last_response(self: &Arc<Self>) {
        let last = self.inner.lock().await.last_response.clone();
        if let Some(response) = last {
            trace!(key = %self.key, "retransmitting last response for duplicate request");
            let _ = self.transport.send_message(Message::Response(response), self.destination).await;
        }
    }

    /// Client-role: starts the transaction's Timer A/B retransmit loop.
    /// Call once, immediately after sending the initial request.
    pub(crate) async fn start_client_timers(self: &Arc<Self>, on_timeout: impl FnOnce() + Send + 'static) {
        let tx = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = timer::T1;
            let deadline = Instant::now() + timer::T1_TIMES_64;
            loop {
                tokio::time::sleep(interval.min(deadline.saturating_duration_since(Instant::now()))).await;
                if Instant::now() >= deadline {
                    let mut inner = tx.inner.lock().await;
                    if inner.state != TransactionState::Completed && inner.state != TransactionState::Terminated {
                        inner.state = TransactionState::Terminated;
                        drop(inner);
                        warn!(key = %tx.key, "transaction timed out (Timer B)");
                        on_timeout();
                    }
                    break;
                }
                let mut inner = tx.inner.lock().await;
                if inner.state != TransactionState::Calling && inner.state != TransactionState::Proceeding {
                    break;
                }
                if let Some(req) = inner.last_request.clone() {
                    drop(inner);
                    trace!(key = %tx.key, "retransmitting request (Timer A)");
                    let _ = tx.transport.send_message(Message::Request(req), tx.destination).await;
                }
                interval = (interval * 2).min(timer::T2);
            }
        });
        self.inner.lock().await.timer_handle = Some(handle);
    }

    /// Client-role: deliver an inbound response to this transaction,
    /// waking any `await_response` callers and advancing state.
    pub async fn receive_response(self: &Arc<Self>, response: Response) {
        let mut inner = self.inner.lock().await;
        if response.status.is_provisional() {
            inner.state = TransactionState::Proceeding;
        } else {
            inner.state = TransactionState::Completed;
        }
        inner.last_response = Some(response.clone());
        if let Some(handle) = inner.timer_handle.take() {
            handle.abort();
        }
        drop(inner);
        let _ = self.response_tx.send(response.clone());
        if response.status.is_final() {
            self.schedule_completed_grace();
        }
    }

    /// Waits for a final response, up to `timeout`. Used by handlers that
    /// need the reply synchronously, e.g. a catalog query or the INVITE a
    /// play request issues.
    pub async fn await_response(self: &Arc<Self>, timeout: Duration) -> Result<Response> {
        if let Some(existing) = self.last_response().await {
            if existing.status.is_final() {
                return Ok(existing);
            }
        }
        if self.state().await == TransactionState::Terminated {
            return Err(Error::Canceled(self.key.to_string()));
        }
        let mut rx = self.response_tx.subscribe();
        let key = self.key.clone();
        match tokio::time::timeout(timeout, async {
            loop {
                tokio::select! {
                    biased;
                    _ = self.canceled.notified() => return Err(Error::Canceled(key.to_string())),
                    received = rx.recv() => match received {
                        Ok(resp) if resp.status.is_final() => return Ok(resp),
                        Ok(_) => continue,
                        Err(_) => return Err(Error::Canceled(key.to_string())),
                    },
                }
            }
        })
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.key.to_string())),
        }
    }

    fn schedule_completed_grace(self: &Arc<Self>) {
        let tx = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timer::COMPLETED_GRACE).await;
            let mut inner = tx.inner.lock().await;
            if inner.state == TransactionState::Completed {
                inner.state = TransactionState::Terminated;
                drop(inner);
                debug!(key = %tx.key, "transaction terminated after completed grace period");
                if let Some(manager) = tx.manager.upgrade() {
                    manager.remove(&tx.key);
                }
            }
        });
    }

    /// Immediately cancels the transaction (process shutdown, or explicit
    /// teardown): any in-flight `await_response` observes `Canceled`.
    pub async fn cancel(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        inner.state = TransactionState::Terminated;
        if let Some(handle) = inner.timer_handle.take() {
            handle.abort();
        }
        drop(inner);
        self.canceled.notify_waiters();
    }
}
