use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::{debug, trace};

use gb28181_sip_core::{Message, Method, Request};
use gb28181_sip_transport::Transport;

use crate::error::Result;
use crate::key::TransactionKey;
use crate::transaction::Transaction;

/// Owns every live transaction, keyed by branch+method. One manager per
/// transport; a single `DashMap` rather than a mutex-wrapped `HashMap`,
/// since every inbound retransmit does a lookup here before anything
/// else runs.
pub struct TransactionManager {
    transport: Arc<dyn Transport>,
    transactions: DashMap<TransactionKey, Arc<Transaction>>,
    self_weak: Weak<TransactionManager>,
}

impl TransactionManager {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new_cyclic(|weak| TransactionManager {
            transport,
            transactions: DashMap::new(),
            self_weak: weak.clone(),
        })
    }

    pub fn get(&self, key: &TransactionKey) -> Option<Arc<Transaction>> {
        self.transactions.get(key).map(|entry| entry.clone())
    }

    /// ACK to a non-2xx INVITE response shares the INVITE transaction's
    /// branch but is its own method token; route it by branch alone so it
    /// lands back on that transaction instead of spawning a new one.
    pub fn find_by_branch(&self, branch: &str) -> Option<Arc<Transaction>> {
        self.transactions
            .iter()
            .find(|entry| entry.key().branch == branch)
            .map(|entry| entry.value().clone())
    }

    /// Server role: look up the transaction for an inbound request, or
    /// create one if this is the first time we've seen this branch+method.
    /// Returns `(transaction, is_new)` so the caller knows whether to
    /// invoke the handler or just retransmit the last response.
    pub fn get_or_create_server(&self, request: &Request, source: SocketAddr) -> Result<(Arc<Transaction>, bool)> {
        let key = TransactionKey::for_message(&Message::Request(request.clone()))?;
        if let Some(existing) = self.get(&key) {
            return Ok((existing, false));
        }
        let transaction = Transaction::new_server(key.clone(), self.transport.clone(), source, request.clone(), self.self_weak.clone());
        self.transactions.insert(key, transaction.clone());
        Ok((transaction, true))
    }

    /// Client role: create a new outbound transaction and start its
    /// retransmit timer. `destination` is the device/peer to send to.
    pub async fn create_client(self: &Arc<Self>, request: Request, destination: SocketAddr) -> Result<Arc<Transaction>> {
        let key = TransactionKey::for_message(&Message::Request(request.clone()))?;
        let transaction = Transaction::new_client(key.clone(), self.transport.clone(), destination, request.clone(), self.self_weak.clone());
        self.transactions.insert(key.clone(), transaction.clone());

        self.transport.send_message(Message::Request(request), destination).await?;

        let manager = self.clone();
        let timeout_key = key.clone();
        transaction
            .start_client_timers(move || {
                manager.transactions.remove(&timeout_key);
            })
            .await;
        Ok(transaction)
    }

    /// Deliver an inbound response to whichever client transaction it
    /// matches, if any (unsolicited or late responses are dropped).
    pub async fn route_response(&self, response: gb28181_sip_core::Response) {
        let key = match TransactionKey::for_message(&Message::Response(response.clone())) {
            Ok(key) => key,
            Err(err) => {
                trace!(%err, "dropping response with no usable transaction key");
                return;
            }
        };
        if let Some(transaction) = self.get(&key) {
            transaction.receive_response(response).await;
        } else {
            trace!(%key, "no matching transaction for inbound response");
        }
    }

    /// Removes a terminated transaction from the map. Handlers don't need
    /// to call this directly; it's invoked by the completed-grace and
    /// timeout paths.
    pub fn remove(&self, key: &TransactionKey) {
        if self.transactions.remove(key).is_some() {
            debug!(%key, "removed transaction");
        }
    }

    /// Finds the existing INVITE transaction for an ACK, preferring an
    /// exact key match and falling back to branch-only lookup so ACKs to
    /// non-2xx final responses are absorbed rather than orphaned.
    pub fn find_for_ack(&self, request: &Request) -> Option<Arc<Transaction>> {
        if request.method != Method::Ack {
            return None;
        }
        let key = TransactionKey::for_message(&Message::Request(request.clone())).ok()?;
        self.get(&key).or_else(|| self.find_by_branch(&key.branch))
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Cancels every live transaction and drops it from the map. Called on
    /// process shutdown so any handler blocked in `await_response` observes
    /// `Canceled` instead of hanging until the process actually exits.
    pub async fn cancel_all(&self) {
        let keys: Vec<TransactionKey> = self.transactions.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            if let Some(transaction) = self.get(&key) {
                transaction.cancel().await;
            }
            self.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gb28181_sip_core::{Header, Method};
    use gb28181_sip_transport::TransportEvent;
    use tokio::sync::mpsc;

    #[derive(Debug)]
    struct NullTransport {
        addr: SocketAddr,
    }

    #[async_trait]
    impl Transport for NullTransport {
        fn local_addr(&self) -> gb28181_sip_transport::Result<SocketAddr> {
            Ok(self.addr)
        }
        async fn send_message(&self, _message: Message, _destination: SocketAddr) -> gb28181_sip_transport::Result<()> {
            Ok(())
        }
        async fn close(&self) -> gb28181_sip_transport::Result<()> {
            Ok(())
        }
        fn is_closed(&self) -> bool {
            false
        }
    }

    fn make_request(branch: &str) -> Request {
        let mut req = Request::new(Method::Register, "sip:34020000001320000001@3402000000".parse().unwrap());
        req.headers.push(Header::new("Via", format!("SIP/2.0/UDP 1.2.3.4:5060;branch={}", branch)));
        req.headers.push(Header::new("CSeq", "1 REGISTER"));
        req
    }

    fn manager() -> Arc<TransactionManager> {
        let (_tx, _rx) = mpsc::channel::<TransportEvent>(1);
        let transport: Arc<dyn Transport> = Arc::new(NullTransport { addr: "127.0.0.1:5060".parse().unwrap() });
        TransactionManager::new(transport)
    }

    #[tokio::test]
    async fn reuses_existing_transaction_for_same_branch_and_method() {
        let mgr = manager();
        let source: SocketAddr = "10.0.0.5:5060".parse().unwrap();
        let req = make_request("z9hG4bK-abc");
        let (t1, is_new1) = mgr.get_or_create_server(&req, source).unwrap();
        let (t2, is_new2) = mgr.get_or_create_server(&req, source).unwrap();
        assert!(is_new1);
        assert!(!is_new2);
        assert!(Arc::ptr_eq(&t1, &t2));
    }

    #[tokio::test]
    async fn different_branches_create_distinct_transactions() {
        let mgr = manager();
        let source: SocketAddr = "10.0.0.5:5060".parse().unwrap();
        let (t1, _) = mgr.get_or_create_server(&make_request("z9hG4bK-one"), source).unwrap();
        let (t2, _) = mgr.get_or_create_server(&make_request("z9hG4bK-two"), source).unwrap();
        assert!(!Arc::ptr_eq(&t1, &t2));
        assert_eq!(mgr.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_server_transaction_is_removed_after_grace_period() {
        use gb28181_sip_core::{Response, StatusCode};

        let mgr = manager();
        let source: SocketAddr = "10.0.0.5:5060".parse().unwrap();
        let req = make_request("z9hG4bK-grace");
        let (transaction, _) = mgr.get_or_create_server(&req, source).unwrap();
        assert_eq!(mgr.len(), 1);

        transaction.respond(Response::for_request(&req, StatusCode::OK, "OK")).await.unwrap();
        assert_eq!(mgr.len(), 1, "still within the completed-grace window");

        tokio::time::advance(crate::timer::COMPLETED_GRACE + std::time::Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(mgr.len(), 0, "transaction should be removed once the grace period elapses");
    }

    #[tokio::test]
    async fn cancel_all_empties_the_map() {
        let mgr = manager();
        let source: SocketAddr = "10.0.0.5:5060".parse().unwrap();
        mgr.get_or_create_server(&make_request("z9hG4bK-a"), source).unwrap();
        mgr.get_or_create_server(&make_request("z9hG4bK-b"), source).unwrap();
        assert_eq!(mgr.len(), 2);

        mgr.cancel_all().await;
        assert!(mgr.is_empty());
    }
}
