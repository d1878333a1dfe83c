use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, warn};

use gb28181_sip_core::{Method, Request, Response, StatusCode};
use gb28181_sip_transport::{Transport, TransportEvent};

use crate::manager::TransactionManager;
use crate::transaction::Transaction;

/// A request handler: given the inbound request and its transaction,
/// produces the response to send (or returns an error to be turned into a
/// 500). Handlers run on their own spawned task so one slow handler (a
/// catalog query waiting on an INVITE, say) never stalls the read loop.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;
pub type Handler = Arc<dyn Fn(Request, Arc<Transaction>) -> HandlerFuture + Send + Sync>;

/// Routes inbound SIP messages to per-method handlers, creating or
/// reusing transactions as it goes. Unknown methods get a 405 with
/// an accurate `Allow` header instead of being silently dropped; ACKs are
/// absorbed into their INVITE transaction rather than dispatched at all.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    manager: Arc<TransactionManager>,
    handlers: HashMap<Method, Handler>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let manager = TransactionManager::new(transport.clone());
        Dispatcher {
            transport,
            manager,
            handlers: HashMap::new(),
        }
    }

    pub fn manager(&self) -> Arc<TransactionManager> {
        self.manager.clone()
    }

    /// Registers the handler for `method`. Call once per method the
    /// server supports (REGISTER, MESSAGE, INVITE, BYE); any method not
    /// registered here gets a 405 Method Not Allowed.
    pub fn register<F, Fut>(&mut self, method: Method, handler: F)
    where
        F: Fn(Request, Arc<Transaction>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |req, tx| Box::pin(handler(req, tx)));
        self.handlers.insert(method, handler);
    }

    fn allow_header(&self) -> String {
        self.handlers
            .keys()
            .map(|m| m.as_str().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Drains the transport's event channel forever, dispatching each
    /// inbound request/response. Intended to be spawned as the server's
    /// main read-loop task.
    pub async fn run(self: Arc<Self>, mut events: Receiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::MessageReceived {
                    message: gb28181_sip_core::Message::Request(request),
                    source,
                    ..
                } => {
                    let dispatcher = self.clone();
                    tokio::spawn(async move {
                        dispatcher.dispatch_request(request, source).await;
                    });
                }
                TransportEvent::MessageReceived {
                    message: gb28181_sip_core::Message::Response(response),
                    ..
                } => {
                    self.manager.route_response(response).await;
                }
                TransportEvent::ParseError { error, source } => {
                    warn!(%error, %source, "dropping unparseable datagram");
                }
                TransportEvent::Closed => {
                    debug!("transport closed, stopping dispatcher");
                    break;
                }
            }
        }
    }

    async fn dispatch_request(self: Arc<Self>, request: Request, source: SocketAddr) {
        if request.method == Method::Ack {
            if let Some(transaction) = self.manager.find_for_ack(&request) {
                debug!(key = %transaction.key, "absorbed ACK into existing transaction");
            } else {
                debug!("dropping ACK with no matching transaction");
            }
            return;
        }

        if let Err(err) = request.validate_mandatory_headers() {
            warn!(%err, "rejecting request missing mandatory headers");
            return;
        }

        let (transaction, is_new) = match self.manager.get_or_create_server(&request, source) {
            Ok(pair) => pair,
            Err(err) => {
                error!(%err, "failed to create transaction for inbound request");
                return;
            }
        };

        if !is_new {
            transaction.retransmit_last_response().await;
            return;
        }

        let response = match self.handlers.get(&request.method) {
            Some(handler) => handler(request.clone(), transaction.clone()).await,
            None => {
                let mut resp = Response::for_request(&request, StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
                resp.set_header("Allow", self.allow_header());
                resp
            }
        };

        if let Err(err) = transaction.respond(response).await {
            error!(%err, "failed to send response");
        }
    }
}
