use std::sync::Arc;
use std::time::Duration;

use crate::blacklist::Blacklist;
use crate::digest::NonceTracker;
use crate::registry::DeviceRegistry;
use crate::webhook::WebhookClient;

/// Cadence of the expired-nonce reaper.
const NONCE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Everything the REGISTER and MESSAGE handlers need, threaded through
/// construction rather than reached via a global.
pub struct RegistrarContext {
    pub registry: Arc<DeviceRegistry>,
    pub blacklist: Blacklist,
    pub nonces: NonceTracker,
    pub webhook: WebhookClient,
    /// Digest realm, the 10-digit region code (`gb28181.region`).
    pub realm: String,
    /// Shared secret for digest auth; empty disables auth entirely.
    pub secret: String,
}

impl RegistrarContext {
    pub fn new(registry: Arc<DeviceRegistry>, webhook: WebhookClient, realm: String, secret: String) -> Arc<Self> {
        Arc::new(RegistrarContext {
            registry,
            blacklist: Blacklist::new(),
            nonces: NonceTracker::new(),
            webhook,
            realm,
            secret,
        })
    }

    pub fn auth_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Periodically drops nonces issued more than their TTL ago and never
    /// consumed, so a flood of abandoned challenges doesn't grow the nonce
    /// map without bound.
    pub fn spawn_nonce_sweep(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let ctx = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(NONCE_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                ctx.nonces.sweep_expired();
            }
        })
    }
}
