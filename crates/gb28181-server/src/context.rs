//! The top-level `Server`: owns every registry, the transport, and the
//! media session coordinator, and threads them into the dispatcher's
//! handlers instead of reaching for a global.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::info;

use gb28181_infra_common::Config;
use gb28181_registrar_core::{handle_message, handle_register, DeviceRegistry, RegistrarContext, WebhookClient};
use gb28181_registrar_core::repository::NullRepository;
use gb28181_sip_core::Method;
use gb28181_sip_transport::{bind_udp, resolve_self_ip, Transport};
use gb28181_session_core::{handle_bye, HttpMediaServerClient, SessionCoordinator};
use gb28181_transaction_core::Dispatcher;

pub struct Server {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    registrar: Arc<RegistrarContext>,
    coordinator: Arc<SessionCoordinator>,
    events: tokio::sync::mpsc::Receiver<gb28181_sip_transport::TransportEvent>,
    transport: Arc<dyn Transport>,
}

impl Server {
    pub async fn bind(config: Config) -> Result<Self> {
        let (transport, events) = bind_udp(config.udp).await.context("binding SIP UDP transport")?;
        let transport: Arc<dyn Transport> = Arc::new(transport);

        let registry = DeviceRegistry::new(Arc::new(NullRepository));
        registry.rehydrate().await;
        let webhook = WebhookClient::new(config.notify_map.clone());
        let registrar = RegistrarContext::new(registry, webhook, config.gb28181.region.clone(), config.secret.clone());

        let local_ip = resolve_self_ip().unwrap_or_else(|_| "0.0.0.0".parse().unwrap());
        let media_client = Arc::new(HttpMediaServerClient::new(config.media.restful.clone(), config.media.secret.clone()));
        let mut dispatcher = Dispatcher::new(transport.clone());
        let coordinator = SessionCoordinator::new(
            transport.clone(),
            dispatcher.manager(),
            media_client,
            config.record.clone(),
            local_ip,
            config.gb28181.lid.clone(),
        );

        {
            let ctx = registrar.clone();
            dispatcher.register(Method::Register, move |req, tx| {
                let ctx = ctx.clone();
                async move { handle_register(&ctx, req, tx).await }
            });
        }
        {
            let ctx = registrar.clone();
            dispatcher.register(Method::Message, move |req, tx| {
                let ctx = ctx.clone();
                async move { handle_message(&ctx, req, tx).await }
            });
        }
        {
            let coordinator = coordinator.clone();
            dispatcher.register(Method::Bye, move |req, tx| {
                let coordinator = coordinator.clone();
                async move { handle_bye(&coordinator, req, tx).await }
            });
        }

        Ok(Server {
            config,
            dispatcher: Arc::new(dispatcher),
            registrar,
            coordinator,
            events,
            transport,
        })
    }

    /// Runs the dispatcher read loop and the coordinator's sweep task until
    /// the transport is closed or the process receives SIGINT.
    pub async fn run(self) -> Result<()> {
        let registrar = self.registrar.clone();
        let resolve = move |device_id: &str| -> Option<SocketAddr> { registrar.registry.get(device_id).map(|d| d.source) };
        let region_host = self.config.gb28181.region.clone();
        let _sweep = self.coordinator.spawn_sweep(resolve, region_host);
        let _nonce_sweep = self.registrar.spawn_nonce_sweep();

        info!(udp = %self.config.udp, mode = %self.config.r#mod, "gb28181-server ready");
        let transport = self.transport.clone();
        let manager = self.dispatcher.manager();
        tokio::select! {
            _ = self.dispatcher.run(self.events) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, closing transport");
                let _ = transport.close().await;
                manager.cancel_all().await;
            }
        }
        Ok(())
    }
}
