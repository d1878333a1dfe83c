//! The MESSAGE handler: keepalive, catalog, and everything else that
//! rides over `MANSCDP+xml`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use gb28181_sip_core::{Request, Response, StatusCode};
use gb28181_transaction_core::Transaction;

use crate::channel::Channel;
use crate::context::RegistrarContext;
use crate::manscdp::{self, ManscdpMessage};
use crate::webhook::WebhookEvent;

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Always responds 200 OK promptly and does the state update/webhook
/// asynchronously from there, so a slow persistence write or webhook POST
/// never delays the SIP response.
pub async fn handle_message(ctx: &Arc<RegistrarContext>, request: Request, _transaction: Arc<Transaction>) -> Response {
    let body = match std::str::from_utf8(&request.body) {
        Ok(body) => body,
        Err(err) => {
            warn!(%err, "MESSAGE body is not valid UTF-8");
            return Response::for_request(&request, StatusCode::OK, "OK");
        }
    };

    match manscdp::parse(body) {
        Ok(ManscdpMessage::Keepalive(keepalive)) => {
            let online = keepalive.status.eq_ignore_ascii_case("OK");
            if online {
                if let Some(mut device) = ctx.registry.get(&keepalive.device_id) {
                    device.touch(now_unix());
                    if let Some(source) = request.source {
                        device.source = source;
                    }
                    ctx.registry.upsert(device);
                }
            } else {
                ctx.registry.mark_offline(&keepalive.device_id);
            }
            ctx.webhook.notify(WebhookEvent {
                event: "devices.active".to_string(),
                device_id: Some(keepalive.device_id.clone()),
                channel_id: None,
                status: keepalive.status.clone(),
                at: now_unix(),
            });
        }
        Ok(ManscdpMessage::Catalog(catalog)) => {
            let channels: Vec<Channel> = catalog
                .device_list
                .items
                .into_iter()
                .map(|item| Channel {
                    channel_id: item.device_id,
                    parent_device_id: catalog.device_id.clone(),
                    name: item.name,
                    manufacturer: item.manufacturer,
                    status: item.status,
                })
                .collect();
            info!(parent = %catalog.device_id, count = channels.len(), "catalog response received");
            ctx.registry.upsert_channels(&catalog.device_id, channels);
            ctx.webhook.notify(WebhookEvent {
                event: "channels.inventory".to_string(),
                device_id: Some(catalog.device_id),
                channel_id: None,
                status: "updated".to_string(),
                at: now_unix(),
            });
        }
        Ok(ManscdpMessage::Unknown { cmd_type, raw }) => {
            ctx.webhook.notify(WebhookEvent {
                event: cmd_type.to_lowercase(),
                device_id: None,
                channel_id: None,
                status: raw,
                at: now_unix(),
            });
        }
        Err(err) => {
            warn!(%err, "failed to parse MANSCDP body");
        }
    }

    Response::for_request(&request, StatusCode::OK, "OK")
}
