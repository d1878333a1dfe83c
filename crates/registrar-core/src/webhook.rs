//! Fire-and-forget webhook notifications: the `notify` config map holds
//! an event-name → URL mapping, and delivery is best effort: one retry,
//! never blocks the caller.

use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub status: String,
    pub at: i64,
}

/// Dispatches webhook POSTs by event name, looking up the URL in the
/// `notify` map (already `_`→`.`-translated at config-load time).
pub struct WebhookClient {
    client: reqwest::Client,
    urls: std::collections::HashMap<String, String>,
}

impl WebhookClient {
    pub fn new(urls: std::collections::HashMap<String, String>) -> Self {
        WebhookClient {
            client: reqwest::Client::new(),
            urls,
        }
    }

    /// Spawns a detached task that POSTs `event` as JSON to the URL
    /// configured for `event.event`, retrying once on failure. Returns
    /// immediately; callers never await network I/O here.
    pub fn notify(&self, event: WebhookEvent) {
        let Some(url) = self.urls.get(&event.event).cloned() else {
            debug!(event = %event.event, "no webhook configured for event");
            return;
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            for attempt in 0..2 {
                match client.post(&url).json(&event).send().await {
                    Ok(resp) if resp.status().is_success() => return,
                    Ok(resp) => warn!(status = %resp.status(), %url, attempt, "webhook POST returned non-success"),
                    Err(err) => warn!(%err, %url, attempt, "webhook POST failed"),
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_is_a_silent_noop() {
        let client = WebhookClient::new(std::collections::HashMap::new());
        client.notify(WebhookEvent {
            event: "devices.active".to_string(),
            device_id: Some("34020000001320000001".to_string()),
            channel_id: None,
            status: "OK".to_string(),
            at: 1,
        });
    }
}
