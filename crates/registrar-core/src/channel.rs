use serde::{Deserialize, Serialize};

/// A sub-channel of a Device, refreshed from catalog query responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: String,
    pub parent_device_id: String,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub status: Option<String>,
}
