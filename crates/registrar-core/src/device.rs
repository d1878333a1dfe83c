use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// A registered device (camera or NVR), keyed by its GB28181 Device ID.
/// `active_at` is a Unix-seconds timestamp; a non-positive value means
/// offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub source: SocketAddr,
    pub registration_uri: String,
    pub active_at: i64,
    pub channel_count: u32,
}

impl Device {
    pub fn is_online(&self) -> bool {
        self.active_at > 0
    }

    pub fn mark_offline(&mut self) {
        self.active_at = 0;
    }

    pub fn touch(&mut self, now: i64) {
        self.active_at = now;
    }
}
