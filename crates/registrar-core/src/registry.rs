//! In-memory device/channel registry, the authoritative source of truth
//! while the process runs. Mirrors writes to a [`Repository`]
//! asynchronously so persistence failures never block a keepalive's
//! 200 OK.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use crate::channel::Channel;
use crate::device::Device;
use crate::repository::Repository;

pub struct DeviceRegistry {
    devices: DashMap<String, Device>,
    channels: DashMap<String, Vec<Channel>>,
    repository: Arc<dyn Repository>,
}

impl DeviceRegistry {
    pub fn new(repository: Arc<dyn Repository>) -> Arc<Self> {
        Arc::new(DeviceRegistry {
            devices: DashMap::new(),
            channels: DashMap::new(),
            repository,
        })
    }

    /// Rehydrates the in-memory map from the persistent store. Call once
    /// at startup, before the transport starts accepting traffic.
    pub async fn rehydrate(&self) {
        match self.repository.list_devices().await {
            Ok(devices) => {
                for device in devices {
                    self.devices.insert(device.device_id.clone(), device);
                }
            }
            Err(err) => warn!(%err, "failed to rehydrate device registry from store"),
        }
    }

    pub fn get(&self, device_id: &str) -> Option<Device> {
        self.devices.get(device_id).map(|d| d.clone())
    }

    pub fn is_online(&self, device_id: &str) -> bool {
        self.devices.get(device_id).map(|d| d.is_online()).unwrap_or(false)
    }

    /// Upserts a device (REGISTER success, or a keepalive refreshing its
    /// source address) and mirrors the write to the repository.
    pub fn upsert(self: &Arc<Self>, device: Device) {
        self.devices.insert(device.device_id.clone(), device.clone());
        let repo = self.repository.clone();
        tokio::spawn(async move {
            if let Err(err) = repo.upsert_device(&device).await {
                warn!(%err, device_id = %device.device_id, "failed to persist device");
            }
        });
    }

    /// Marks a device offline in memory, without waiting on the mirror
    /// write (same rationale as `upsert`: liveness in memory is
    /// authoritative).
    pub fn mark_offline(self: &Arc<Self>, device_id: &str) {
        if let Some(mut entry) = self.devices.get_mut(device_id) {
            entry.mark_offline();
            let device = entry.clone();
            drop(entry);
            let repo = self.repository.clone();
            tokio::spawn(async move {
                if let Err(err) = repo.upsert_device(&device).await {
                    warn!(%err, device_id = %device.device_id, "failed to persist offline device");
                }
            });
        }
    }

    /// `REGISTER` with `Expires: 0`: deregisters a device, removing it
    /// from the active map entirely. Idempotent.
    pub fn deregister(self: &Arc<Self>, device_id: &str) {
        self.devices.remove(device_id);
        let repo = self.repository.clone();
        let device_id = device_id.to_string();
        tokio::spawn(async move {
            if let Err(err) = repo.delete_device(&device_id).await {
                warn!(%err, %device_id, "failed to delete deregistered device from store");
            }
        });
    }

    /// Upserts the channel list for a device's catalog.
    pub fn upsert_channels(self: &Arc<Self>, parent_device_id: &str, new_channels: Vec<Channel>) {
        if let Some(mut device) = self.devices.get_mut(parent_device_id) {
            device.channel_count = new_channels.len() as u32;
        }
        self.channels.insert(parent_device_id.to_string(), new_channels.clone());
        let repo = self.repository.clone();
        tokio::spawn(async move {
            for channel in &new_channels {
                if let Err(err) = repo.upsert_channel(channel).await {
                    warn!(%err, channel_id = %channel.channel_id, "failed to persist channel");
                }
            }
        });
    }

    pub fn channels_for(&self, parent_device_id: &str) -> Vec<Channel> {
        self.channels.get(parent_device_id).map(|c| c.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::NullRepository;
    use std::net::SocketAddr;

    fn sample_device(id: &str) -> Device {
        Device {
            device_id: id.to_string(),
            source: "10.0.0.1:5060".parse::<SocketAddr>().unwrap(),
            registration_uri: format!("sip:{}@3402000000", id),
            active_at: 1000,
            channel_count: 0,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_roundtrips() {
        let registry = DeviceRegistry::new(Arc::new(NullRepository));
        registry.upsert(sample_device("34020000001320000001"));
        let found = registry.get("34020000001320000001").unwrap();
        assert!(found.is_online());
    }

    #[tokio::test]
    async fn deregister_removes_device() {
        let registry = DeviceRegistry::new(Arc::new(NullRepository));
        registry.upsert(sample_device("34020000001320000002"));
        registry.deregister("34020000001320000002");
        assert!(registry.get("34020000001320000002").is_none());
    }

    #[tokio::test]
    async fn mark_offline_is_visible_immediately() {
        let registry = DeviceRegistry::new(Arc::new(NullRepository));
        registry.upsert(sample_device("34020000001320000003"));
        registry.mark_offline("34020000001320000003");
        assert!(!registry.is_online("34020000001320000003"));
    }
}
