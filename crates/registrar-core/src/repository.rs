//! The persistent-store mirror the device registry writes through to.
//! Deliberately narrow: the store itself (relational or otherwise) is out
//! of core scope; only this interface matters to the signaling layer.
//! Mirrors a `get/insert/update_where/delete/list` shape, specialized per
//! entity instead of a stringly-typed generic CRUD surface.

use async_trait::async_trait;

use crate::channel::Channel;
use crate::device::Device;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository backend error: {0}")]
    Backend(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Implemented by whatever persistent store backs device/channel state.
/// The in-memory registry is authoritative while the process runs; this
/// is a best-effort mirror, consulted only to rehydrate on cold start.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn upsert_device(&self, device: &Device) -> RepositoryResult<()>;
    async fn get_device(&self, device_id: &str) -> RepositoryResult<Option<Device>>;
    async fn delete_device(&self, device_id: &str) -> RepositoryResult<()>;
    async fn list_devices(&self) -> RepositoryResult<Vec<Device>>;

    async fn upsert_channel(&self, channel: &Channel) -> RepositoryResult<()>;
    async fn list_channels(&self, parent_device_id: &str) -> RepositoryResult<Vec<Channel>>;
}

/// An in-memory stand-in used by tests and by deployments that don't
/// need cross-restart persistence.
pub struct NullRepository;

#[async_trait]
impl Repository for NullRepository {
    async fn upsert_device(&self, _device: &Device) -> RepositoryResult<()> {
        Ok(())
    }

    async fn get_device(&self, _device_id: &str) -> RepositoryResult<Option<Device>> {
        Ok(None)
    }

    async fn delete_device(&self, _device_id: &str) -> RepositoryResult<()> {
        Ok(())
    }

    async fn list_devices(&self) -> RepositoryResult<Vec<Device>> {
        Ok(Vec::new())
    }

    async fn upsert_channel(&self, _channel: &Channel) -> RepositoryResult<()> {
        Ok(())
    }

    async fn list_channels(&self, _parent_device_id: &str) -> RepositoryResult<Vec<Channel>> {
        Ok(Vec::new())
    }
}
