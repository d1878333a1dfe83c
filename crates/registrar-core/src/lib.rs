//! Device/channel registry and GB28181 REGISTER/MESSAGE handlers.
//!
//! Owns the in-memory device registry (mirrored to a [`Repository`]),
//! digest authentication with nonce tracking and auth-failure
//! blacklisting, and the MANSCDP+xml command parser MESSAGE bodies carry.

pub mod blacklist;
pub mod channel;
pub mod context;
pub mod device;
pub mod digest;
pub mod error;
pub mod handlers;
pub mod manscdp;
pub mod registry;
pub mod repository;
pub mod webhook;

pub use channel::Channel;
pub use context::RegistrarContext;
pub use device::Device;
pub use error::{Error, Result};
pub use handlers::{handle_message, handle_register};
pub use registry::DeviceRegistry;
pub use repository::{Repository, RepositoryError, RepositoryResult};
pub use webhook::{WebhookClient, WebhookEvent};
