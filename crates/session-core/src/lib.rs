//! Media session coordination for the GB28181 signaling stack.
//!
//! Turns an internal `play(device, channel, mode)` call into an INVITE
//! toward a device, tracks the resulting stream's lifecycle against an
//! external media server, and reaps idle streams and expired recordings
//! on a periodic sweep.

pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod media_client;
pub mod ports;
pub mod recordings;
pub mod ssrc;
pub mod stream;
pub mod table;

pub use coordinator::SessionCoordinator;
pub use error::{Error, Result};
pub use handlers::handle_bye;
pub use media_client::{HttpMediaServerClient, MediaServerClient};
pub use stream::{Stream, StreamKey, StreamState};
pub use table::StreamTable;
