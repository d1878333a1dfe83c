use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the transaction layer to its callers (handlers and
/// the dispatcher). Parse/routing/auth errors live in the codec and
/// handler layers respectively; this enum is specifically what can go
/// wrong while correlating and driving a transaction.
#[derive(Debug, Error)]
pub enum Error {
    /// `await_response` ran past its deadline without a final response.
    #[error("transaction {0} timed out waiting for a response")]
    Timeout(String),

    /// The transaction was torn down (Timer B fired, or the process is
    /// shutting down) while a caller was still awaiting it.
    #[error("transaction {0} was canceled")]
    Canceled(String),

    /// Transport-level send failure, surfaced from the underlying socket.
    #[error("transport error: {0}")]
    Transport(#[from] gb28181_sip_transport::Error),

    /// The request lacked a `Via` header, so no transaction key could be
    /// computed for it.
    #[error("request is missing a Via header")]
    MissingVia,

    #[error("sip error: {0}")]
    Sip(#[from] gb28181_sip_core::Error),
}
