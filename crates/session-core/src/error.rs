use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transaction error: {0}")]
    Transaction(#[from] gb28181_transaction_core::Error),

    #[error("sip error: {0}")]
    Sip(#[from] gb28181_sip_core::Error),

    #[error("no unallocated RTP port left in the configured range")]
    PortsExhausted,

    #[error("unknown stream: {0}")]
    UnknownStream(String),

    #[error("media server request failed: {0}")]
    MediaServer(String),

    #[error("device {0} did not answer the INVITE")]
    NoAnswer(String),
}
