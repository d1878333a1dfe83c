use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing Authorization header")]
    Unauthorized,

    #[error("digest response mismatch")]
    DigestMismatch,

    #[error("nonce is unknown, expired, or already used")]
    InvalidNonce,

    #[error("source {0} is temporarily blacklisted after repeated auth failures")]
    Blacklisted(std::net::SocketAddr),

    #[error("malformed MANSCDP body: {0}")]
    Xml(String),

    #[error("sip error: {0}")]
    Sip(#[from] gb28181_sip_core::Error),

    #[error("transaction error: {0}")]
    Transaction(#[from] gb28181_transaction_core::Error),

    #[error("repository error: {0}")]
    Repository(String),
}
