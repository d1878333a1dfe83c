use thiserror::Error;

/// The error type shared by every crate that doesn't define its own
/// (narrower) error enum: configuration and bootstrapping failures that
/// happen before any protocol-specific machinery is even running.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, Error>;
