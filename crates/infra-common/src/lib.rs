/*!
# gb28181-infra-common

Shared horizontal layer for the GB28181 signaling stack: configuration
loading and structured logging setup.
*/

pub mod config;
pub mod errors;
pub mod logging;

pub use config::Config;
pub use errors::{Error, Result};
pub use logging::{setup_logging, LoggingConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn it_works() {
        assert_eq!(2 + 2, 4);
    }
}
