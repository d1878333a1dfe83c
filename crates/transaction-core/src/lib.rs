//! SIP transaction layer for the GB28181 signaling stack.
//!
//! Collapses RFC 3261's four transaction state machines into one
//! `Transaction` type distinguished by a `Role` (client/server), since
//! GB28181 traffic never forks and never needs transport failover. The
//! [`Dispatcher`] owns the read loop and routes inbound requests to
//! per-method handlers; the [`TransactionManager`] owns the transaction
//! table those handlers and the dispatcher share.

pub mod dispatcher;
pub mod error;
pub mod key;
pub mod manager;
pub mod state;
pub mod timer;
pub mod transaction;

pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use key::TransactionKey;
pub use manager::TransactionManager;
pub use state::{Role, TransactionState};
pub use transaction::Transaction;

pub mod prelude {
    pub use crate::dispatcher::Dispatcher;
    pub use crate::error::{Error, Result};
    pub use crate::key::TransactionKey;
    pub use crate::manager::TransactionManager;
    pub use crate::state::{Role, TransactionState};
    pub use crate::transaction::Transaction;
}
