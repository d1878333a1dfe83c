use std::fmt;

use gb28181_sip_core::{Message, Method};

use crate::error::{Error, Result};

/// Identifies a transaction: the top `Via` branch plus the `CSeq` method
/// (or, for ACK, the request method itself: ACK to a non-2xx shares its
/// INVITE transaction's branch but carries its own method token).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    pub branch: String,
    pub method: Method,
}

impl TransactionKey {
    pub fn new(branch: impl Into<String>, method: Method) -> Self {
        TransactionKey {
            branch: branch.into(),
            method,
        }
    }

    /// Computes the key for an inbound or outbound message.
    pub fn for_message(message: &Message) -> Result<TransactionKey> {
        let via = message.top_via().ok_or(Error::MissingVia)?;
        let branch = via.branch().ok_or(Error::MissingVia)?.to_string();
        let method = match message {
            Message::Request(req) if req.method == Method::Ack => Method::Ack,
            Message::Request(req) => req.method.clone(),
            Message::Response(resp) => resp.cseq().map(|c| c.method).unwrap_or(Method::Extension("?".into())),
        };
        Ok(TransactionKey::new(branch, method))
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.branch, self.method)
    }
}
