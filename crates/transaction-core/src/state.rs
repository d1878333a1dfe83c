use std::fmt;

/// Transaction state. GB28181 traffic never forks and never retries over a
/// different transport, so unlike RFC 3261's four separate state machines
/// (INVITE/non-INVITE × client/server) this collapses to one shape with a
/// role flag distinguishing client- and server-side behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Client role only: request sent, no response yet.
    Calling,
    /// A provisional (1xx) response has been seen/sent, or (server role)
    /// the request has arrived and no final response has been sent yet.
    Proceeding,
    /// A final response has been sent/received; absorbing retransmits.
    Completed,
    /// Dead; removed from the manager's map.
    Terminated,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Which side of the transaction this endpoint is playing. Server role is
/// the primary one here (devices calling in); client role is used when
/// this server originates a request, e.g. an INVITE to a device for play,
/// or a query to the media server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}
