use std::time::Duration;

/// Initial retransmit interval for client-role transactions (Timer A).
pub const T1: Duration = Duration::from_millis(500);

/// Retransmit interval cap; Timer A doubles on each retransmit up to T2.
pub const T2: Duration = Duration::from_millis(4000);

/// Transaction timeout (Timer B): `64 * T1`.
pub const T1_TIMES_64: Duration = Duration::from_millis(500 * 64);

/// How long a completed transaction keeps absorbing retransmits before
/// it's removed from the manager.
pub const COMPLETED_GRACE: Duration = Duration::from_secs(32);
