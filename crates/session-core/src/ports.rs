//! RTP receive port allocator.
//!
//! One pool per server, guarded the same way the rest of this stack guards
//! its concurrent maps (a `DashMap`-backed set rather than a mutex'd
//! `HashSet`): allocation and release are single-entry operations, so a
//! lock-free map avoids serializing unrelated streams on each other.

use dashmap::DashSet;

use crate::error::{Error, Result};

/// GB28181 deployments conventionally carve out a few thousand ports above
/// the well-known range for RTP receive; this default is wide enough for a
/// small-to-medium deployment and can be overridden via [`PortPool::new`].
pub const DEFAULT_RANGE: (u16, u16) = (30000, 30500);

/// A fixed range of RTP ports, handed out one per stream and returned when
/// the stream closes.
pub struct PortPool {
    low: u16,
    high: u16,
    in_use: DashSet<u16>,
}

impl PortPool {
    pub fn new(low: u16, high: u16) -> Self {
        PortPool {
            low,
            high,
            in_use: DashSet::new(),
        }
    }

    /// Reserves the lowest free port in the range.
    pub fn allocate(&self) -> Result<u16> {
        for port in self.low..=self.high {
            if self.in_use.insert(port) {
                return Ok(port);
            }
        }
        Err(Error::PortsExhausted)
    }

    pub fn release(&self, port: u16) {
        self.in_use.remove(&port);
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use.len()
    }
}

impl Default for PortPool {
    fn default() -> Self {
        PortPool::new(DEFAULT_RANGE.0, DEFAULT_RANGE.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_distinct_ports_until_exhausted() {
        let pool = PortPool::new(30000, 30001);
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        assert_ne!(a, b);
        assert!(pool.allocate().is_err());
    }

    #[test]
    fn released_port_is_reusable() {
        let pool = PortPool::new(30000, 30000);
        let port = pool.allocate().unwrap();
        pool.release(port);
        assert_eq!(pool.allocate().unwrap(), port);
    }
}
