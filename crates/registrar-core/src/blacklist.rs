//! Auth failure tracking: three consecutive digest failures from one
//! source within 60 seconds earn that source a 5-minute blacklist.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

const FAILURE_WINDOW: Duration = Duration::from_secs(60);
const FAILURE_THRESHOLD: u32 = 3;
const BLACKLIST_DURATION: Duration = Duration::from_secs(5 * 60);

struct FailureRecord {
    count: u32,
    window_started: Instant,
}

pub struct Blacklist {
    failures: DashMap<SocketAddr, FailureRecord>,
    blacklisted: DashMap<SocketAddr, Instant>,
}

impl Blacklist {
    pub fn new() -> Self {
        Blacklist {
            failures: DashMap::new(),
            blacklisted: DashMap::new(),
        }
    }

    /// `true` if `source` is currently blacklisted. Expired entries are
    /// cleared as a side effect of the check.
    pub fn is_blacklisted(&self, source: SocketAddr) -> bool {
        match self.blacklisted.get(&source) {
            Some(since) if since.elapsed() < BLACKLIST_DURATION => true,
            Some(_) => {
                self.blacklisted.remove(&source);
                false
            }
            None => false,
        }
    }

    /// Records an auth failure from `source`, blacklisting it once the
    /// threshold is hit within the rolling window.
    pub fn record_failure(&self, source: SocketAddr) {
        let mut entry = self
            .failures
            .entry(source)
            .or_insert_with(|| FailureRecord {
                count: 0,
                window_started: Instant::now(),
            });

        if entry.window_started.elapsed() > FAILURE_WINDOW {
            entry.count = 0;
            entry.window_started = Instant::now();
        }
        entry.count += 1;

        if entry.count >= FAILURE_THRESHOLD {
            self.blacklisted.insert(source, Instant::now());
            drop(entry);
            self.failures.remove(&source);
        }
    }

    /// Clears the failure counter for `source` after a successful auth.
    pub fn record_success(&self, source: SocketAddr) {
        self.failures.remove(&source);
    }
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklists_after_three_failures() {
        let bl = Blacklist::new();
        let addr: SocketAddr = "10.0.0.1:5060".parse().unwrap();
        assert!(!bl.is_blacklisted(addr));
        bl.record_failure(addr);
        bl.record_failure(addr);
        assert!(!bl.is_blacklisted(addr));
        bl.record_failure(addr);
        assert!(bl.is_blacklisted(addr));
    }

    #[test]
    fn success_clears_failure_count() {
        let bl = Blacklist::new();
        let addr: SocketAddr = "10.0.0.2:5060".parse().unwrap();
        bl.record_failure(addr);
        bl.record_failure(addr);
        bl.record_success(addr);
        bl.record_failure(addr);
        assert!(!bl.is_blacklisted(addr));
    }
}
