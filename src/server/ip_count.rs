// IP address connection counter

use std::{collections::HashMap, net::IpAddr};

use super::RelayConfiguration;

/// IP connection counter
pub struct IpConnectionCounter {
    /// Limit per IP address
    limit: usize,

    /// Counters map
    counters: HashMap<IpAddr, usize>,
}

impl IpConnectionCounter {
    /// Creates new IpConnectionCounter
    pub fn new(config: &RelayConfiguration) -> IpConnectionCounter {
        IpConnectionCounter {
            limit: config.max_concurrent_connections_per_ip as usize,
            counters: HashMap::new(),
        }
    }

    /// Adds an IP address, trying to fit it into the limit.
    /// Returns true if accepted, false if rejected.
    pub fn add(&mut self, ip: &IpAddr) -> bool {
        let count = self.counters.entry(*ip).or_insert(0);

        if *count >= self.limit {
            return false;
        }

        *count += 1;

        true
    }

    /// Removes an IP address
    pub fn remove(&mut self, ip: &IpAddr) {
        if let Some(count) = self.counters.get_mut(ip) {
            if *count > 1 {
                *count -= 1;
            } else {
                self.counters.remove(ip);
            }
        }
    }
}

// Tests
