// Utility to check IP ranges

use std::{net::IpAddr, str::FromStr};

use ipnet::IpNet;

/// IP range configuration
/// Represents a list of IP addresses and CIDR ranges
#[derive(Clone)]
pub struct IpRangeConfig {
    all: bool,

    ips: Vec<IpAddr>,
    ranges: Vec<IpNet>,
}

impl IpRangeConfig {
    /// Creates IP range config from string
    ///
    /// # Arguments
    ///
    /// * `config_str` - Comma separated list of IPs and CIDR ranges. '*' matches everything.
    ///
    /// # Return value
    ///
    /// A result with the config. In case of error, the invalid
    /// range sub-string is provided to indicate the user
    pub fn new_from_string(config_str: &str) -> Result<IpRangeConfig, String> {
        let mut config = IpRangeConfig {
            all: false,
            ips: Vec::new(),
            ranges: Vec::new(),
        };

        if config_str.is_empty() {
            return Ok(config);
        }

        if config_str == "*" {
            config.all = true;
            return Ok(config);
        }

        for range_str in config_str.split(',').map(|s| s.trim()) {
            if let Ok(range) = IpNet::from_str(range_str) {
                config.ranges.push(range);
            } else if let Ok(ip) = IpAddr::from_str(range_str) {
                config.ips.push(ip);
            } else {
                return Err(range_str.to_string());
            }
        }

        Ok(config)
    }

    /// Checks if an IP address is contained in the configured ranges
    pub fn contains_ip(&self, ip: &IpAddr) -> bool {
        if self.all {
            return true;
        }

        self.ips.contains(ip) || self.ranges.iter().any(|range| range.contains(ip))
    }
}

// Tests
