// Session context

use std::net::IpAddr;

use super::RtmpSessionStatus;

/// Per-connection context
pub struct SessionContext {
    /// Session ID
    pub id: u64,

    /// Client IP address
    pub ip: IpAddr,

    /// Session status
    pub status: RtmpSessionStatus,
}

impl SessionContext {
    /// Creates the context for a new connection
    ///
    /// # Arguments
    ///
    /// * `id` - Session ID
    /// * `ip` - Client IP address
    pub fn new(id: u64, ip: IpAddr) -> SessionContext {
        SessionContext {
            id,
            ip,
            status: RtmpSessionStatus::new(),
        }
    }
}
