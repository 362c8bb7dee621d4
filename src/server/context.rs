// Context types to group server dependencies

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    directory::UserDirectory,
    relay::{DestinationConnector, ServicesCatalog},
    streams::StreamRegistry,
};

use super::{IpConnectionCounter, RelayConfiguration, SessionIdGenerator};

/// Shared dependencies handed to every session
#[derive(Clone)]
pub struct RelayServerContext {
    /// Server configuration
    pub config: Arc<RelayConfiguration>,

    /// Stream registry
    pub registry: Arc<StreamRegistry>,

    /// Stream key authorization service
    pub directory: Arc<dyn UserDirectory>,

    /// Opens outbound destination sinks
    pub connector: Arc<dyn DestinationConnector>,

    /// Destinations catalog
    pub catalog: Arc<ServicesCatalog>,
}

/// Server context extended with the listener bookkeeping
#[derive(Clone)]
pub struct RelayServerContextExtended {
    /// Base context
    pub base: RelayServerContext,

    /// Per-IP connection counter
    pub ip_counter: Arc<Mutex<IpConnectionCounter>>,

    /// Session id generator
    pub session_id_generator: Arc<Mutex<SessionIdGenerator>>,
}
