// User directory (stream authorization service)

mod http_client;
mod memory;

pub use http_client::*;
pub use memory::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outbound restreaming endpoint returned by the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationEndpoint {
    /// Service name (used to resolve the URL through the catalog)
    #[serde(default)]
    pub name: String,

    /// Transport URL of the ingest server, may be empty
    #[serde(default)]
    pub url: String,

    /// Stream key for this destination
    #[serde(default)]
    pub key: String,
}

/// Directory response for a stream key lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamAuthorization {
    /// True if the key may publish
    pub authorized: bool,

    /// Third party endpoints to restream to
    #[serde(default)]
    pub destinations: Vec<DestinationEndpoint>,
}

/// Directory lookup failure
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("directory returned status code {status}")]
    Status { status: u16 },
}

/// Authorization service consulted once per publish attempt
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks up a stream key
    async fn lookup(&self, stream_key: &str) -> Result<StreamAuthorization, DirectoryError>;
}
