// Destinations catalog (services/servers.json)

use serde::Deserialize;
use thiserror::Error;

/// Catalog load failure
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct ServerEntry {
    #[serde(rename = "Name", default)]
    #[allow(dead_code)]
    name: String,

    #[serde(default)]
    url: String,
}

#[derive(Deserialize)]
struct ServiceEntry {
    #[serde(rename = "Name", default)]
    name: String,

    #[serde(default)]
    servers: Vec<ServerEntry>,
}

/// Static catalog of known restreaming services and their ingest URLs.
///
/// Used to pair directory responses that name a service but carry no
/// transport URL.
#[derive(Default, Deserialize)]
pub struct ServicesCatalog {
    #[serde(default)]
    services: Vec<ServiceEntry>,
}

impl ServicesCatalog {
    /// Creates an empty catalog
    pub fn empty() -> ServicesCatalog {
        ServicesCatalog::default()
    }

    /// Loads the catalog from a JSON file
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the catalog file
    pub fn load_from_file(path: &str) -> Result<ServicesCatalog, CatalogError> {
        let content = std::fs::read_to_string(path)?;

        Ok(serde_json::from_str(&content)?)
    }

    /// Resolves the ingest URL for a service name (first server wins).
    /// The match is case insensitive.
    pub fn resolve_url(&self, service_name: &str) -> Option<&str> {
        self.services
            .iter()
            .find(|service| service.name.eq_ignore_ascii_case(service_name))
            .and_then(|service| service.servers.first())
            .map(|server| server.url.as_str())
    }
}

// Tests
