// In-memory user directory

use std::collections::HashMap;

use async_trait::async_trait;

use super::{DirectoryError, StreamAuthorization, UserDirectory};

/// Directory backed by a fixed map of stream keys.
///
/// Used when no remote directory is configured (permissive mode:
/// every key authorized, no destinations) and by the test suite.
pub struct MemoryUserDirectory {
    entries: HashMap<String, StreamAuthorization>,
    authorize_unknown: bool,
}

impl MemoryUserDirectory {
    /// Creates a directory with a fixed set of entries
    ///
    /// # Arguments
    ///
    /// * `entries` - Authorization per stream key
    /// * `authorize_unknown` - What to answer for keys not in the map
    pub fn new(
        entries: HashMap<String, StreamAuthorization>,
        authorize_unknown: bool,
    ) -> MemoryUserDirectory {
        MemoryUserDirectory {
            entries,
            authorize_unknown,
        }
    }

    /// Creates a directory that authorizes every key, with no destinations
    pub fn new_permissive() -> MemoryUserDirectory {
        MemoryUserDirectory {
            entries: HashMap::new(),
            authorize_unknown: true,
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn lookup(&self, stream_key: &str) -> Result<StreamAuthorization, DirectoryError> {
        match self.entries.get(stream_key) {
            Some(auth) => Ok(auth.clone()),
            None => Ok(StreamAuthorization {
                authorized: self.authorize_unknown,
                destinations: Vec::new(),
            }),
        }
    }
}
