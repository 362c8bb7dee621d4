// Stream registry

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use super::PublisherSession;

/// Registration failure
#[derive(Debug, PartialEq, Eq)]
pub enum RegisterError {
    /// Another publisher already holds the stream key
    AlreadyExists,
}

/// Process-wide map of stream keys to publisher sessions.
///
/// Handed to each session as an explicit dependency so tests and
/// multiple listeners can run with isolated registries.
pub struct StreamRegistry {
    streams: Mutex<HashMap<String, Arc<PublisherSession>>>,
}

impl StreamRegistry {
    /// Creates an empty registry
    pub fn new() -> StreamRegistry {
        StreamRegistry {
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a publisher under its stream key.
    /// Fails if the key is already taken.
    pub async fn register(
        &self,
        session: Arc<PublisherSession>,
    ) -> Result<(), RegisterError> {
        let mut streams = self.streams.lock().await;

        if streams.contains_key(&session.stream_key) {
            return Err(RegisterError::AlreadyExists);
        }

        streams.insert(session.stream_key.clone(), session);

        Ok(())
    }

    /// Looks up the publisher for a stream key
    pub async fn lookup(&self, stream_key: &str) -> Option<Arc<PublisherSession>> {
        let streams = self.streams.lock().await;

        streams.get(stream_key).cloned()
    }

    /// Removes the registry entry for a stream key, only if it still
    /// belongs to the given session
    pub async fn remove(&self, stream_key: &str, session_id: u64) {
        let mut streams = self.streams.lock().await;

        if let Some(existing) = streams.get(stream_key) {
            if existing.session_id == session_id {
                streams.remove(stream_key);
            }
        }
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_register_and_lookup() {
        let registry = StreamRegistry::new();

        let session = Arc::new(PublisherSession::new("abc", "live", 1));

        registry.register(session).await.unwrap();

        assert!(registry.lookup("abc").await.is_some());
        assert!(registry.lookup("other").await.is_none());
    }

    #[tokio::test]
    async fn test_registry_refuses_duplicate_key() {
        let registry = StreamRegistry::new();

        registry
            .register(Arc::new(PublisherSession::new("abc", "live", 1)))
            .await
            .unwrap();

        let err = registry
            .register(Arc::new(PublisherSession::new("abc", "live", 2)))
            .await
            .unwrap_err();

        assert_eq!(err, RegisterError::AlreadyExists);
    }

    #[tokio::test]
    async fn test_registry_remove_frees_key_for_republish() {
        let registry = StreamRegistry::new();

        registry
            .register(Arc::new(PublisherSession::new("abc", "live", 1)))
            .await
            .unwrap();

        // A remove by a stale session id must not evict the current owner
        registry.remove("abc", 99).await;
        assert!(registry.lookup("abc").await.is_some());

        registry.remove("abc", 1).await;
        assert!(registry.lookup("abc").await.is_none());

        registry
            .register(Arc::new(PublisherSession::new("abc", "live", 2)))
            .await
            .unwrap();
    }
}
