// Location Cache Port (Interface)

use crate::domain::{Identifier, ResolutionResult};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Persistent store of resolution outcomes, keyed by identifier
///
/// Implementations must be safe for concurrent key-level access; the engine
/// performs no locking around cache calls.
#[async_trait]
pub trait LocationCache: Send + Sync {
    /// Look up the stored outcome
    ///
    /// `Ok(None)` means the identifier was never attempted. A stored result
    /// without a location means it was attempted and found unresolvable.
    async fn get(&self, identifier: &Identifier) -> Result<Option<ResolutionResult>>;

    /// Insert or replace the outcome for `result.identifier`
    async fn put(&self, result: &ResolutionResult) -> Result<()>;
}

/// Process-local cache (hosts without persistence, tests)
#[derive(Default)]
pub struct InMemoryLocationCache {
    entries: RwLock<HashMap<Identifier, ResolutionResult>>,
}

impl InMemoryLocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl LocationCache for InMemoryLocationCache {
    async fn get(&self, identifier: &Identifier) -> Result<Option<ResolutionResult>> {
        Ok(self.entries.read().get(identifier).cloned())
    }

    async fn put(&self, result: &ResolutionResult) -> Result<()> {
        self.entries
            .write()
            .insert(result.identifier, result.clone());
        Ok(())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// In-memory cache that records every write and can be told to fail
    #[derive(Default)]
    pub struct RecordingCache {
        inner: InMemoryLocationCache,
        puts: Mutex<Vec<ResolutionResult>>,
        gets: Mutex<usize>,
        failing_puts: Mutex<HashSet<Identifier>>,
        fail_gets: Mutex<bool>,
    }

    impl RecordingCache {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populate an entry without recording it as a write
        pub fn seed(&self, result: ResolutionResult) {
            self.inner.entries.write().insert(result.identifier, result);
        }

        /// Make every `put` for `identifier` fail
        pub fn fail_puts_for(&self, identifier: Identifier) {
            self.failing_puts.lock().insert(identifier);
        }

        pub fn fail_gets(&self, fail: bool) {
            *self.fail_gets.lock() = fail;
        }

        pub fn puts(&self) -> Vec<ResolutionResult> {
            self.puts.lock().clone()
        }

        pub fn put_count_for(&self, identifier: &Identifier) -> usize {
            self.puts
                .lock()
                .iter()
                .filter(|r| &r.identifier == identifier)
                .count()
        }

        pub fn get_count(&self) -> usize {
            *self.gets.lock()
        }

        pub fn len(&self) -> usize {
            self.inner.len()
        }

        pub fn is_empty(&self) -> bool {
            self.inner.is_empty()
        }
    }

    #[async_trait]
    impl LocationCache for RecordingCache {
        async fn get(&self, identifier: &Identifier) -> Result<Option<ResolutionResult>> {
            *self.gets.lock() += 1;
            if *self.fail_gets.lock() {
                return Err(AppError::Cache("mock get failure".to_string()));
            }
            self.inner.get(identifier).await
        }

        async fn put(&self, result: &ResolutionResult) -> Result<()> {
            if self.failing_puts.lock().contains(&result.identifier) {
                return Err(AppError::Cache(format!(
                    "mock put failure for {}",
                    result.identifier
                )));
            }
            self.puts.lock().push(result.clone());
            self.inner.put(result).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellIdentifier, Location, WifiIdentifier};

    #[tokio::test]
    async fn test_get_distinguishes_never_attempted_from_unresolvable() {
        let cache = InMemoryLocationCache::new();
        let attempted: Identifier = CellIdentifier::new(310, 260, 1, 12345).into();
        let never: Identifier = CellIdentifier::new(310, 260, 1, 54321).into();

        cache
            .put(&ResolutionResult::unresolved(attempted))
            .await
            .unwrap();

        let stored = cache.get(&attempted).await.unwrap();
        assert!(matches!(stored, Some(ref r) if r.location.is_none()));
        assert!(cache.get(&never).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_upserts() {
        let cache = InMemoryLocationCache::new();
        let wifi: Identifier = WifiIdentifier::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]).into();
        let location = Location::new(52.5, 13.4, 30.0, 0).unwrap();

        cache.put(&ResolutionResult::unresolved(wifi)).await.unwrap();
        cache
            .put(&ResolutionResult::resolved(wifi, location))
            .await
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(&wifi).await.unwrap().unwrap().location,
            Some(location)
        );
    }
}
