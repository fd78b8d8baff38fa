// Location Provider Port
// Abstraction over external resolution sources (online services, local databases)

use crate::domain::ResolutionResult;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;

/// Provider errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider panicked: {0}")]
    Panicked(String),
}

/// Lazy sequence of results produced by one provider call
pub type ResolutionStream<'a, T> = BoxStream<'a, Result<ResolutionResult<T>, ProviderError>>;

/// Ordered provider chain for one identifier kind (immutable snapshot)
pub type ProviderList<T> = Arc<[Arc<dyn LocationProvider<T>>]>;

/// Location Provider trait
///
/// A provider may answer only part of a batch, may answer identifiers that
/// were not asked for, and may report "no data" by yielding a result without
/// a location. Yielding an `Err` ends that provider's contribution to the
/// batch; results yielded before it are kept.
pub trait LocationProvider<T>: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Whether the provider can currently be queried (network, API key, ...)
    fn is_available(&self) -> bool;

    /// Resolve a batch of identifiers
    fn retrieve<'a>(&'a self, batch: &'a [T]) -> ResolutionStream<'a, T>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{Locatable, Location};
    use futures::stream::{self, StreamExt};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Mock provider behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior<T: Locatable> {
        /// Answer every requested identifier found in the table
        Resolve(HashMap<T, Option<Location>>),
        /// Answer from the table, then fail with a transport error
        ResolveThenFail(HashMap<T, Option<Location>>, String),
        /// Fail before yielding anything
        Fail(String),
        /// Panic inside `retrieve` (for isolation testing)
        Panic(String),
    }

    /// Mock Location Provider for testing
    pub struct MockLocationProvider<T: Locatable> {
        name: String,
        available: AtomicBool,
        behavior: Mutex<MockBehavior<T>>,
        calls: Mutex<Vec<Vec<T>>>,
    }

    impl<T: Locatable> MockLocationProvider<T> {
        pub fn new(name: impl Into<String>, behavior: MockBehavior<T>) -> Self {
            Self {
                name: name.into(),
                available: AtomicBool::new(true),
                behavior: Mutex::new(behavior),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Provider that knows nothing (yields no results at all)
        pub fn empty(name: impl Into<String>) -> Self {
            Self::new(name, MockBehavior::Resolve(HashMap::new()))
        }

        pub fn resolving(
            name: impl Into<String>,
            entries: impl IntoIterator<Item = (T, Option<Location>)>,
        ) -> Self {
            Self::new(name, MockBehavior::Resolve(entries.into_iter().collect()))
        }

        pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
            Self::new(name, MockBehavior::Fail(message.into()))
        }

        pub fn panicking(name: impl Into<String>, message: impl Into<String>) -> Self {
            Self::new(name, MockBehavior::Panic(message.into()))
        }

        pub fn unavailable(name: impl Into<String>) -> Self {
            let provider = Self::empty(name);
            provider.set_available(false);
            provider
        }

        pub fn set_available(&self, available: bool) {
            self.available.store(available, Ordering::SeqCst);
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        /// Batches received, in call order
        pub fn calls(&self) -> Vec<Vec<T>> {
            self.calls.lock().clone()
        }

        fn answer(table: &HashMap<T, Option<Location>>, batch: &[T]) -> Vec<ResolutionResult<T>> {
            batch
                .iter()
                .filter_map(|id| {
                    table.get(id).map(|location| ResolutionResult {
                        identifier: id.clone(),
                        location: *location,
                    })
                })
                .collect()
        }
    }

    impl<T: Locatable> LocationProvider<T> for MockLocationProvider<T> {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        fn retrieve<'a>(&'a self, batch: &'a [T]) -> ResolutionStream<'a, T> {
            self.calls.lock().push(batch.to_vec());

            let behavior = self.behavior.lock().clone();
            match behavior {
                MockBehavior::Resolve(table) => {
                    stream::iter(Self::answer(&table, batch).into_iter().map(Ok)).boxed()
                }
                MockBehavior::ResolveThenFail(table, message) => {
                    let results = Self::answer(&table, batch).into_iter().map(Ok);
                    stream::iter(results.chain(std::iter::once(Err(ProviderError::Transport(
                        message,
                    )))))
                    .boxed()
                }
                MockBehavior::Fail(message) => {
                    stream::iter(vec![Err(ProviderError::Transport(message))]).boxed()
                }
                MockBehavior::Panic(message) => {
                    panic!("{}", message); // Actually panic for isolation testing
                }
            }
        }
    }
}
