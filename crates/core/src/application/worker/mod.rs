// Batch Worker - drains one queue into a single dispatched batch

mod panic_guard;
mod shutdown;

pub use panic_guard::{execute_guarded, panic_message, PanicGuardResult};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::dispatcher::{DispatchReport, SourceChainDispatcher};
use crate::application::queue::DedupQueue;
use crate::domain::Locatable;
use crate::port::{LocationCache, ProviderList};
use std::sync::Arc;
use tracing::{debug, warn};

/// Counters for one worker invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Identifiers taken off the queue
    pub popped: usize,
    /// Popped identifiers that already had a cache entry
    pub already_cached: usize,
    /// Popped identifiers already collected into this batch
    pub duplicates: usize,
    /// Dispatcher counters (zeroed when nothing was dispatched)
    pub dispatch: DispatchReport,
}

impl BatchReport {
    pub fn dispatched(&self) -> usize {
        self.dispatch.attempted
    }

    pub fn merge(&mut self, other: &BatchReport) {
        self.popped += other.popped;
        self.already_cached += other.already_cached;
        self.duplicates += other.duplicates;
        self.dispatch.merge(&other.dispatch);
    }
}

/// Worker bound to one identifier kind for the duration of a round
pub struct BatchWorker<T: Locatable> {
    queue: Arc<DedupQueue<T>>,
    cache: Arc<dyn LocationCache>,
    providers: ProviderList<T>,
    capacity: usize,
}

impl<T: Locatable> BatchWorker<T> {
    pub fn new(
        queue: Arc<DedupQueue<T>>,
        cache: Arc<dyn LocationCache>,
        providers: ProviderList<T>,
        capacity: usize,
    ) -> Self {
        Self {
            queue,
            cache,
            providers,
            capacity,
        }
    }

    /// Collect up to `capacity` identifiers lacking a cache entry and dispatch them
    ///
    /// Identifiers that already have an entry are dropped without using up
    /// capacity. A failed cache read counts as "no entry".
    pub async fn run(&self) -> BatchReport {
        let mut report = BatchReport::default();
        let mut batch: Vec<T> = Vec::with_capacity(self.capacity);

        while batch.len() < self.capacity {
            let Some(identifier) = self.queue.pop() else {
                break;
            };
            report.popped += 1;

            if batch.contains(&identifier) {
                report.duplicates += 1;
                continue;
            }

            match self.cache.get(&identifier.clone().into()).await {
                Ok(Some(_)) => {
                    debug!(identifier = %identifier, "Already cached, skipping");
                    report.already_cached += 1;
                }
                Ok(None) => batch.push(identifier),
                Err(e) => {
                    warn!(
                        identifier = %identifier,
                        error = %e,
                        "Cache lookup failed, retrieving anyway"
                    );
                    batch.push(identifier);
                }
            }
        }

        if batch.is_empty() {
            return report;
        }

        let kind = T::KIND;
        debug!(kind = %kind, batch = batch.len(), "Dispatching batch");
        let dispatcher =
            SourceChainDispatcher::new(Arc::clone(&self.providers), Arc::clone(&self.cache));
        report.dispatch = dispatcher.dispatch(batch).await;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CellIdentifier, Location, ResolutionResult};
    use crate::port::location_cache::mocks::RecordingCache;
    use crate::port::location_provider::mocks::MockLocationProvider;
    use crate::port::LocationProvider;

    fn cell(cid: u64) -> CellIdentifier {
        CellIdentifier::new(262, 1, 100, cid)
    }

    fn worker_with(
        queue: &Arc<DedupQueue<CellIdentifier>>,
        cache: &Arc<RecordingCache>,
        provider: &Arc<MockLocationProvider<CellIdentifier>>,
        capacity: usize,
    ) -> BatchWorker<CellIdentifier> {
        let providers: Vec<Arc<dyn LocationProvider<CellIdentifier>>> = vec![provider.clone()];
        BatchWorker::new(queue.clone(), cache.clone(), providers.into(), capacity)
    }

    #[tokio::test]
    async fn test_batch_cap_limits_one_invocation() {
        let queue = Arc::new(DedupQueue::new());
        for cid in 0..25 {
            queue.enqueue(cell(cid));
        }
        let cache = Arc::new(RecordingCache::new());
        let provider = Arc::new(MockLocationProvider::empty("p"));
        let worker = worker_with(&queue, &cache, &provider, 10);

        let report = worker.run().await;

        assert_eq!(report.dispatched(), 10);
        assert_eq!(provider.calls()[0].len(), 10);
        assert_eq!(queue.len(), 15);
        assert_eq!(cache.len(), 10);
    }

    #[tokio::test]
    async fn test_cached_identifiers_do_not_consume_capacity() {
        let queue = Arc::new(DedupQueue::new());
        let cache = Arc::new(RecordingCache::new());
        for cid in 0..5 {
            queue.enqueue(cell(cid));
        }
        // Most recent first: 4, 3 are popped first and are cached
        cache.seed(ResolutionResult::unresolved(cell(4).into()));
        cache.seed(ResolutionResult::unresolved(cell(3).into()));

        let provider = Arc::new(MockLocationProvider::empty("p"));
        let worker = worker_with(&queue, &cache, &provider, 3);

        let report = worker.run().await;

        assert_eq!(report.popped, 5);
        assert_eq!(report.already_cached, 2);
        assert_eq!(report.dispatched(), 3);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_everything_cached_skips_dispatch() {
        let queue = Arc::new(DedupQueue::new());
        let cache = Arc::new(RecordingCache::new());
        let location = Location::new(1.0, 2.0, 3.0, 4).unwrap();
        queue.enqueue(cell(1));
        cache.seed(ResolutionResult::resolved(cell(1).into(), location));

        let provider = Arc::new(MockLocationProvider::empty("p"));
        let worker = worker_with(&queue, &cache, &provider, 10);

        let report = worker.run().await;

        assert_eq!(report.dispatched(), 0);
        assert_eq!(provider.call_count(), 0);
        assert!(cache.puts().is_empty());
    }

    #[tokio::test]
    async fn test_empty_queue_is_noop() {
        let queue = Arc::new(DedupQueue::new());
        let cache = Arc::new(RecordingCache::new());
        let provider = Arc::new(MockLocationProvider::empty("p"));
        let worker = worker_with(&queue, &cache, &provider, 10);

        assert_eq!(worker.run().await, BatchReport::default());
        assert_eq!(cache.get_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_read_failure_still_dispatches() {
        let queue = Arc::new(DedupQueue::new());
        let cache = Arc::new(RecordingCache::new());
        cache.fail_gets(true);
        queue.enqueue(cell(1));

        let provider = Arc::new(MockLocationProvider::empty("p"));
        let worker = worker_with(&queue, &cache, &provider, 10);

        let report = worker.run().await;

        assert_eq!(report.dispatched(), 1);
        assert_eq!(cache.put_count_for(&cell(1).into()), 1);
    }
}
