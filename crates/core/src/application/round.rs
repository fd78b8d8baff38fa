// Retrieval Round - fan out worker pairs over both lanes and join them

use super::config::InFlightPolicy;
use super::lane::Lanes;
use super::worker::{panic_message, BatchReport, BatchWorker, ShutdownToken};
use crate::domain::IdentifierKind;
use crate::port::LocationCache;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Aggregated counters for one round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub cell: BatchReport,
    pub wifi: BatchReport,
    /// Worker tasks that panicked outside provider isolation
    pub worker_panics: usize,
}

impl RoundReport {
    pub fn dispatched(&self) -> usize {
        self.cell.dispatched() + self.wifi.dispatched()
    }

    fn absorb(&mut self, kind: IdentifierKind, report: &BatchReport) {
        match kind {
            IdentifierKind::Cell => self.cell.merge(report),
            IdentifierKind::Wifi => self.wifi.merge(report),
        }
    }
}

/// How a round ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Both queues were empty; no workers were spawned
    Idle,
    /// Every worker finished
    Completed(RoundReport),
    /// Shutdown arrived while workers were running
    Interrupted,
}

/// One retrieval pass over both lanes
pub struct RetrievalRound {
    lanes: Arc<Lanes>,
    cache: Arc<dyn LocationCache>,
    batch_capacity: usize,
    worker_pairs: usize,
    in_flight_policy: InFlightPolicy,
}

impl RetrievalRound {
    pub fn new(
        lanes: Arc<Lanes>,
        cache: Arc<dyn LocationCache>,
        batch_capacity: usize,
        worker_pairs: usize,
        in_flight_policy: InFlightPolicy,
    ) -> Self {
        Self {
            lanes,
            cache,
            batch_capacity,
            worker_pairs,
            in_flight_policy,
        }
    }

    /// Run to completion (no cancellation)
    pub async fn run(&self) -> RoundOutcome {
        self.run_with(std::future::pending()).await
    }

    /// Run until every worker finished or `shutdown` fires
    ///
    /// On shutdown the configured `InFlightPolicy` decides whether running
    /// workers are detached or aborted.
    pub async fn run_until_stopped(&self, mut shutdown: ShutdownToken) -> RoundOutcome {
        self.run_with(async move { shutdown.wait().await }).await
    }

    async fn run_with(&self, stopped: impl Future<Output = ()>) -> RoundOutcome {
        if self.lanes.is_empty() {
            return RoundOutcome::Idle;
        }

        debug!(worker_pairs = self.worker_pairs, "Starting retrieval round");
        let mut workers = self.spawn_workers();
        let mut report = RoundReport::default();

        tokio::pin!(stopped);
        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => {
                    let in_flight = workers.len();
                    match self.in_flight_policy {
                        InFlightPolicy::Abort => workers.abort_all(),
                        InFlightPolicy::Detach => workers.detach_all(),
                    }
                    info!(
                        in_flight,
                        policy = ?self.in_flight_policy,
                        "Retrieval round interrupted by shutdown"
                    );
                    return RoundOutcome::Interrupted;
                }
                joined = workers.join_next() => match joined {
                    None => break,
                    Some(Ok((kind, batch))) => report.absorb(kind, &batch),
                    Some(Err(join_err)) => {
                        report.worker_panics += 1;
                        if join_err.is_panic() {
                            let msg = panic_message(join_err.into_panic().as_ref());
                            error!(panic_msg = %msg, "Batch worker panicked");
                        } else {
                            error!(error = %join_err, "Batch worker cancelled");
                        }
                    }
                },
            }
        }

        RoundOutcome::Completed(report)
    }

    /// Spawn `worker_pairs` cell workers and as many Wi-Fi workers
    ///
    /// Provider snapshots are taken once, so every worker of this round sees
    /// the same chains even if they are reconfigured meanwhile.
    fn spawn_workers(&self) -> JoinSet<(IdentifierKind, BatchReport)> {
        let cell_providers = self.lanes.cell.providers();
        let wifi_providers = self.lanes.wifi.providers();
        let mut workers = JoinSet::new();

        for _ in 0..self.worker_pairs {
            let cell = BatchWorker::new(
                Arc::clone(self.lanes.cell.queue()),
                Arc::clone(&self.cache),
                Arc::clone(&cell_providers),
                self.batch_capacity,
            );
            workers.spawn(async move { (IdentifierKind::Cell, cell.run().await) });

            let wifi = BatchWorker::new(
                Arc::clone(self.lanes.wifi.queue()),
                Arc::clone(&self.cache),
                Arc::clone(&wifi_providers),
                self.batch_capacity,
            );
            workers.spawn(async move { (IdentifierKind::Wifi, wifi.run().await) });
        }

        workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::worker::shutdown_channel;
    use crate::domain::{CellIdentifier, Location, WifiIdentifier};
    use crate::port::location_cache::mocks::RecordingCache;
    use crate::port::location_provider::mocks::MockLocationProvider;
    use crate::port::{LocationCache, LocationProvider};
    use futures::stream::{self, StreamExt};
    use std::time::Duration;

    fn round(lanes: &Arc<Lanes>, cache: &Arc<RecordingCache>, pairs: usize) -> RetrievalRound {
        RetrievalRound::new(
            lanes.clone(),
            cache.clone(),
            10,
            pairs,
            InFlightPolicy::Detach,
        )
    }

    #[tokio::test]
    async fn test_empty_lanes_are_idle() {
        let lanes = Arc::new(Lanes::new());
        let cache = Arc::new(RecordingCache::new());

        assert_eq!(round(&lanes, &cache, 1).run().await, RoundOutcome::Idle);
    }

    #[tokio::test]
    async fn test_round_drains_both_kinds() {
        let lanes = Arc::new(Lanes::new());
        let cache = Arc::new(RecordingCache::new());
        let wifi = WifiIdentifier::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        let cell = CellIdentifier::new(310, 260, 1, 12345);
        let location = Location::new(52.5, 13.4, 20.0, 0).unwrap();

        let wifi_source: Arc<dyn LocationProvider<WifiIdentifier>> = Arc::new(
            MockLocationProvider::resolving("wifi-db", vec![(wifi, Some(location))]),
        );
        lanes.wifi.replace_providers(vec![wifi_source].into());
        lanes.cell.queue().enqueue(cell);
        lanes.wifi.queue().enqueue(wifi);

        let RoundOutcome::Completed(report) = round(&lanes, &cache, 1).run().await else {
            panic!("expected a completed round");
        };
        assert_eq!(report.cell.dispatch.exhausted, 1);
        assert_eq!(report.wifi.dispatch.located, 1);
        assert!(lanes.is_empty());
        assert!(cache.get(&cell.into()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_worker_pairs_split_the_queue() {
        let lanes = Arc::new(Lanes::new());
        let cache = Arc::new(RecordingCache::new());
        for cid in 0..25 {
            lanes.cell.queue().enqueue(CellIdentifier::new(1, 1, 1, cid));
        }

        let RoundOutcome::Completed(report) = round(&lanes, &cache, 3).run().await else {
            panic!("expected a completed round");
        };

        assert_eq!(report.cell.dispatched(), 25);
        assert_eq!(cache.len(), 25);
    }

    /// Provider whose stream never yields
    struct HungProvider;

    impl LocationProvider<CellIdentifier> for HungProvider {
        fn name(&self) -> &str {
            "hung"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn retrieve<'a>(
            &'a self,
            _batch: &'a [CellIdentifier],
        ) -> crate::port::ResolutionStream<'a, CellIdentifier> {
            stream::pending().boxed()
        }
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_hung_round() {
        let lanes = Arc::new(Lanes::new());
        let cache = Arc::new(RecordingCache::new());
        let hung: Arc<dyn LocationProvider<CellIdentifier>> = Arc::new(HungProvider);
        lanes.cell.replace_providers(vec![hung].into());
        lanes.cell.queue().enqueue(CellIdentifier::new(1, 1, 1, 1));

        let round =
            RetrievalRound::new(lanes.clone(), cache.clone(), 10, 1, InFlightPolicy::Abort);
        let (tx, token) = shutdown_channel();

        let running = tokio::spawn(async move { round.run_until_stopped(token).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.shutdown();

        let outcome = tokio::time::timeout(Duration::from_secs(1), running)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, RoundOutcome::Interrupted);
        assert!(cache.is_empty());
    }
}
