//! What happens to a round that is still running when the retriever stops

use futures::stream::{self, StreamExt};
use netloc_core::application::{InFlightPolicy, SchedulerState};
use netloc_core::domain::{CellIdentifier, IdentifierKind, Location, ResolutionResult};
use netloc_core::port::{InMemoryLocationCache, LocationCache, LocationProvider, ResolutionStream};
use netloc_core::{LocationRetriever, RetrieverConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Provider that answers only after the test opens the gate
struct GatedProvider {
    entered: Notify,
    gate: Notify,
    location: Location,
}

impl GatedProvider {
    fn new() -> Self {
        Self {
            entered: Notify::new(),
            gate: Notify::new(),
            location: Location::new(40.4, -3.7, 150.0, 1_700_000_000_000).unwrap(),
        }
    }
}

impl LocationProvider<CellIdentifier> for GatedProvider {
    fn name(&self) -> &str {
        "gated"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn retrieve<'a>(&'a self, batch: &'a [CellIdentifier]) -> ResolutionStream<'a, CellIdentifier> {
        stream::once(async move {
            self.entered.notify_one();
            self.gate.notified().await;
            Ok(ResolutionResult::resolved(batch[0], self.location))
        })
        .boxed()
    }
}

async fn stop_mid_round(policy: InFlightPolicy) -> (Arc<InMemoryLocationCache>, CellIdentifier) {
    let cache = Arc::new(InMemoryLocationCache::new());
    let config = RetrieverConfig::default().with_in_flight_policy(policy);
    let retriever = LocationRetriever::new(cache.clone(), config).unwrap();
    let provider = Arc::new(GatedProvider::new());
    retriever.configure_providers::<CellIdentifier>(vec![
        provider.clone() as Arc<dyn LocationProvider<CellIdentifier>>
    ]);

    let cell = CellIdentifier::new(214, 7, 28, 5551);
    let queued_later = CellIdentifier::new(214, 7, 28, 5552);
    retriever.enqueue(cell);
    retriever.start().unwrap();

    tokio::time::timeout(Duration::from_secs(5), provider.entered.notified())
        .await
        .unwrap();
    retriever.enqueue(queued_later);

    tokio::time::timeout(Duration::from_secs(5), retriever.shutdown())
        .await
        .unwrap();
    assert_eq!(retriever.state(), SchedulerState::Stopped);
    assert_eq!(retriever.pending(IdentifierKind::Cell), 1);

    provider.gate.notify_one();
    (cache, cell)
}

#[tokio::test]
async fn test_detached_round_finishes_after_stop() {
    let (cache, cell) = stop_mid_round(InFlightPolicy::Detach).await;

    let stored = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(result) = cache.get(&cell.into()).await.unwrap() {
                return result;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert!(stored.is_resolved());
}

#[tokio::test]
async fn test_aborted_round_writes_nothing() {
    let (cache, cell) = stop_mid_round(InFlightPolicy::Abort).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(cache.get(&cell.into()).await.unwrap().is_none());
    assert!(cache.is_empty());
}
