// Per-kind retrieval lanes: one queue and one provider snapshot per identifier kind

use super::queue::DedupQueue;
use crate::domain::{CellIdentifier, IdentifierKind, Locatable, WifiIdentifier};
use crate::port::{LocationProvider, ProviderList};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Notify;

/// Queue and provider chain for one identifier kind
pub struct Lane<T: Locatable> {
    queue: Arc<DedupQueue<T>>,
    providers: RwLock<ProviderList<T>>,
}

impl<T: Locatable> Lane<T> {
    pub fn new() -> Self {
        let empty: Vec<Arc<dyn LocationProvider<T>>> = Vec::new();
        Self {
            queue: Arc::new(DedupQueue::new()),
            providers: RwLock::new(empty.into()),
        }
    }

    pub fn queue(&self) -> &Arc<DedupQueue<T>> {
        &self.queue
    }

    /// Current provider snapshot
    pub fn providers(&self) -> ProviderList<T> {
        Arc::clone(&self.providers.read())
    }

    /// Swap in a new provider snapshot. Rounds already holding the old
    /// snapshot keep using it.
    pub fn replace_providers(&self, providers: ProviderList<T>) {
        *self.providers.write() = providers;
    }
}

impl<T: Locatable> Default for Lane<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Both lanes plus the scheduler wake signal
pub struct Lanes {
    pub cell: Lane<CellIdentifier>,
    pub wifi: Lane<WifiIdentifier>,
    wake: Notify,
}

impl Lanes {
    pub fn new() -> Self {
        Self {
            cell: Lane::new(),
            wifi: Lane::new(),
            wake: Notify::new(),
        }
    }

    /// True when neither queue has pending identifiers
    pub fn is_empty(&self) -> bool {
        self.cell.queue().is_empty() && self.wifi.queue().is_empty()
    }

    pub fn pending(&self, kind: IdentifierKind) -> usize {
        match kind {
            IdentifierKind::Cell => self.cell.queue().len(),
            IdentifierKind::Wifi => self.wifi.queue().len(),
        }
    }

    /// Wake the scheduler. A wake with no waiter is remembered once.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub async fn woken(&self) {
        self.wake.notified().await
    }
}

impl Default for Lanes {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed access to the lane of an identifier kind
pub trait LaneSelect: Locatable {
    fn lane(lanes: &Lanes) -> &Lane<Self>;
}

impl LaneSelect for CellIdentifier {
    fn lane(lanes: &Lanes) -> &Lane<Self> {
        &lanes.cell
    }
}

impl LaneSelect for WifiIdentifier {
    fn lane(lanes: &Lanes) -> &Lane<Self> {
        &lanes.wifi
    }
}
