// Location Retriever - public entry point of the retrieval engine

use super::config::RetrieverConfig;
use super::lane::{LaneSelect, Lanes};
use super::round::{RetrievalRound, RoundOutcome, RoundReport};
use super::scheduler::{RetrievalScheduler, SchedulerState};
use super::worker::{shutdown_channel, ShutdownSender};
use crate::domain::{Identifier, IdentifierKind};
use crate::error::{AppError, Result};
use crate::port::{LocationCache, LocationProvider, ProviderList};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

enum Lifecycle {
    Created,
    Running {
        shutdown: ShutdownSender,
        handle: JoinHandle<()>,
    },
    Stopping {
        handle: Option<JoinHandle<()>>,
    },
}

/// Queues identifiers and resolves them in the background
///
/// Enqueueing is fire-and-forget: outcomes only ever show up in the cache.
pub struct LocationRetriever {
    lanes: Arc<Lanes>,
    cache: Arc<dyn LocationCache>,
    config: RetrieverConfig,
    state: Arc<watch::Sender<SchedulerState>>,
    lifecycle: Mutex<Lifecycle>,
}

impl LocationRetriever {
    pub fn new(cache: Arc<dyn LocationCache>, config: RetrieverConfig) -> Result<Self> {
        config.validate()?;
        let (state, _) = watch::channel(SchedulerState::Created);

        Ok(Self {
            lanes: Arc::new(Lanes::new()),
            cache,
            config,
            state: Arc::new(state),
            lifecycle: Mutex::new(Lifecycle::Created),
        })
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Replace the provider chain for `T`'s identifier kind
    ///
    /// The list is copied; rounds already in flight finish with the chain
    /// they started with.
    pub fn configure_providers<T: LaneSelect>(
        &self,
        providers: impl IntoIterator<Item = Arc<dyn LocationProvider<T>>>,
    ) {
        let snapshot: ProviderList<T> = providers.into_iter().collect::<Vec<_>>().into();
        let kind = T::KIND;
        let names: Vec<&str> = snapshot.iter().map(|p| p.name()).collect();
        info!(
            kind = %kind,
            providers = ?names,
            "Configured location sources"
        );
        T::lane(&self.lanes).replace_providers(snapshot);
    }

    /// Current provider chain for `T`'s identifier kind
    pub fn providers<T: LaneSelect>(&self) -> ProviderList<T> {
        T::lane(&self.lanes).providers()
    }

    /// Queue an identifier for retrieval
    ///
    /// Returns false if an equal identifier is already queued. The scheduler
    /// is signalled either way.
    pub fn enqueue(&self, identifier: impl Into<Identifier>) -> bool {
        match identifier.into() {
            Identifier::Cell(cell) => self.enqueue_typed(cell),
            Identifier::Wifi(wifi) => self.enqueue_typed(wifi),
        }
    }

    /// Queue an identifier given in tagged text form (`cell:...` / `wifi:...`)
    ///
    /// Unknown kinds and malformed identifiers are rejected before anything
    /// is queued.
    pub fn enqueue_tagged(&self, text: &str) -> Result<bool> {
        let identifier: Identifier = text.parse()?;
        Ok(self.enqueue(identifier))
    }

    pub fn enqueue_typed<T: LaneSelect>(&self, identifier: T) -> bool {
        let queued = T::lane(&self.lanes).queue().enqueue(identifier.clone());
        if queued {
            let kind = T::KIND;
            debug!(kind = %kind, identifier = %identifier, "Queued for retrieval");
        }
        self.lanes.wake();
        queued
    }

    /// Identifiers waiting in the queue of `kind`
    pub fn pending(&self, kind: IdentifierKind) -> usize {
        self.lanes.pending(kind)
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Watch scheduler state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Launch the scheduler task (must be called inside a tokio runtime)
    ///
    /// A retriever can be started once; starting again, including after
    /// `stop()`, is an error.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| AppError::InvalidState("start() requires a tokio runtime".into()))?;

        let mut lifecycle = self.lifecycle.lock();
        match &*lifecycle {
            Lifecycle::Created => {}
            Lifecycle::Running { .. } => {
                return Err(AppError::InvalidState("retriever already started".into()))
            }
            Lifecycle::Stopping { .. } => {
                return Err(AppError::InvalidState(
                    "retriever was stopped and cannot be restarted".into(),
                ))
            }
        }

        let (shutdown, token) = shutdown_channel();
        let scheduler = RetrievalScheduler::new(
            Arc::clone(&self.lanes),
            self.new_round(),
            self.config.throttle_window,
            Arc::clone(&self.state),
        );
        let handle = runtime.spawn(scheduler.run(token));

        *lifecycle = Lifecycle::Running { shutdown, handle };
        info!(
            batch_capacity = self.config.batch_capacity,
            worker_pairs = self.config.worker_pairs,
            in_flight_policy = ?self.config.in_flight_policy,
            "Location retriever started"
        );
        Ok(())
    }

    /// Signal the scheduler to stop (returns immediately; idempotent)
    ///
    /// Stopping is terminal, also for a retriever that was never started.
    /// Queued identifiers stay queued. Workers of a round in flight are
    /// detached or aborted according to `in_flight_policy`.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let previous = std::mem::replace(&mut *lifecycle, Lifecycle::Stopping { handle: None });

        *lifecycle = match previous {
            Lifecycle::Running { shutdown, handle } => {
                info!("Stopping location retriever");
                shutdown.shutdown();
                Lifecycle::Stopping {
                    handle: Some(handle),
                }
            }
            Lifecycle::Created => {
                info!("Location retriever stopped before it was started");
                self.state.send_replace(SchedulerState::Stopped);
                Lifecycle::Stopping { handle: None }
            }
            stopping => stopping,
        };
    }

    /// Stop and wait for the scheduler task to exit
    pub async fn shutdown(&self) {
        self.stop();

        let handle = match &mut *self.lifecycle.lock() {
            Lifecycle::Stopping { handle } => handle.take(),
            _ => None,
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler task ended abnormally");
            }
        }
    }

    /// Run one round now, ignoring the throttle window
    ///
    /// Useful for hosts that drive retrieval themselves instead of calling
    /// `start()`. Does not move the scheduler's throttle window.
    pub async fn run_round_now(&self) -> RoundReport {
        match self.new_round().run().await {
            RoundOutcome::Completed(report) => report,
            RoundOutcome::Idle | RoundOutcome::Interrupted => RoundReport::default(),
        }
    }

    fn new_round(&self) -> RetrievalRound {
        RetrievalRound::new(
            Arc::clone(&self.lanes),
            Arc::clone(&self.cache),
            self.config.batch_capacity,
            self.config.worker_pairs,
            self.config.in_flight_policy,
        )
    }
}
