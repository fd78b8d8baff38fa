// Application Layer - queueing, scheduling and dispatch

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod lane;
pub mod queue;
pub mod retriever;
pub mod round;
pub mod scheduler;
pub mod worker;

// Re-exports
pub use config::{InFlightPolicy, RetrieverConfig};
pub use dispatcher::{DispatchReport, SourceChainDispatcher};
pub use lane::LaneSelect;
pub use queue::DedupQueue;
pub use retriever::LocationRetriever;
pub use round::{RetrievalRound, RoundOutcome, RoundReport};
pub use scheduler::{RetrievalScheduler, SchedulerState};
pub use worker::{BatchReport, BatchWorker};
