// Port Layer - Interfaces for external collaborators

pub mod location_cache;
pub mod location_provider;
pub mod time_provider;

// Re-exports
pub use location_cache::{InMemoryLocationCache, LocationCache};
pub use location_provider::{LocationProvider, ProviderError, ProviderList, ResolutionStream};
pub use time_provider::{SystemTimeProvider, TimeProvider};
