//! Source Chain Dispatcher - resolves one batch through an ordered provider chain
//!
//! Providers are tried strictly in configured order with the identifiers that
//! are still unresolved. Every result a provider yields is written to the
//! cache at once, positive or negative. A failing or panicking provider only
//! loses its own remaining output; the chain moves on. Whatever is left when
//! the chain is exhausted is committed as "confirmed unresolvable".

use super::worker::{execute_guarded, PanicGuardResult};
use crate::domain::{Locatable, ResolutionResult};
use crate::port::{LocationCache, LocationProvider, ProviderError, ProviderList};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome counters for one dispatched batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Identifiers that entered dispatch
    pub attempted: usize,
    /// Batch identifiers committed with a location
    pub located: usize,
    /// Batch identifiers a provider reported as having no data
    pub reported_missing: usize,
    /// Batch identifiers committed negative after the chain was exhausted
    pub exhausted: usize,
    /// Results for identifiers outside the batch (neighbours) that were stored
    pub extra: usize,
    /// Providers skipped because they were unavailable
    pub providers_skipped: usize,
    /// Providers that failed or panicked
    pub provider_failures: usize,
    /// Cache writes that failed
    pub write_failures: usize,
}

impl DispatchReport {
    pub fn merge(&mut self, other: &DispatchReport) {
        self.attempted += other.attempted;
        self.located += other.located;
        self.reported_missing += other.reported_missing;
        self.exhausted += other.exhausted;
        self.extra += other.extra;
        self.providers_skipped += other.providers_skipped;
        self.provider_failures += other.provider_failures;
        self.write_failures += other.write_failures;
    }
}

pub struct SourceChainDispatcher<T: Locatable> {
    providers: ProviderList<T>,
    cache: Arc<dyn LocationCache>,
}

impl<T: Locatable> SourceChainDispatcher<T> {
    pub fn new(providers: ProviderList<T>, cache: Arc<dyn LocationCache>) -> Self {
        Self { providers, cache }
    }

    /// Resolve `batch`, leaving exactly one cache entry per identifier
    pub async fn dispatch(&self, batch: Vec<T>) -> DispatchReport {
        let kind = T::KIND;
        let mut todo = batch;
        let mut report = DispatchReport {
            attempted: todo.len(),
            ..Default::default()
        };

        for provider in self.providers.iter() {
            if todo.is_empty() {
                break;
            }

            if !provider.is_available() {
                debug!(
                    kind = %kind,
                    provider = provider.name(),
                    "Source is currently not available"
                );
                report.providers_skipped += 1;
                continue;
            }

            debug!(
                kind = %kind,
                provider = provider.name(),
                remaining = todo.len(),
                "Retrieving locations"
            );

            let outcome =
                execute_guarded(self.drain_provider(provider.as_ref(), &mut todo, &mut report))
                    .await;

            match outcome {
                PanicGuardResult::Success(Ok(())) => {}
                PanicGuardResult::Success(Err(e)) => {
                    warn!(
                        kind = %kind,
                        provider = provider.name(),
                        error = %e,
                        remaining = todo.len(),
                        "Source caused a problem, trying next"
                    );
                    report.provider_failures += 1;
                }
                PanicGuardResult::Panicked(msg) => {
                    let e = ProviderError::Panicked(msg);
                    warn!(
                        kind = %kind,
                        provider = provider.name(),
                        error = %e,
                        remaining = todo.len(),
                        "Source caused a problem, trying next"
                    );
                    report.provider_failures += 1;
                }
            }
        }

        if !todo.is_empty() {
            debug!(
                kind = %kind,
                count = todo.len(),
                "No source could resolve identifiers, storing as unresolvable"
            );
        }
        for identifier in todo.drain(..) {
            if self.commit(ResolutionResult::unresolved(identifier)).await {
                report.exhausted += 1;
            } else {
                report.write_failures += 1;
            }
        }

        report
    }

    /// Consume one provider's stream, committing each result as it arrives
    ///
    /// An identifier leaves `todo` only after its cache write succeeded, so a
    /// failure at any point leaves `todo` holding exactly what still lacks
    /// an entry. A result with an invalid location counts as a provider
    /// failure and is never stored.
    async fn drain_provider(
        &self,
        provider: &dyn LocationProvider<T>,
        todo: &mut Vec<T>,
        report: &mut DispatchReport,
    ) -> Result<(), ProviderError> {
        let request = todo.clone();
        let mut results = provider.retrieve(&request);

        while let Some(item) = results.next().await {
            let result = item?;
            if let Some(location) = &result.location {
                location.validate().map_err(|e| {
                    ProviderError::InvalidResponse(format!("{}: {}", result.identifier, e))
                })?;
            }
            let identifier = result.identifier.clone();
            let located = result.is_resolved();

            if !self.commit(result).await {
                report.write_failures += 1;
                continue;
            }

            match todo.iter().position(|pending| *pending == identifier) {
                Some(index) => {
                    todo.swap_remove(index);
                    if located {
                        report.located += 1;
                    } else {
                        report.reported_missing += 1;
                    }
                }
                None => report.extra += 1,
            }
        }

        Ok(())
    }

    async fn commit(&self, result: ResolutionResult<T>) -> bool {
        let result = result.into_untyped();
        match self.cache.put(&result).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    identifier = %result.identifier,
                    error = %e,
                    "Failed to store resolution result"
                );
                false
            }
        }
    }
}
