//! Single-flight fetch coordination
//!
//! Only one fetch per panel may be in flight: starting a new one aborts
//! the previous future, so a stale response can never overwrite state
//! built from a newer one.

use futures::future::{abortable, AbortHandle, Aborted};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use failsift_domain::ErrorData;

use crate::error::ProviderError;
use crate::provider::ErrorLineProvider;

/// Hands out fetch futures and aborts the previous one on every start.
pub struct SingleFlightFetcher<P> {
    provider: Arc<P>,
    current: Option<AbortHandle>,
}

impl<P: ErrorLineProvider + 'static> SingleFlightFetcher<P> {
    pub fn new(provider: Arc<P>) -> Self {
        SingleFlightFetcher {
            provider,
            current: None,
        }
    }

    /// Start a fetch for `job_id`, aborting any fetch still in flight.
    ///
    /// The returned future resolves to `ProviderError::Aborted` if a later
    /// `start` supersedes it.
    pub fn start(
        &mut self,
        job_id: u64,
    ) -> impl Future<Output = Result<ErrorData, ProviderError>> {
        if let Some(previous) = self.current.take() {
            debug!(job_id, "aborting in-flight fetch");
            previous.abort();
        }

        let provider = Arc::clone(&self.provider);
        let (fut, handle) = abortable(async move { provider.fetch(job_id).await });
        self.current = Some(handle);

        async move {
            match fut.await {
                Ok(result) => result,
                Err(Aborted) => Err(ProviderError::Aborted),
            }
        }
    }

    /// Abort the in-flight fetch, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.abort();
        }
    }
}
