use std::sync::Arc;

use crate::{
    services::{
        comparison::{SharedStore, SharedRunLock},
        providers::SharedProvider,
        retry::RetryPolicy,
        ComparisonJob, ComparisonService, LocalRunLock,
    },
    store::MemoryResultStore,
};

/// Shared application state
///
/// The trigger endpoint goes through `comparisons`; the read endpoints only
/// ever touch `store`.
#[derive(Clone)]
pub struct AppState {
    pub comparisons: ComparisonService,
    pub store: SharedStore,
}

impl AppState {
    /// Wires a provider, store and run lock into application state
    pub fn new(
        provider: SharedProvider,
        store: SharedStore,
        lock: SharedRunLock,
        retry: RetryPolicy,
    ) -> Self {
        let job = ComparisonJob::new(provider, store.clone(), retry);
        Self {
            comparisons: ComparisonService::new(job, lock),
            store,
        }
    }

    /// State backed by the in-memory store and a process-local run lock
    pub fn in_memory(provider: SharedProvider, retry: RetryPolicy) -> Self {
        Self::new(
            provider,
            Arc::new(MemoryResultStore::new()),
            Arc::new(LocalRunLock::new()),
            retry,
        )
    }
}
