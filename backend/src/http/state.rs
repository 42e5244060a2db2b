//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::TripRepository;
use crate::services::{ComparisonOrchestrator, ProgressStore};
use crate::source::TripDataSource;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runs comparison jobs; also owns the source, repository and progress store
    pub orchestrator: ComparisonOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: ComparisonOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn repository(&self) -> &Arc<dyn TripRepository> {
        self.orchestrator.repository()
    }

    pub fn source(&self) -> &Arc<dyn TripDataSource> {
        self.orchestrator.source()
    }

    pub fn progress(&self) -> &ProgressStore {
        self.orchestrator.progress()
    }
}
