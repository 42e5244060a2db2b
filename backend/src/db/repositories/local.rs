//! In-memory [`TripRepository`] implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult, TripRepository};
use crate::models::{TripId, TripMetrics};

/// Thread-safe map of trip metrics rows.
#[derive(Debug, Clone, Default)]
pub struct LocalRepository {
    rows: Arc<RwLock<HashMap<TripId, TripMetrics>>>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a repository with existing rows.
    pub fn with_rows(rows: impl IntoIterator<Item = TripMetrics>) -> Self {
        let repo = Self::new();
        {
            let mut guard = repo.rows.write();
            for row in rows {
                guard.insert(row.trip_id, row);
            }
        }
        repo
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl TripRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }

    async fn get_trip_metrics(&self, trip_id: TripId) -> RepositoryResult<Option<TripMetrics>> {
        Ok(self.rows.read().get(&trip_id).cloned())
    }

    async fn get_many_trip_metrics(
        &self,
        trip_ids: &[TripId],
    ) -> RepositoryResult<Vec<TripMetrics>> {
        let guard = self.rows.read();
        Ok(trip_ids
            .iter()
            .filter_map(|id| guard.get(id).cloned())
            .collect())
    }

    async fn upsert_trip_metrics(&self, metrics: TripMetrics) -> RepositoryResult<()> {
        if metrics.trip_id.value() <= 0 {
            return Err(RepositoryError::InvalidRow {
                message: "trip id must be positive".into(),
                context: ErrorContext::new("upsert_trip_metrics").for_trip(metrics.trip_id),
            });
        }
        self.rows.write().insert(metrics.trip_id, metrics);
        Ok(())
    }

    async fn list_trip_metrics(&self) -> RepositoryResult<Vec<TripMetrics>> {
        let mut rows: Vec<TripMetrics> = self.rows.read().values().cloned().collect();
        rows.sort_by_key(|m| m.trip_id);
        Ok(rows)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
