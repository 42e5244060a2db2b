//! Bounded pool for long-running background jobs.
//!
//! A job holds one permit for its whole lifetime; submissions beyond the pool
//! size wait for a permit. Each job runs in its own task so a panic is
//! contained and reported back as [`WorkerError::Panicked`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker pool is closed")]
    Closed,

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was cancelled")]
    Cancelled,
}

impl From<JoinError> for WorkerError {
    fn from(err: JoinError) -> Self {
        if err.is_cancelled() {
            return WorkerError::Cancelled;
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        WorkerError::Panicked(message)
    }
}

#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    /// Create a pool with `size` workers. A size of 0 is raised to 1.
    pub fn new(size: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(size.max(1))),
        }
    }

    /// Queue `task` and run it once a worker is free.
    pub fn submit<F, T>(&self, task: F) -> JoinHandle<Result<T, WorkerError>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::Closed)?;
            tokio::spawn(task).await.map_err(WorkerError::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_returns_task_output() {
        let pool = WorkerPool::new(2);
        let out = pool.submit(async { 21 * 2 }).await.unwrap().unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                pool.submit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let pool = WorkerPool::new(1);
        let result = pool
            .submit(async {
                panic!("boom");
            })
            .await
            .unwrap();
        match result {
            Err(WorkerError::Panicked(msg)) => assert!(msg.contains("boom")),
            other => panic!("expected panic error, got {:?}", other),
        }

        // the permit is released and the pool keeps working
        assert_eq!(pool.submit(async { 1 }).await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_zero_size_still_runs_jobs() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.submit(async { "ran" }).await.unwrap().unwrap(), "ran");
    }
}
