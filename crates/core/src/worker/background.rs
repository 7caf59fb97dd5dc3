//! Detached work spawned while serving a request.
//!
//! Cache writes and stale-while-revalidate refreshes never hold up the
//! response they belong to. They are tracked here so the host can wait for
//! them before shutting down.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;

/// Set of detached tasks owned by a router.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    /// Spawn a task without waiting for it. Finished tasks are reaped first.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Number of tasks spawned and not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait until every task, including ones spawned meanwhile, has finished.
    pub async fn settle(&self) {
        loop {
            let mut batch = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
            if batch.is_empty() {
                break;
            }
            while let Some(result) = batch.join_next().await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "background task did not complete");
                }
            }
        }
    }
}
