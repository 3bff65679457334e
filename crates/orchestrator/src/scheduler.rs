//! Bounded scheduler - fixed worker pool over a shared queue
//!
//! `limit` long-lived workers drain a queue of `(index, item)` pairs. Each
//! worker takes the next item as soon as it finishes its current one, so
//! at most `limit` items are ever in flight. Results land in a slot vector
//! pre-sized to the input and written by index, so output order always
//! matches input order regardless of completion order.

use anyhow::anyhow;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::progress::ProgressTracker;

pub struct BoundedScheduler {
    limit: usize,
    progress: Arc<ProgressTracker>,
}

impl BoundedScheduler {
    /// A limit of 0 is treated as 1.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            progress: Arc::new(ProgressTracker::new()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Run `worker` over every item with bounded concurrency.
    ///
    /// A worker returning `Err`, or panicking, does not disturb its siblings:
    /// `on_failure` turns the item and the error into that slot's result.
    pub async fn run<T, R, W, Fut, E>(&self, items: Vec<T>, worker: W, on_failure: E) -> Vec<R>
    where
        T: Clone + Send + 'static,
        R: Send + 'static,
        W: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        E: Fn(T, anyhow::Error) -> R + Send + Sync + 'static,
    {
        let total = items.len();
        self.progress.set_total(total);
        if total == 0 {
            return Vec::new();
        }

        let pool_size = self.limit.min(total);
        debug!(total, pool_size, "starting worker pool");

        let originals = items.clone();
        let queue = Arc::new(Mutex::new(items.into_iter().enumerate().collect::<VecDeque<_>>()));
        let slots: Arc<Mutex<Vec<Option<R>>>> =
            Arc::new(Mutex::new((0..total).map(|_| None).collect()));
        let worker = Arc::new(worker);
        let on_failure = Arc::new(on_failure);

        let mut workers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let queue = queue.clone();
            let slots = slots.clone();
            let worker = worker.clone();
            let on_failure = on_failure.clone();
            let progress = self.progress.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let (index, item) = match next {
                        Some(entry) => entry,
                        None => break, // queue drained
                    };

                    progress.started();
                    // Own task per item so a panic is contained to this slot.
                    let outcome = tokio::spawn(worker(item.clone())).await;
                    let result = match outcome {
                        Ok(Ok(result)) => {
                            progress.finished(true);
                            result
                        }
                        Ok(Err(e)) => {
                            progress.finished(false);
                            on_failure(item, e)
                        }
                        Err(join) => {
                            progress.finished(false);
                            on_failure(item, anyhow!("worker panicked: {join}"))
                        }
                    };
                    slots.lock().await[index] = Some(result);
                }
            }));
        }

        for handle in workers {
            if let Err(e) = handle.await {
                error!(error = %e, "scheduler worker aborted");
            }
        }

        let filled = std::mem::take(&mut *slots.lock().await);
        self.progress.log_summary();

        filled
            .into_iter()
            .zip(originals)
            .map(|(slot, item)| match slot {
                Some(result) => result,
                None => on_failure(item, anyhow!("worker did not complete")),
            })
            .collect()
    }
}

/// One-shot form of [`BoundedScheduler::run`].
pub async fn map_concurrent<T, R, W, Fut, E>(items: Vec<T>, limit: usize, worker: W, on_failure: E) -> Vec<R>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    W: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    E: Fn(T, anyhow::Error) -> R + Send + Sync + 'static,
{
    BoundedScheduler::new(limit).run(items, worker, on_failure).await
}
