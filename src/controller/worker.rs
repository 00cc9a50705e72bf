// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Controller workers.
//!
//! A fixed pool of tasks pulls keys from the work queue and runs one
//! reconcile pass per key. The queue guarantees that passes for one key
//! never overlap; workers only decide when a key comes back.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::queue::WorkQueue;
use super::reconciler::{ReconcileError, Reconciler};
use crate::config::ControllerConfig;
use crate::k8s::ObjectKey;
use crate::metrics;
use crate::store::StateStore;

/// Delay before retry number `attempts` (1-based) of a failing key:
/// `base * 2^(attempts - 1)`, capped at `max`.
pub fn backoff_delay(base: Duration, max: Duration, attempts: u32) -> Duration {
    let factor = 1u32
        .checked_shl(attempts.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

/// Whole milliseconds in `delay`, saturating at `u64::MAX`.
fn delay_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// Reconcile workers sharing one queue.
#[derive(Clone)]
pub struct Controller {
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue>,
    config: ControllerConfig,
    /// Consecutive failures per key, cleared by the first success.
    failures: Arc<DashMap<ObjectKey, u32>>,
}

impl Controller {
    pub fn new(store: Arc<dyn StateStore>, config: ControllerConfig) -> Self {
        Self {
            reconciler: Arc::new(Reconciler::new(store)),
            queue: Arc::new(WorkQueue::new(config.queue_capacity)),
            config,
            failures: Arc::new(DashMap::new()),
        }
    }

    pub fn queue(&self) -> Arc<WorkQueue> {
        Arc::clone(&self.queue)
    }

    /// Consecutive failures recorded for `key`.
    pub fn failures(&self, key: &ObjectKey) -> u32 {
        self.failures.get(key).map_or(0, |n| *n)
    }

    /// Run workers until `shutdown` is cancelled.
    ///
    /// In-flight passes finish; queued keys are abandoned.
    pub async fn run(&self, shutdown: CancellationToken) {
        let workers = self.config.worker_count();
        info!(workers, "controller starting");

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let controller = self.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move { controller.worker_loop(id, shutdown).await })
            })
            .collect();

        shutdown.cancelled().await;
        self.queue.shut_down();

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "controller worker panicked");
            }
        }
        info!("controller stopped");
    }

    async fn worker_loop(&self, id: usize, shutdown: CancellationToken) {
        debug!(worker = id, "worker started");
        loop {
            let key = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                key = self.queue.get() => match key {
                    Some(key) => key,
                    None => break,
                },
            };

            self.process(&key).await;
            self.queue.done(&key);
        }
        debug!(worker = id, "worker stopped");
    }

    /// Run one pass for `key` and schedule its next one.
    pub async fn process(&self, key: &ObjectKey) {
        match self.reconciler.reconcile(key).await {
            Ok(outcome) => {
                metrics::record_pass(&outcome);
                self.failures.remove(key);
                if outcome.requeue() {
                    debug!(namespace = %key.namespace, name = %key.name, ?outcome, "requeue");
                    self.queue.add_after(key.clone(), self.config.requeue_delay());
                }
            }
            Err(e) => {
                metrics::record_error();
                self.handle_error(key, e);
            }
        }
    }

    fn handle_error(&self, key: &ObjectKey, err: ReconcileError) {
        if !err.is_retryable() {
            self.failures.remove(key);
            error!(
                namespace = %key.namespace,
                name = %key.name,
                error = %err,
                "reconcile failed, waiting for the WebSite to change"
            );
            return;
        }

        let attempts = {
            let mut entry = self.failures.entry(key.clone()).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };
        let delay = backoff_delay(self.config.backoff_base(), self.config.backoff_max(), attempts);
        warn!(
            namespace = %key.namespace,
            name = %key.name,
            error = %err,
            attempts,
            delay_ms = delay_millis(delay),
            "reconcile failed, retrying"
        );
        self.queue.add_after(key.clone(), delay);
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
