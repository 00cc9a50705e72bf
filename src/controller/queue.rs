// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! De-duplicating work queue of WebSite keys.
//!
//! A key is queued at most once and handed to at most one worker at a time.
//! A key added while a worker holds it is marked dirty and queued again when
//! that worker calls [`WorkQueue::done`], so the latest trigger is never
//! lost and passes for one key never overlap.
//!
//! `capacity` bounds the ready queue. A key added while it is full is parked
//! behind it and promoted as workers take keys, so an accepted key always
//! reaches a worker.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

use crate::k8s::ObjectKey;
use crate::metrics;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("work queue shut down")]
    ShutDown,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<ObjectKey>,
    /// Keys accepted while `queue` was at capacity, in arrival order.
    parked: VecDeque<ObjectKey>,
    /// Keys waiting to be processed, queued or not.
    dirty: HashSet<ObjectKey>,
    /// Keys currently held by a worker.
    processing: HashSet<ObjectKey>,
    shutting_down: bool,
}

pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
}

impl WorkQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    /// Queue `key` unless it is already waiting.
    ///
    /// Fails only after [`WorkQueue::shut_down`].
    pub fn add(&self, key: ObjectKey) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.shutting_down {
            return Err(QueueError::ShutDown);
        }
        if state.dirty.contains(&key) {
            return Ok(());
        }
        if state.processing.contains(&key) {
            // Queued again by `done`.
            state.dirty.insert(key);
            return Ok(());
        }

        state.dirty.insert(key.clone());
        if state.queue.len() >= self.capacity {
            debug!(namespace = %key.namespace, name = %key.name, "work queue full, parking key");
            metrics::record_queue_parked();
            state.parked.push_back(key);
            return Ok(());
        }
        state.queue.push_back(key);
        drop(state);
        self.notify.notify_one();
        Ok(())
    }

    /// Queue `key` once `delay` has elapsed.
    pub fn add_after(self: &Arc<Self>, key: ObjectKey, delay: Duration) {
        if delay.is_zero() {
            if self.add(key.clone()).is_err() {
                debug!(namespace = %key.namespace, name = %key.name, "requeue after shutdown");
            }
            return;
        }

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if queue.add(key.clone()).is_err() {
                debug!(namespace = %key.namespace, name = %key.name, "delayed requeue after shutdown");
            }
        });
    }

    /// Wait for the next key. `None` once the queue is shut down.
    ///
    /// The caller owns the key until it calls [`WorkQueue::done`].
    pub async fn get(&self) -> Option<ObjectKey> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    if let Some(next) = state.parked.pop_front() {
                        state.queue.push_back(next);
                    }
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }

            notified.await;
        }
    }

    /// Release `key`, queueing it again if it was added while held.
    pub fn done(&self, key: &ObjectKey) {
        let mut state = self.state.lock();
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            debug!(namespace = %key.namespace, name = %key.name, "re-queueing key added during processing");
            if state.queue.len() >= self.capacity {
                state.parked.push_back(key.clone());
                return;
            }
            state.queue.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Reject further adds and wake every waiting worker.
    pub fn shut_down(&self) {
        self.state.lock().shutting_down = true;
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().shutting_down
    }

    /// Keys queued or parked and not yet handed out.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.queue.len() + state.parked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently held by workers.
    pub fn in_flight(&self) -> usize {
        self.state.lock().processing.len()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
