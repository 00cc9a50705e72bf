// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-process object store.
//!
//! Linearizable per key (a single lock guards the object map), assigns uids
//! and monotonically increasing resource versions, fans every write out to
//! watchers over a broadcast channel, and garbage-collects owned objects
//! when their owner is deleted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use parking_lot::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{StateStore, StoreError, WatchEvent, WatchStream};
use crate::k8s::{ApiStatus, ObjectKey, Resource, ResourceKind};

/// Default number of notifications buffered per watcher.
pub const DEFAULT_WATCH_BUFFER: usize = 1024;

type StoreKey = (ResourceKind, ObjectKey);

/// Thread-safe in-memory implementation of [`StateStore`].
pub struct InMemoryStore {
    objects: RwLock<BTreeMap<StoreKey, Resource>>,
    version: AtomicU64,
    events: broadcast::Sender<WatchEvent>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_watch_buffer(DEFAULT_WATCH_BUFFER)
    }

    /// A store whose watchers fail with a lag error once more than `buffer`
    /// notifications are pending for them.
    pub fn with_watch_buffer(buffer: usize) -> Self {
        let (events, _) = broadcast::channel(buffer.max(1));
        Self {
            objects: RwLock::new(BTreeMap::new()),
            version: AtomicU64::new(0),
            events,
        }
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Callers that commit a write hold the object lock while publishing, so
    /// watchers see one key's events in commit order.
    fn publish(&self, event: WatchEvent) {
        // No receivers is not an error: nobody is watching yet.
        let _ = self.events.send(event);
    }

    /// Delete an object, then every object it transitively owns.
    ///
    /// Returns the objects removed, owner first.
    pub fn delete(&self, kind: ResourceKind, key: &ObjectKey) -> Result<Vec<Resource>, StoreError> {
        let mut removed = Vec::new();
        {
            let mut objects = self.objects.write();
            let root = objects
                .remove(&(kind, key.clone()))
                .ok_or_else(|| StoreError::NotFound {
                    kind,
                    key: key.clone(),
                })?;

            let mut pending = vec![root];
            while let Some(owner) = pending.pop() {
                if let Some(uid) = owner.metadata().uid.clone() {
                    let owned: Vec<StoreKey> = objects
                        .iter()
                        .filter(|(_, obj)| {
                            obj.metadata().owner_references.iter().any(|r| r.uid == uid)
                        })
                        .map(|(k, _)| k.clone())
                        .collect();
                    for owned_key in owned {
                        if let Some(obj) = objects.remove(&owned_key) {
                            pending.push(obj);
                        }
                    }
                }
                removed.push(owner);
            }

            for obj in &removed {
                debug!(kind = %obj.kind(), key = %obj.key(), "deleted");
                self.publish(WatchEvent::Deleted(obj.clone()));
            }
        }
        Ok(removed)
    }

    /// Abort every open watch with an error notification.
    pub fn fail_watches(&self, status: ApiStatus) {
        warn!(%status, "failing open watches");
        self.publish(WatchEvent::Error(status));
    }

    /// Number of stored objects of every kind.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_scope(event: &WatchEvent, kind: ResourceKind, namespace: Option<&str>) -> bool {
    match event.object() {
        // Stream failures reach every watcher.
        None => true,
        Some(obj) => {
            obj.kind() == kind && namespace.map_or(true, |ns| obj.metadata().namespace == ns)
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> Result<Resource, StoreError> {
        self.objects
            .read()
            .get(&(kind, key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind,
                key: key.clone(),
            })
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Resource>, StoreError> {
        Ok(self
            .objects
            .read()
            .iter()
            .filter(|((k, key), _)| *k == kind && namespace.map_or(true, |ns| key.namespace == ns))
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    async fn create(&self, mut resource: Resource) -> Result<Resource, StoreError> {
        let kind = resource.kind();
        let key = resource.key();
        if key.name.is_empty() {
            return Err(StoreError::Invalid(format!("{kind} without a name")));
        }

        let stored = {
            let mut objects = self.objects.write();
            let slot = (kind, key.clone());
            if objects.contains_key(&slot) {
                return Err(StoreError::AlreadyExists { kind, key });
            }

            let meta = resource.metadata_mut();
            meta.uid = Some(Uuid::new_v4().to_string());
            meta.resource_version = Some(self.next_version());
            meta.creation_timestamp = Some(Utc::now());

            objects.insert(slot, resource.clone());
            self.publish(WatchEvent::Added(resource.clone()));
            resource
        };

        debug!(%kind, %key, "created");
        Ok(stored)
    }

    async fn update(&self, mut resource: Resource) -> Result<Resource, StoreError> {
        let kind = resource.kind();
        let key = resource.key();

        let stored = {
            let mut objects = self.objects.write();
            let slot = (kind, key.clone());
            let current = objects.get(&slot).ok_or_else(|| StoreError::NotFound {
                kind,
                key: key.clone(),
            })?;

            let current_meta = current.metadata();
            if let Some(observed) = &resource.metadata().resource_version {
                if current_meta.resource_version.as_ref() != Some(observed) {
                    return Err(StoreError::Conflict {
                        kind,
                        key,
                        observed: observed.clone(),
                    });
                }
            }

            let uid = current_meta.uid.clone();
            let created = current_meta.creation_timestamp;
            let meta = resource.metadata_mut();
            meta.uid = uid;
            meta.creation_timestamp = created;
            meta.resource_version = Some(self.next_version());

            objects.insert(slot, resource.clone());
            self.publish(WatchEvent::Modified(resource.clone()));
            resource
        };

        debug!(%kind, %key, "updated");
        Ok(stored)
    }

    async fn watch(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<WatchStream, StoreError> {
        let namespace = namespace.map(str::to_string);
        let rx = self.events.subscribe();

        let stream = futures::stream::unfold(rx, move |mut rx| {
            let namespace = namespace.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(event) if matches_scope(&event, kind, namespace.as_deref()) => {
                            return Some((Ok(event), rx));
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(missed)) => {
                            let err = StoreError::Unavailable(format!(
                                "{kind} watch fell behind by {missed} events"
                            ));
                            return Some((Err(err), rx));
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
