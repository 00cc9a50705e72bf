// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Trigger source for the controller.
//!
//! Watches WebSites and the child kinds, maps every notification to the key
//! of the WebSite it concerns and feeds that key to the work queue. Delivery
//! is at-least-once; the queue collapses duplicates.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::WorkQueue;
use crate::k8s::{ChildKind, ObjectKey, Resource, ResourceKind};
use crate::store::{StateStore, StoreError, WatchEvent, WatchStream};

/// The WebSite a notification about `resource` should reconcile.
///
/// A WebSite maps to itself, a child to the WebSite named by its controller
/// reference. Objects with no WebSite controller map to nothing.
pub fn parent_of(resource: &Resource) -> Option<ObjectKey> {
    match resource {
        Resource::WebSite(site) => Some(site.metadata.key()),
        other => {
            let meta = other.metadata();
            meta.controller_owner()
                .filter(|owner| owner.kind == ResourceKind::WebSite.as_str())
                .map(|owner| ObjectKey::new(meta.namespace.clone(), owner.name.clone()))
        }
    }
}

/// Key to enqueue for one notification, if any.
pub fn trigger_for(event: &WatchEvent) -> Option<ObjectKey> {
    match event {
        WatchEvent::Added(obj) | WatchEvent::Modified(obj) | WatchEvent::Deleted(obj) => {
            parent_of(obj)
        }
        WatchEvent::Bookmark(_) | WatchEvent::Error(_) => None,
    }
}

/// Kinds whose changes trigger a pass.
pub fn watched_kinds() -> Vec<ResourceKind> {
    std::iter::once(ResourceKind::WebSite)
        .chain(ChildKind::ALL.iter().map(|k| k.resource_kind()))
        .collect()
}

/// Subscribed change-streams plus the WebSites that existed at subscribe
/// time.
pub struct TriggerSource {
    streams: Vec<(ResourceKind, WatchStream)>,
    initial: Vec<ObjectKey>,
    namespace: Option<String>,
}

impl TriggerSource {
    /// Open one watch per triggering kind, then list the existing WebSites.
    ///
    /// Watches open before the list so that no change falls between them.
    pub async fn subscribe(
        store: &(impl StateStore + ?Sized),
        namespace: Option<&str>,
    ) -> Result<Self, StoreError> {
        let mut streams = Vec::new();
        for kind in watched_kinds() {
            streams.push((kind, store.watch(kind, namespace).await?));
        }
        let initial = store
            .list(ResourceKind::WebSite, namespace)
            .await?
            .iter()
            .map(Resource::key)
            .collect();
        Ok(Self {
            streams,
            initial,
            namespace: namespace.map(str::to_string),
        })
    }

    /// Feed `queue` until `shutdown` is cancelled or every stream has ended.
    ///
    /// A stream error or an error notification means notifications may have
    /// been lost, so every WebSite in scope is enqueued again.
    pub async fn run(
        self,
        store: &(impl StateStore + ?Sized),
        queue: &WorkQueue,
        shutdown: CancellationToken,
    ) {
        let namespace = self.namespace;
        for key in self.initial {
            enqueue(queue, key);
        }

        let mut merged = stream::select_all(
            self.streams
                .into_iter()
                .map(|(kind, s)| s.map(move |item| (kind, item)).boxed()),
        );

        loop {
            let item = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                item = merged.next() => item,
            };

            match item {
                Some((kind, Ok(WatchEvent::Error(status)))) => {
                    warn!(%kind, %status, "trigger stream aborted by server, resyncing");
                    resync(store, queue, namespace.as_deref()).await;
                }
                Some((_, Ok(event))) => {
                    if let Some(key) = trigger_for(&event) {
                        debug!(action = event.action(), namespace = %key.namespace, name = %key.name, "trigger");
                        enqueue(queue, key);
                    }
                }
                Some((kind, Err(e))) => {
                    warn!(%kind, error = %e, "trigger stream error, resyncing");
                    resync(store, queue, namespace.as_deref()).await;
                }
                None => {
                    warn!("all trigger streams ended");
                    break;
                }
            }
        }
        info!("trigger source stopped");
    }
}

async fn resync(store: &(impl StateStore + ?Sized), queue: &WorkQueue, namespace: Option<&str>) {
    match store.list(ResourceKind::WebSite, namespace).await {
        Ok(sites) => {
            for site in &sites {
                enqueue(queue, site.key());
            }
        }
        Err(e) => warn!(error = %e, "resync list failed"),
    }
}

fn enqueue(queue: &WorkQueue, key: ObjectKey) {
    if queue.add(key.clone()).is_err() {
        debug!(namespace = %key.namespace, name = %key.name, "trigger after queue shutdown");
    }
}

#[cfg(test)]
#[path = "triggers_tests.rs"]
mod tests;
