// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Event watch loop.
//!
//! Consumes a collection's change-stream and hands one [`ChangeEvent`] per
//! object notification to a sink, in stream order. Anything the loop cannot
//! classify ends it with an error; cancellation ends it cleanly.

use futures::StreamExt;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::event::{ChangeAction, ChangeEvent};
use super::sink::{EventSink, SinkError};
use crate::k8s::{ApiStatus, ResourceKind};
use crate::metrics;
use crate::store::{StateStore, StoreError, WatchEvent, WatchStream};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to watch {kind}: {source}")]
    Subscribe {
        kind: ResourceKind,
        #[source]
        source: StoreError,
    },

    #[error("{kind} watch stream failed: {source}")]
    Stream {
        kind: ResourceKind,
        #[source]
        source: StoreError,
    },

    #[error("{kind} watch aborted by server: {status}")]
    ErrorEvent { kind: ResourceKind, status: ApiStatus },

    #[error("unexpected {action} notification on {kind} watch")]
    UnexpectedAction {
        kind: ResourceKind,
        action: &'static str,
    },

    #[error("{kind} watch stream ended")]
    StreamEnded { kind: ResourceKind },

    #[error("failed to deliver event: {0}")]
    Sink(#[from] SinkError),
}

/// Counts for a loop that ended by cancellation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatchSummary {
    pub emitted: u64,
    pub skipped: u64,
}

/// How one notification is handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Emit(ChangeEvent),
    /// Payload of another kind.
    Skip,
}

/// Classify one notification for a watch on `kind`.
///
/// Error notifications are checked first: they carry no object, so there
/// is no kind to compare.
pub fn classify(event: &WatchEvent, kind: ResourceKind) -> Result<Classified, WatchError> {
    let (action, object) = match event {
        WatchEvent::Error(status) => {
            return Err(WatchError::ErrorEvent {
                kind,
                status: status.clone(),
            })
        }
        WatchEvent::Added(obj) => (Some(ChangeAction::Created), obj),
        WatchEvent::Modified(obj) => (Some(ChangeAction::Modified), obj),
        WatchEvent::Deleted(obj) => (Some(ChangeAction::Deleted), obj),
        WatchEvent::Bookmark(obj) => (None, obj),
    };

    if object.kind() != kind {
        return Ok(Classified::Skip);
    }

    match action {
        Some(action) => {
            let meta = object.metadata();
            Ok(Classified::Emit(ChangeEvent::new(
                action,
                meta.namespace.clone(),
                meta.name.clone(),
            )))
        }
        None => Err(WatchError::UnexpectedAction {
            kind,
            action: event.action(),
        }),
    }
}

/// Run until `shutdown` is cancelled or the stream fails.
///
/// Cancellation wins over pending stream data, so once `shutdown` is
/// cancelled nothing further is emitted. An event already taken from the
/// stream is always delivered before cancellation is checked again.
pub async fn run_watch_loop<S>(
    mut stream: WatchStream,
    kind: ResourceKind,
    sink: &mut S,
    shutdown: &CancellationToken,
) -> Result<WatchSummary, WatchError>
where
    S: EventSink + ?Sized,
{
    let mut summary = WatchSummary::default();

    loop {
        let item = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!(%kind, emitted = summary.emitted, "watch cancelled");
                return Ok(summary);
            }
            item = stream.next() => item,
        };

        let event = match item {
            Some(Ok(event)) => event,
            Some(Err(source)) => {
                error!(%kind, error = %source, "watch stream failed");
                return Err(WatchError::Stream { kind, source });
            }
            None => {
                error!(%kind, "watch stream ended");
                return Err(WatchError::StreamEnded { kind });
            }
        };

        match classify(&event, kind) {
            Ok(Classified::Emit(change)) => {
                debug!(%kind, action = %change.action, namespace = %change.namespace, name = %change.name, "change");
                metrics::record_watch_event(change.action);
                sink.emit(change).await?;
                summary.emitted += 1;
            }
            Ok(Classified::Skip) => {
                summary.skipped += 1;
            }
            Err(e) => {
                error!(%kind, error = %e, "watch aborted");
                return Err(e);
            }
        }
    }
}

/// Subscribe to `kind` in `namespace` (all namespaces when `None`) and run
/// the loop on the resulting stream.
pub async fn watch_collection<S>(
    store: &(impl StateStore + ?Sized),
    kind: ResourceKind,
    namespace: Option<&str>,
    sink: &mut S,
    shutdown: &CancellationToken,
) -> Result<WatchSummary, WatchError>
where
    S: EventSink + ?Sized,
{
    let stream = store
        .watch(kind, namespace)
        .await
        .map_err(|source| WatchError::Subscribe { kind, source })?;
    info!(%kind, namespace = namespace.unwrap_or("*"), "watching");
    run_watch_loop(stream, kind, sink, shutdown).await
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
