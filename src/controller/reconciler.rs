// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! One convergence pass for one WebSite.
//!
//! A pass reads the parent, then walks the child kinds in fixed order and
//! performs at most one mutation before returning. Repeated passes drive the
//! children to the desired state: absent children are created, drifted
//! children are updated in place, and nothing is ever deleted here.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::drift;
use crate::k8s::validation::validate_site;
use crate::k8s::{child_key, desired_child, ChildKind, ObjectKey, ResourceKind, ValidationError, WebSite};
use crate::store::{fetch, StateStore, StoreError};

/// What a child mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildChange {
    /// The child was absent and has been created.
    Created,
    /// Another writer created the child first.
    CreateRaced,
    /// The child had drifted and has been updated.
    Updated,
    /// The child changed between read and update.
    UpdateConflicted,
}

impl ChildChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildChange::Created => "created",
            ChildChange::CreateRaced => "create_raced",
            ChildChange::Updated => "updated",
            ChildChange::UpdateConflicted => "update_conflicted",
        }
    }
}

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ReconcileOutcome {
    /// The WebSite no longer exists; its children are the store's to collect.
    ParentMissing,
    /// Every child exists and matches.
    Converged,
    /// One child was mutated, or a mutation raced another writer.
    Changed {
        kind: ChildKind,
        name: String,
        change: ChildChange,
    },
}

impl ReconcileOutcome {
    /// Whether the key must be processed again.
    pub fn requeue(&self) -> bool {
        matches!(self, ReconcileOutcome::Changed { .. })
    }

    /// Metric label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReconcileOutcome::ParentMissing => "parent_missing",
            ReconcileOutcome::Converged => "converged",
            ReconcileOutcome::Changed { .. } => "changed",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconcileError {
    #[error("failed to get {kind} {key}: {source}")]
    Fetch {
        kind: ResourceKind,
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("failed to create {kind} {key}: {source}")]
    Create {
        kind: ResourceKind,
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("failed to update {kind} {key}: {source}")]
    Update {
        kind: ResourceKind,
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("invalid WebSite {key}: {source}")]
    InvalidSpec {
        key: ObjectKey,
        #[source]
        source: ValidationError,
    },
}

impl ReconcileError {
    /// Identity of the object the failure concerns.
    pub fn key(&self) -> &ObjectKey {
        match self {
            ReconcileError::Fetch { key, .. }
            | ReconcileError::Create { key, .. }
            | ReconcileError::Update { key, .. }
            | ReconcileError::InvalidSpec { key, .. } => key,
        }
    }

    /// An invalid spec fails the same way until the WebSite is edited, and
    /// editing it triggers a new pass.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ReconcileError::InvalidSpec { .. })
    }
}

/// Converges the children of one WebSite per call.
pub struct Reconciler {
    store: Arc<dyn StateStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Run one pass for the WebSite at `key`.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ReconcileError> {
        let site: WebSite = match fetch(self.store.as_ref(), key).await {
            Ok(site) => site,
            Err(e) if e.is_not_found() => {
                debug!(namespace = %key.namespace, name = %key.name, "WebSite gone, nothing to do");
                return Ok(ReconcileOutcome::ParentMissing);
            }
            Err(source) => {
                return Err(ReconcileError::Fetch {
                    kind: ResourceKind::WebSite,
                    key: key.clone(),
                    source,
                })
            }
        };

        validate_site(&site).map_err(|source| ReconcileError::InvalidSpec {
            key: key.clone(),
            source,
        })?;

        for kind in ChildKind::ALL {
            if let Some(outcome) = self.reconcile_child(&site, kind).await? {
                return Ok(outcome);
            }
        }

        debug!(namespace = %key.namespace, name = %key.name, "WebSite converged");
        Ok(ReconcileOutcome::Converged)
    }

    /// Converge one child. `None` means it already matches.
    async fn reconcile_child(
        &self,
        site: &WebSite,
        kind: ChildKind,
    ) -> Result<Option<ReconcileOutcome>, ReconcileError> {
        let resource_kind = kind.resource_kind();
        let key = child_key(&site.metadata.key(), kind);
        let desired = desired_child(site, kind);

        let live = match self.store.get(resource_kind, &key).await {
            Ok(live) => live,
            Err(e) if e.is_not_found() => {
                let change = match self.store.create(desired).await {
                    Ok(_) => {
                        info!(kind = %resource_kind, namespace = %key.namespace, name = %key.name, "created child");
                        ChildChange::Created
                    }
                    Err(StoreError::AlreadyExists { .. }) => {
                        debug!(kind = %resource_kind, namespace = %key.namespace, name = %key.name, "child created concurrently");
                        ChildChange::CreateRaced
                    }
                    Err(source) => {
                        warn!(kind = %resource_kind, namespace = %key.namespace, name = %key.name, error = %source, "create failed");
                        return Err(ReconcileError::Create {
                            kind: resource_kind,
                            key,
                            source,
                        });
                    }
                };
                return Ok(Some(changed(kind, key, change)));
            }
            Err(source) => {
                return Err(ReconcileError::Fetch {
                    kind: resource_kind,
                    key,
                    source,
                })
            }
        };

        let Some((patched, fields)) = drift::patch(&live, &desired) else {
            return Ok(None);
        };

        let change = match self.store.update(patched).await {
            Ok(_) => {
                info!(
                    kind = %resource_kind,
                    namespace = %key.namespace,
                    name = %key.name,
                    fields = ?fields,
                    "updated drifted child"
                );
                ChildChange::Updated
            }
            Err(StoreError::Conflict { .. }) => {
                debug!(kind = %resource_kind, namespace = %key.namespace, name = %key.name, "child changed since read");
                ChildChange::UpdateConflicted
            }
            Err(source) => {
                warn!(kind = %resource_kind, namespace = %key.namespace, name = %key.name, error = %source, "update failed");
                return Err(ReconcileError::Update {
                    kind: resource_kind,
                    key,
                    source,
                });
            }
        };
        Ok(Some(changed(kind, key, change)))
    }
}

fn changed(kind: ChildKind, key: ObjectKey, change: ChildChange) -> ReconcileOutcome {
    ReconcileOutcome::Changed {
        kind,
        name: key.name,
        change,
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
