// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for the reconciliation pass.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::*;
use crate::k8s::manifests::CONTAINER_NAME;
use crate::k8s::{Deployment, Object, Resource, Service, WebSiteSpec};
use crate::store::{InMemoryStore, WatchStream};

/// Wraps an in-memory store and fails selected operations once.
#[derive(Default)]
struct FaultyStore {
    inner: InMemoryStore,
    fail_get: Mutex<Option<(ResourceKind, StoreError)>>,
    fail_create: Mutex<Option<StoreError>>,
    fail_update: Mutex<Option<StoreError>>,
    writes: Mutex<Vec<(&'static str, ResourceKind)>>,
}

#[async_trait]
impl StateStore for FaultyStore {
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> Result<Resource, StoreError> {
        let injected = {
            let mut slot = self.fail_get.lock();
            if slot.as_ref().map_or(false, |(k, _)| *k == kind) {
                slot.take().map(|(_, e)| e)
            } else {
                None
            }
        };
        match injected {
            Some(err) => Err(err),
            None => self.inner.get(kind, key).await,
        }
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Resource>, StoreError> {
        self.inner.list(kind, namespace).await
    }

    async fn create(&self, resource: Resource) -> Result<Resource, StoreError> {
        self.writes.lock().push(("create", resource.kind()));
        let injected = self.fail_create.lock().take();
        match injected {
            Some(err) => Err(err),
            None => self.inner.create(resource).await,
        }
    }

    async fn update(&self, resource: Resource) -> Result<Resource, StoreError> {
        self.writes.lock().push(("update", resource.kind()));
        let injected = self.fail_update.lock().take();
        match injected {
            Some(err) => Err(err),
            None => self.inner.update(resource).await,
        }
    }

    async fn watch(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<WatchStream, StoreError> {
        self.inner.watch(kind, namespace).await
    }
}

fn blog_key() -> ObjectKey {
    ObjectKey::new("default", "blog")
}

async fn setup(replicas: u32, image: &str) -> (Arc<FaultyStore>, Reconciler) {
    let store = Arc::new(FaultyStore::default());
    let site = WebSite::new(
        "default",
        "blog",
        WebSiteSpec {
            replicas,
            image_name: image.to_string(),
        },
    );
    store.inner.create(site.into()).await.unwrap();
    let reconciler = Reconciler::new(store.clone());
    (store, reconciler)
}

async fn converge(reconciler: &Reconciler) -> Vec<ReconcileOutcome> {
    let mut passes = Vec::new();
    loop {
        let outcome = reconciler.reconcile(&blog_key()).await.unwrap();
        let done = !outcome.requeue();
        passes.push(outcome);
        if done || passes.len() > 10 {
            return passes;
        }
    }
}

async fn set_replicas(store: &FaultyStore, replicas: u32) {
    let mut site: WebSite = fetch(&store.inner, &blog_key()).await.unwrap();
    site.spec.replicas = replicas;
    store.inner.update(site.into()).await.unwrap();
}

#[tokio::test]
async fn test_missing_parent_is_success_without_requeue() {
    let store = Arc::new(FaultyStore::default());
    let reconciler = Reconciler::new(store.clone());

    let outcome = reconciler.reconcile(&blog_key()).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::ParentMissing);
    assert!(!outcome.requeue());
    assert!(store.writes.lock().is_empty());
}

#[tokio::test]
async fn test_converges_from_empty_in_three_passes() {
    let (store, reconciler) = setup(3, "nginx").await;

    let passes = converge(&reconciler).await;
    assert_eq!(
        passes,
        vec![
            ReconcileOutcome::Changed {
                kind: ChildKind::Deployment,
                name: "blog-deployment".to_string(),
                change: ChildChange::Created,
            },
            ReconcileOutcome::Changed {
                kind: ChildKind::Service,
                name: "blog-service".to_string(),
                change: ChildChange::Created,
            },
            ReconcileOutcome::Converged,
        ]
    );
    assert_eq!(
        *store.writes.lock(),
        vec![("create", ResourceKind::Deployment), ("create", ResourceKind::Service)]
    );

    let dep: Deployment = fetch(&store.inner, &ObjectKey::new("default", "blog-deployment"))
        .await
        .unwrap();
    assert_eq!(dep.spec.replicas, 3);
    let svc: Service = fetch(&store.inner, &ObjectKey::new("default", "blog-service"))
        .await
        .unwrap();
    assert_eq!(svc.metadata.controller_owner().unwrap().name, "blog");
}

#[tokio::test]
async fn test_converged_pass_is_idempotent() {
    let (store, reconciler) = setup(1, "nginx").await;
    converge(&reconciler).await;
    let writes = store.writes.lock().len();

    for _ in 0..3 {
        assert_eq!(
            reconciler.reconcile(&blog_key()).await.unwrap(),
            ReconcileOutcome::Converged
        );
    }
    assert_eq!(store.writes.lock().len(), writes);
}

#[tokio::test]
async fn test_replica_drift_corrected_with_one_update() {
    let (store, reconciler) = setup(1, "nginx").await;
    converge(&reconciler).await;
    set_replicas(&store, 5).await;
    store.writes.lock().clear();

    let passes = converge(&reconciler).await;
    assert_eq!(
        passes[0],
        ReconcileOutcome::Changed {
            kind: ChildKind::Deployment,
            name: "blog-deployment".to_string(),
            change: ChildChange::Updated,
        }
    );
    assert_eq!(passes.last(), Some(&ReconcileOutcome::Converged));
    assert_eq!(*store.writes.lock(), vec![("update", ResourceKind::Deployment)]);

    let dep: Deployment = fetch(&store.inner, &ObjectKey::new("default", "blog-deployment"))
        .await
        .unwrap();
    assert_eq!(dep.spec.replicas, 5);
}

#[tokio::test]
async fn test_image_change_rolls_out() {
    let (store, reconciler) = setup(2, "nginx:1.24").await;
    converge(&reconciler).await;

    let mut site: WebSite = fetch(&store.inner, &blog_key()).await.unwrap();
    site.spec.image_name = "nginx:1.25".to_string();
    store.inner.update(site.into()).await.unwrap();

    converge(&reconciler).await;
    let dep: Deployment = fetch(&store.inner, &ObjectKey::new("default", "blog-deployment"))
        .await
        .unwrap();
    assert_eq!(dep.container(CONTAINER_NAME).unwrap().image, "nginx:1.25");
}

#[tokio::test]
async fn test_service_drift_repaired() {
    let (store, reconciler) = setup(1, "nginx").await;
    converge(&reconciler).await;

    let key = ObjectKey::new("default", "blog-service");
    let mut svc: Service = fetch(&store.inner, &key).await.unwrap();
    svc.spec.ports.clear();
    store.inner.update(svc.into()).await.unwrap();

    let outcome = reconciler.reconcile(&blog_key()).await.unwrap();
    assert!(matches!(
        outcome,
        ReconcileOutcome::Changed {
            kind: ChildKind::Service,
            change: ChildChange::Updated,
            ..
        }
    ));
    let svc: Service = fetch(&store.inner, &key).await.unwrap();
    assert_eq!(svc.spec.ports.len(), 1);
}

#[tokio::test]
async fn test_create_race_is_benign() {
    let (store, reconciler) = setup(1, "nginx").await;
    *store.fail_create.lock() = Some(StoreError::AlreadyExists {
        kind: ResourceKind::Deployment,
        key: ObjectKey::new("default", "blog-deployment"),
    });

    let outcome = reconciler.reconcile(&blog_key()).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::Changed {
            kind: ChildKind::Deployment,
            name: "blog-deployment".to_string(),
            change: ChildChange::CreateRaced,
        }
    );
    assert!(outcome.requeue());
}

/// Runs a second reconciler pass inside the first Deployment create, after
/// the first pass has seen the child missing and before its write lands.
#[derive(Default)]
struct InterleavingStore {
    inner: InMemoryStore,
    racer: Mutex<Option<Reconciler>>,
    racer_outcome: Mutex<Option<ReconcileOutcome>>,
    committed: Mutex<Vec<(&'static str, ResourceKind)>>,
}

#[async_trait]
impl StateStore for InterleavingStore {
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> Result<Resource, StoreError> {
        self.inner.get(kind, key).await
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Resource>, StoreError> {
        self.inner.list(kind, namespace).await
    }

    async fn create(&self, resource: Resource) -> Result<Resource, StoreError> {
        let kind = resource.kind();
        let racer = if kind == ResourceKind::Deployment {
            self.racer.lock().take()
        } else {
            None
        };
        if let Some(racer) = racer {
            let outcome = racer.reconcile(&blog_key()).await;
            *self.racer_outcome.lock() = outcome.ok();
        }

        let created = self.inner.create(resource).await?;
        self.committed.lock().push(("create", kind));
        Ok(created)
    }

    async fn update(&self, resource: Resource) -> Result<Resource, StoreError> {
        let kind = resource.kind();
        let updated = self.inner.update(resource).await?;
        self.committed.lock().push(("update", kind));
        Ok(updated)
    }

    async fn watch(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<WatchStream, StoreError> {
        self.inner.watch(kind, namespace).await
    }
}

#[tokio::test]
async fn test_overlapping_passes_create_child_once() {
    let store = Arc::new(InterleavingStore::default());
    let site = WebSite::new(
        "default",
        "blog",
        WebSiteSpec {
            replicas: 2,
            image_name: "nginx".to_string(),
        },
    );
    store.inner.create(site.into()).await.unwrap();
    *store.racer.lock() = Some(Reconciler::new(store.clone()));
    let reconciler = Reconciler::new(store.clone());

    let outcome = reconciler.reconcile(&blog_key()).await.unwrap();

    assert_eq!(
        store.racer_outcome.lock().clone(),
        Some(ReconcileOutcome::Changed {
            kind: ChildKind::Deployment,
            name: "blog-deployment".to_string(),
            change: ChildChange::Created,
        })
    );
    assert_eq!(
        outcome,
        ReconcileOutcome::Changed {
            kind: ChildKind::Deployment,
            name: "blog-deployment".to_string(),
            change: ChildChange::CreateRaced,
        }
    );
    assert_eq!(
        *store.committed.lock(),
        vec![("create", ResourceKind::Deployment)]
    );
    assert_eq!(
        store
            .inner
            .list(ResourceKind::Deployment, Some("default"))
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_update_conflict_is_benign() {
    let (store, reconciler) = setup(1, "nginx").await;
    converge(&reconciler).await;
    set_replicas(&store, 2).await;
    *store.fail_update.lock() = Some(StoreError::Conflict {
        kind: ResourceKind::Deployment,
        key: ObjectKey::new("default", "blog-deployment"),
        observed: "2".to_string(),
    });

    let outcome = reconciler.reconcile(&blog_key()).await.unwrap();
    assert!(matches!(
        outcome,
        ReconcileOutcome::Changed {
            change: ChildChange::UpdateConflicted,
            ..
        }
    ));

    // The retry lands.
    let passes = converge(&reconciler).await;
    assert_eq!(passes.last(), Some(&ReconcileOutcome::Converged));
}

#[tokio::test]
async fn test_parent_fetch_failure_surfaces() {
    let (store, reconciler) = setup(1, "nginx").await;
    *store.fail_get.lock() = Some((
        ResourceKind::WebSite,
        StoreError::Unavailable("connection refused".to_string()),
    ));

    let err = reconciler.reconcile(&blog_key()).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Fetch {
            kind: ResourceKind::WebSite,
            ..
        }
    ));
    assert_eq!(err.key(), &blog_key());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_child_fetch_failure_surfaces_with_child_identity() {
    let (store, reconciler) = setup(1, "nginx").await;
    *store.fail_get.lock() = Some((
        ResourceKind::Deployment,
        StoreError::Unavailable("timeout".to_string()),
    ));

    let err = reconciler.reconcile(&blog_key()).await.unwrap_err();
    assert_eq!(err.key(), &ObjectKey::new("default", "blog-deployment"));
    assert!(store.writes.lock().is_empty());
}

#[tokio::test]
async fn test_create_failure_surfaces() {
    let (store, reconciler) = setup(1, "nginx").await;
    *store.fail_create.lock() = Some(StoreError::Unavailable("quota".to_string()));

    let err = reconciler.reconcile(&blog_key()).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Create {
            kind: ResourceKind::Deployment,
            ..
        }
    ));
    assert!(err.to_string().contains("default/blog-deployment"));
}

#[tokio::test]
async fn test_update_failure_surfaces() {
    let (store, reconciler) = setup(1, "nginx").await;
    converge(&reconciler).await;
    set_replicas(&store, 4).await;
    *store.fail_update.lock() = Some(StoreError::Invalid("rejected".to_string()));

    let err = reconciler.reconcile(&blog_key()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Update { .. }));
}

#[tokio::test]
async fn test_invalid_spec_blocks_mutation() {
    let (store, reconciler) = setup(1, "nginx; rm -rf /").await;

    let err = reconciler.reconcile(&blog_key()).await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidSpec { .. }));
    assert!(!err.is_retryable());
    assert!(store.writes.lock().is_empty());
}

#[tokio::test]
async fn test_zero_replicas_converges() {
    let (store, reconciler) = setup(0, "nginx").await;
    let passes = converge(&reconciler).await;
    assert_eq!(passes.len(), 3);

    let dep: Deployment = fetch(&store.inner, &ObjectKey::new("default", "blog-deployment"))
        .await
        .unwrap();
    assert_eq!(dep.spec.replicas, 0);
}

#[tokio::test]
async fn test_children_owned_by_parent_uid() {
    let (store, reconciler) = setup(1, "nginx").await;
    converge(&reconciler).await;

    let site: WebSite = fetch(&store.inner, &blog_key()).await.unwrap();
    for kind in [ResourceKind::Deployment, ResourceKind::Service] {
        let children = store.inner.list(kind, Some("default")).await.unwrap();
        assert_eq!(children.len(), 1);
        let owner = children[0].metadata().controller_owner().unwrap().clone();
        assert_eq!(Some(owner.uid), site.metadata().uid.clone());
    }
}

#[test]
fn test_outcome_labels() {
    assert_eq!(ReconcileOutcome::Converged.as_label(), "converged");
    assert_eq!(ReconcileOutcome::ParentMissing.as_label(), "parent_missing");
    assert_eq!(ChildChange::UpdateConflicted.as_str(), "update_conflicted");
    let json = serde_json::to_value(ReconcileOutcome::Changed {
        kind: ChildKind::Service,
        name: "blog-service".to_string(),
        change: ChildChange::Created,
    })
    .unwrap();
    assert_eq!(json["outcome"], "changed");
    assert_eq!(json["change"], "created");
}
