// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! State store abstraction.
//!
//! The operator reads and writes objects only through [`StateStore`]. The
//! store owns persistence, identity assignment (uid, resource version) and
//! cascading deletion through owner references; the control loop relies on
//! those guarantees without implementing them.

pub mod memory;
pub mod seed;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::k8s::{ApiStatus, Object, ObjectKey, Resource, ResourceKind};

pub use memory::InMemoryStore;
pub use seed::{seed_from_file, SeedError};

/// Errors returned by store operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: ResourceKind, key: ObjectKey },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: ResourceKind, key: ObjectKey },

    #[error("{kind} {key} was modified since version {observed}")]
    Conflict {
        kind: ResourceKind,
        key: ObjectKey,
        observed: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid object: {0}")]
    Invalid(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// One notification on a change-stream.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Added(Resource),
    Modified(Resource),
    Deleted(Resource),
    /// Progress marker carrying only a resource version.
    Bookmark(Resource),
    /// The server aborted the stream.
    Error(ApiStatus),
}

impl WatchEvent {
    /// Wire name of the action tag.
    pub fn action(&self) -> &'static str {
        match self {
            WatchEvent::Added(_) => "ADDED",
            WatchEvent::Modified(_) => "MODIFIED",
            WatchEvent::Deleted(_) => "DELETED",
            WatchEvent::Bookmark(_) => "BOOKMARK",
            WatchEvent::Error(_) => "ERROR",
        }
    }

    /// The object payload; error notifications carry none.
    pub fn object(&self) -> Option<&Resource> {
        match self {
            WatchEvent::Added(r)
            | WatchEvent::Modified(r)
            | WatchEvent::Deleted(r)
            | WatchEvent::Bookmark(r) => Some(r),
            WatchEvent::Error(_) => None,
        }
    }
}

/// Ordered, long-lived feed of notifications for one collection.
pub type WatchStream = BoxStream<'static, Result<WatchEvent, StoreError>>;

/// Key-addressed access to cluster objects.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch one object; absence is [`StoreError::NotFound`].
    async fn get(&self, kind: ResourceKind, key: &ObjectKey) -> Result<Resource, StoreError>;

    /// All objects of `kind`, optionally restricted to one namespace.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Resource>, StoreError>;

    /// Create a new object and return it as stored.
    async fn create(&self, resource: Resource) -> Result<Resource, StoreError>;

    /// Replace an object. The object's `resource_version` is the version the
    /// caller last observed; a stale version is a [`StoreError::Conflict`].
    async fn update(&self, resource: Resource) -> Result<Resource, StoreError>;

    /// Subscribe to changes of `kind`, optionally within one namespace.
    async fn watch(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<WatchStream, StoreError>;
}

/// Typed [`StateStore::get`].
pub async fn fetch<T: Object>(
    store: &(impl StateStore + ?Sized),
    key: &ObjectKey,
) -> Result<T, StoreError> {
    let resource = store.get(T::KIND, key).await?;
    let actual = resource.kind();
    T::from_resource(resource).ok_or_else(|| {
        StoreError::Invalid(format!("expected {} at {}, store returned {}", T::KIND, key, actual))
    })
}
