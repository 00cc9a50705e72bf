// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Cluster object model.
//!
//! Defines the WebSite resource, the children it owns, and the pure
//! generator that derives those children from it.

pub mod manifests;
pub mod types;
pub mod validation;

pub use manifests::{child_key, child_name, desired_child, desired_children, ChildKind};
pub use types::{
    ApiStatus, Deployment, Object, ObjectKey, ObjectMeta, OwnerReference, Pod, Resource,
    ResourceKind, Service, WebSite, WebSiteSpec, WebSiteStatus,
};
pub use validation::ValidationError;
