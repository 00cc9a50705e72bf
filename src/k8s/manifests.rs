// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Desired children of a WebSite.
//!
//! Everything here is a pure function of the WebSite's identity and spec:
//! no clock, no randomness, ordered maps only. Child identities are derived,
//! never stored, so "the children of X" is always recomputed from X's key.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::types::{
    Container, ContainerPort, Deployment, DeploymentSpec, LabelSelector, ObjectKey, ObjectMeta,
    OwnerReference, PodSpec, PodTemplateSpec, PullPolicy, Resource, ResourceKind, Service,
    ServicePort, ServiceSpec, ServiceType, TemplateMeta, WebSite,
};

/// Port the web container listens on.
pub const CONTAINER_PORT: u16 = 80;
/// Port the service exposes.
pub const SERVICE_PORT: u16 = 80;
/// Name of the single container in the workload template.
pub const CONTAINER_NAME: &str = "web";
/// Name of the container port.
pub const PORT_NAME: &str = "http";

/// The fixed set of child kinds a WebSite owns, in reconcile order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ChildKind {
    Deployment,
    Service,
}

impl ChildKind {
    pub const ALL: [ChildKind; 2] = [ChildKind::Deployment, ChildKind::Service];

    pub fn resource_kind(self) -> ResourceKind {
        match self {
            ChildKind::Deployment => ResourceKind::Deployment,
            ChildKind::Service => ResourceKind::Service,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ChildKind::Deployment => "deployment",
            ChildKind::Service => "service",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.resource_kind(), f)
    }
}

/// `<parent-name>-<suffix>`.
pub fn child_name(parent_name: &str, kind: ChildKind) -> String {
    format!("{}-{}", parent_name, kind.suffix())
}

/// Key of the child of `kind` owned by the WebSite at `parent`.
pub fn child_key(parent: &ObjectKey, kind: ChildKind) -> ObjectKey {
    ObjectKey::new(parent.namespace.clone(), child_name(&parent.name, kind))
}

/// Labels shared by the pod template, the workload selector and the
/// service selector.
pub fn labels_for(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), name.to_string()),
        ("type".to_string(), "web".to_string()),
    ])
}

/// Controller reference pointing back at `site`.
pub fn owner_reference(site: &WebSite) -> OwnerReference {
    OwnerReference {
        api_version: site.api_version.clone(),
        kind: ResourceKind::WebSite.to_string(),
        name: site.metadata.name.clone(),
        uid: site.metadata.uid.clone().unwrap_or_default(),
        controller: true,
        block_owner_deletion: true,
    }
}

fn child_meta(site: &WebSite, kind: ChildKind) -> ObjectMeta {
    ObjectMeta {
        owner_references: vec![owner_reference(site)],
        ..ObjectMeta::new(
            site.metadata.namespace.clone(),
            child_name(&site.metadata.name, kind),
        )
    }
}

/// The workload that should exist for `site`.
pub fn deployment_for(site: &WebSite) -> Deployment {
    let labels = labels_for(&site.metadata.name);

    Deployment {
        api_version: ResourceKind::Deployment.api_version().to_string(),
        kind: ResourceKind::Deployment.to_string(),
        metadata: child_meta(site, ChildKind::Deployment),
        spec: DeploymentSpec {
            replicas: site.spec.replicas,
            selector: LabelSelector {
                match_labels: labels.clone(),
            },
            template: PodTemplateSpec {
                metadata: TemplateMeta { labels },
                spec: PodSpec {
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image: site.spec.image_name.clone(),
                        ports: vec![ContainerPort {
                            container_port: CONTAINER_PORT,
                            name: PORT_NAME.to_string(),
                        }],
                        image_pull_policy: PullPolicy::IfNotPresent,
                    }],
                },
            },
        },
    }
}

/// The service that should exist for `site`.
pub fn service_for(site: &WebSite) -> Service {
    Service {
        api_version: ResourceKind::Service.api_version().to_string(),
        kind: ResourceKind::Service.to_string(),
        metadata: child_meta(site, ChildKind::Service),
        spec: ServiceSpec {
            selector: labels_for(&site.metadata.name),
            ports: vec![ServicePort {
                port: SERVICE_PORT,
                target_port: CONTAINER_PORT,
                protocol: "TCP".to_string(),
            }],
            service_type: ServiceType::NodePort,
        },
    }
}

/// The child of `kind` that should exist for `site`.
pub fn desired_child(site: &WebSite, kind: ChildKind) -> Resource {
    match kind {
        ChildKind::Deployment => deployment_for(site).into(),
        ChildKind::Service => service_for(site).into(),
    }
}

/// Every child that should exist for `site`, in reconcile order.
pub fn desired_children(site: &WebSite) -> Vec<Resource> {
    ChildKind::ALL
        .into_iter()
        .map(|kind| desired_child(site, kind))
        .collect()
}

#[cfg(test)]
#[path = "manifests_tests.rs"]
mod tests;
