// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Resource object definitions.
//!
//! Field names serialize in the camelCase shape of the cluster API so that
//! manifests rendered here can be applied as-is. Every map is a `BTreeMap`:
//! serialized output must be byte-identical for equal inputs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use super::validation::ValidationError;

/// API group/version of the WebSite custom resource.
pub const WEBSITE_API_VERSION: &str = "web.example.com/v1";

/// Kinds of object the operator reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    WebSite,
    Deployment,
    Service,
    Pod,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::WebSite,
        ResourceKind::Deployment,
        ResourceKind::Service,
        ResourceKind::Pod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::WebSite => "WebSite",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::Pod => "Pod",
        }
    }

    pub fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::WebSite => WEBSITE_API_VERSION,
            ResourceKind::Deployment => "apps/v1",
            ResourceKind::Service | ResourceKind::Pod => "v1",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ValidationError;

    /// Accepts the kind name, its lowercase form, and the lowercase plural
    /// (`Pod`, `pod`, `pods`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let singular = lower.strip_suffix('s').unwrap_or(lower.as_str());
        Self::ALL
            .into_iter()
            .find(|kind| {
                let name = kind.as_str().to_ascii_lowercase();
                name == lower || name == singular
            })
            .ok_or_else(|| ValidationError::UnknownKind(s.to_string()))
    }
}

/// Namespace + name identity of an object within one kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Common object metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    /// Assigned by the store on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Assigned by the store on every write; updates must carry the last
    /// observed value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    /// The owner reference flagged as the managing controller, if any.
    pub fn controller_owner(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }
}

/// Back-reference from an owned object to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    #[serde(default)]
    pub controller: bool,
    #[serde(default)]
    pub block_owner_deletion: bool,
}

/// WebSite spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSiteSpec {
    /// Number of replicas.
    pub replicas: u32,
    /// Container image.
    pub image_name: String,
}

/// WebSite status. Reserved for observed-state reporting; the reconciler
/// never reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSiteStatus {
    pub ready_replicas: u32,
    pub phase: String,
    pub conditions: Vec<Condition>,
}

/// WebSite custom resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSite {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: WebSiteSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WebSiteStatus>,
}

impl WebSite {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: WebSiteSpec) -> Self {
        Self {
            api_version: WEBSITE_API_VERSION.to_string(),
            kind: ResourceKind::WebSite.to_string(),
            metadata: ObjectMeta::new(namespace, name),
            spec,
            status: None,
        }
    }
}

/// Condition for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
}

/// Image pull policy of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub container_port: u16,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    #[serde(default)]
    pub image_pull_policy: PullPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
}

/// Labels stamped on pods created from a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateMeta {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodTemplateSpec {
    pub metadata: TemplateMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    pub replicas: u32,
    pub selector: LabelSelector,
    pub template: PodTemplateSpec,
}

/// Scalable workload owned by a WebSite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: DeploymentSpec,
}

impl Deployment {
    /// The container with the given name, if the template declares one.
    pub fn container(&self, name: &str) -> Option<&Container> {
        self.spec.template.spec.containers.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    NodePort,
    LoadBalancer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub port: u16,
    pub target_port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub selector: BTreeMap<String, String>,
    pub ports: Vec<ServicePort>,
    #[serde(rename = "type", default)]
    pub service_type: ServiceType,
}

/// Network exposure owned by a WebSite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodStatus {
    #[serde(default)]
    pub phase: String,
}

/// Pod, watched but never written by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PodSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PodStatus>,
}

impl Pod {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: ResourceKind::Pod.api_version().to_string(),
            kind: ResourceKind::Pod.to_string(),
            metadata: ObjectMeta::new(namespace, name),
            spec: PodSpec::default(),
            status: None,
        }
    }
}

/// Failure status carried by an error notification on a change-stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatus {
    pub code: u16,
    pub reason: String,
    pub message: String,
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.code, self.reason, self.message)
    }
}

/// Any object the store can hold.
///
/// Serializes as the inner object; deserializes by dispatching on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    WebSite(WebSite),
    Deployment(Deployment),
    Service(Service),
    Pod(Pod),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::WebSite(_) => ResourceKind::WebSite,
            Resource::Deployment(_) => ResourceKind::Deployment,
            Resource::Service(_) => ResourceKind::Service,
            Resource::Pod(_) => ResourceKind::Pod,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Resource::WebSite(o) => &o.metadata,
            Resource::Deployment(o) => &o.metadata,
            Resource::Service(o) => &o.metadata,
            Resource::Pod(o) => &o.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Resource::WebSite(o) => &mut o.metadata,
            Resource::Deployment(o) => &mut o.metadata,
            Resource::Service(o) => &mut o.metadata,
            Resource::Pod(o) => &mut o.metadata,
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata().key()
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let kind: ResourceKind = value
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| D::Error::missing_field("kind"))?
            .parse()
            .map_err(D::Error::custom)?;

        let parsed = match kind {
            ResourceKind::WebSite => serde_json::from_value(value).map(Resource::WebSite),
            ResourceKind::Deployment => serde_json::from_value(value).map(Resource::Deployment),
            ResourceKind::Service => serde_json::from_value(value).map(Resource::Service),
            ResourceKind::Pod => serde_json::from_value(value).map(Resource::Pod),
        };
        parsed.map_err(D::Error::custom)
    }
}

/// Typed access to one kind of [`Resource`].
pub trait Object: Clone + Into<Resource> + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn metadata(&self) -> &ObjectMeta;
    fn metadata_mut(&mut self) -> &mut ObjectMeta;
    /// Unwraps the matching variant, `None` for any other kind.
    fn from_resource(resource: Resource) -> Option<Self>;
}

macro_rules! impl_object {
    ($ty:ident) => {
        impl Object for $ty {
            const KIND: ResourceKind = ResourceKind::$ty;

            fn metadata(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }

            fn from_resource(resource: Resource) -> Option<Self> {
                match resource {
                    Resource::$ty(obj) => Some(obj),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Resource {
            fn from(obj: $ty) -> Self {
                Resource::$ty(obj)
            }
        }
    };
}

impl_object!(WebSite);
impl_object!(Deployment);
impl_object!(Service);
impl_object!(Pod);

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
