// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Drift between a live child and its desired form.
//!
//! Only generator-controlled fields are compared. Everything else on the
//! live object (metadata assigned by the store, fields other controllers
//! own) is left untouched when the desired fields are copied over.

use crate::k8s::manifests::CONTAINER_NAME;
use crate::k8s::{Deployment, Resource, Service};

/// Fields that differ between a live Deployment and the desired one.
pub fn deployment_drift(live: &Deployment, desired: &Deployment) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if live.spec.replicas != desired.spec.replicas {
        fields.push("spec.replicas");
    }
    let live_image = live.container(CONTAINER_NAME).map(|c| c.image.as_str());
    let desired_image = desired.container(CONTAINER_NAME).map(|c| c.image.as_str());
    if live_image != desired_image {
        fields.push("spec.template.containers.image");
    }
    fields
}

/// Fields that differ between a live Service and the desired one.
pub fn service_drift(live: &Service, desired: &Service) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if live.spec.selector != desired.spec.selector {
        fields.push("spec.selector");
    }
    if live.spec.ports != desired.spec.ports {
        fields.push("spec.ports");
    }
    if live.spec.service_type != desired.spec.service_type {
        fields.push("spec.type");
    }
    fields
}

/// Compare `live` against `desired` and, on drift, return the live object
/// with the desired fields applied. `None` means the child is in sync.
///
/// The returned object keeps the live metadata, including the observed
/// resource version the update must be conditioned on.
pub fn patch(live: &Resource, desired: &Resource) -> Option<(Resource, Vec<&'static str>)> {
    match (live, desired) {
        (Resource::Deployment(live), Resource::Deployment(desired)) => {
            let fields = deployment_drift(live, desired);
            if fields.is_empty() {
                return None;
            }
            let mut patched = live.clone();
            patched.spec.replicas = desired.spec.replicas;
            if let Some(want) = desired.container(CONTAINER_NAME) {
                match patched
                    .spec
                    .template
                    .spec
                    .containers
                    .iter_mut()
                    .find(|c| c.name == CONTAINER_NAME)
                {
                    Some(container) => container.image = want.image.clone(),
                    None => patched.spec.template.spec.containers.push(want.clone()),
                }
            }
            Some((patched.into(), fields))
        }
        (Resource::Service(live), Resource::Service(desired)) => {
            let fields = service_drift(live, desired);
            if fields.is_empty() {
                return None;
            }
            let mut patched = live.clone();
            patched.spec.selector = desired.spec.selector.clone();
            patched.spec.ports = desired.spec.ports.clone();
            patched.spec.service_type = desired.spec.service_type;
            Some((patched.into(), fields))
        }
        // Kinds with no generator-controlled fields never drift.
        _ => None,
    }
}

#[cfg(test)]
#[path = "drift_tests.rs"]
mod tests;
