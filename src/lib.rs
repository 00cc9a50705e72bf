// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! website-operator: a controller that keeps a Deployment and a Service in
//! step with each `WebSite` object, plus a watch loop that reports changes
//! to a collection as classified events.
//!
//! The store is reached only through [`store::StateStore`]; the crate ships
//! an in-memory implementation used by the binary and the tests.

pub mod config;
pub mod controller;
pub mod k8s;
pub mod logging;
pub mod metrics;
pub mod store;
pub mod watch;

pub use config::{ConfigError, OperatorConfig};
pub use controller::{Controller, ReconcileError, ReconcileOutcome, Reconciler, TriggerSource, WorkQueue};
pub use k8s::{ObjectKey, Resource, ResourceKind, WebSite, WebSiteSpec};
pub use store::{InMemoryStore, StateStore, StoreError, WatchEvent};
pub use watch::{run_watch_loop, watch_collection, ChangeAction, ChangeEvent, EventSink, WatchError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
