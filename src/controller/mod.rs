// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! WebSite controller.
//!
//! The trigger source turns store notifications into WebSite keys, the work
//! queue serializes them per key, and the workers run reconcile passes.

pub mod drift;
pub mod queue;
pub mod reconciler;
pub mod triggers;
pub mod worker;

pub use queue::{QueueError, WorkQueue};
pub use reconciler::{ChildChange, ReconcileError, ReconcileOutcome, Reconciler};
pub use triggers::{parent_of, trigger_for, TriggerSource};
pub use worker::{backoff_delay, Controller};
