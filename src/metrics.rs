// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operator metrics.
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! embedding process installs a recorder.

use metrics::{counter, describe_counter};

use crate::controller::{ChildChange, ReconcileOutcome};
use crate::watch::ChangeAction;

/// Reconcile passes, labelled by outcome.
pub const RECONCILE_PASSES: &str = "reconcile_passes_total";

/// Reconcile passes that returned an error.
pub const RECONCILE_ERRORS: &str = "reconcile_errors_total";

/// Child creates and updates, labelled by kind and change.
pub const CHILD_MUTATIONS: &str = "child_mutations_total";

/// Events emitted by the watch loop, labelled by action.
pub const WATCH_EVENTS: &str = "watch_events_total";

/// Keys parked behind a full work queue.
pub const WORK_QUEUE_PARKED: &str = "work_queue_parked_total";

/// Registers metric descriptions. Call once after installing a recorder.
pub fn register_metrics() {
    describe_counter!(RECONCILE_PASSES, "Reconcile passes by outcome");
    describe_counter!(RECONCILE_ERRORS, "Reconcile passes that failed");
    describe_counter!(CHILD_MUTATIONS, "Child creates and updates");
    describe_counter!(WATCH_EVENTS, "Change events emitted by the watch loop");
    describe_counter!(WORK_QUEUE_PARKED, "Keys parked behind a full work queue");
}

pub fn record_pass(outcome: &ReconcileOutcome) {
    counter!(RECONCILE_PASSES, "outcome" => outcome.as_label()).increment(1);
    if let ReconcileOutcome::Changed { kind, change, .. } = outcome {
        record_mutation(kind.resource_kind().as_str(), *change);
    }
}

pub fn record_mutation(kind: &'static str, change: ChildChange) {
    counter!(CHILD_MUTATIONS, "kind" => kind, "change" => change.as_str()).increment(1);
}

pub fn record_error() {
    counter!(RECONCILE_ERRORS).increment(1);
}

pub fn record_watch_event(action: ChangeAction) {
    counter!(WATCH_EVENTS, "action" => action.as_str()).increment(1);
}

pub fn record_queue_parked() {
    counter!(WORK_QUEUE_PARKED).increment(1);
}
