// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Collection watching.

pub mod event;
pub mod sink;
pub mod watcher;

pub use event::{ChangeAction, ChangeEvent};
pub use sink::{ChannelSink, EventSink, JsonSink, SinkError, TextSink};
pub use watcher::{classify, run_watch_loop, watch_collection, Classified, WatchError, WatchSummary};
