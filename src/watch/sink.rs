// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Destinations for change events.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::event::ChangeEvent;
use crate::k8s::ResourceKind;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write event: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("event receiver closed")]
    Closed,
}

/// Receives events in emission order.
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: ChangeEvent) -> Result<(), SinkError>;
}

/// Human-readable lines: `Pod created (default): web-0`.
///
/// Flushes after every line.
pub struct TextSink<W> {
    kind: ResourceKind,
    out: W,
}

impl<W: AsyncWrite + Unpin + Send> TextSink<W> {
    pub fn new(kind: ResourceKind, out: W) -> Self {
        Self { kind, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EventSink for TextSink<W> {
    async fn emit(&mut self, event: ChangeEvent) -> Result<(), SinkError> {
        let line = format!(
            "{} {} ({}): {}\n",
            self.kind, event.action, event.namespace, event.name
        );
        self.out.write_all(line.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonSink<W> {
    out: W,
}

impl<W: AsyncWrite + Unpin + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EventSink for JsonSink<W> {
    async fn emit(&mut self, event: ChangeEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        self.out.write_all(&line).await?;
        self.out.flush().await?;
        Ok(())
    }
}

/// Forwards events to an in-process receiver.
pub struct ChannelSink {
    tx: mpsc::Sender<ChangeEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ChangeEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, event: ChangeEvent) -> Result<(), SinkError> {
        self.tx.send(event).await.map_err(|_| SinkError::Closed)
    }
}

#[async_trait]
impl EventSink for Vec<ChangeEvent> {
    async fn emit(&mut self, event: ChangeEvent) -> Result<(), SinkError> {
        self.push(event);
        Ok(())
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
