// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Initial store contents loaded from a JSON document.
//!
//! The document is a JSON array of objects, each tagged with its `kind`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use super::{StateStore, StoreError};
use crate::k8s::Resource;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to seed store: {0}")]
    Store(#[from] StoreError),
}

/// Parse a seed document.
pub fn parse_seed(contents: &str) -> Result<Vec<Resource>, serde_json::Error> {
    serde_json::from_str(contents)
}

/// Create every object in `path`. Objects that already exist are kept as
/// they are. Returns the number of objects created.
pub async fn seed_from_file(
    store: &(impl StateStore + ?Sized),
    path: impl AsRef<Path>,
) -> Result<usize, SeedError> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let resources = parse_seed(&contents).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut created = 0;
    for resource in resources {
        match store.create(resource).await {
            Ok(obj) => {
                info!(kind = %obj.kind(), key = %obj.key(), "seeded");
                created += 1;
            }
            Err(StoreError::AlreadyExists { kind, key }) => {
                warn!(%kind, %key, "seed object already exists, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(created)
}

#[cfg(test)]
#[path = "seed_tests.rs"]
mod tests;
