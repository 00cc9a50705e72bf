// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operator startup and shutdown for the website-operator binary.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use website_operator::config::{OperatorConfig, WatchOutput};
use website_operator::controller::{Controller, TriggerSource};
use website_operator::k8s::ResourceKind;
use website_operator::store::{seed_from_file, InMemoryStore, StateStore};
use website_operator::watch::{run_watch_loop, EventSink, JsonSink, TextSink, WatchError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn stdout_sink(kind: ResourceKind, output: WatchOutput) -> Box<dyn EventSink> {
    match output {
        WatchOutput::Text => Box::new(TextSink::new(kind, tokio::io::stdout())),
        WatchOutput::Json => Box::new(JsonSink::new(tokio::io::stdout())),
    }
}

async fn seed(store: &InMemoryStore, config: &OperatorConfig) -> Result<(), BoxError> {
    if let Some(path) = &config.seed_path {
        let created = seed_from_file(store, path).await?;
        info!(path = %path.display(), created, "store seeded");
    }
    Ok(())
}

/// Run the watch loop on stdout until a shutdown signal or a watch failure.
async fn run_stdout_watch(
    store: &Arc<InMemoryStore>,
    config: &OperatorConfig,
    shutdown: CancellationToken,
) -> Result<tokio::task::JoinHandle<Result<(), WatchError>>, BoxError> {
    let kind = config.watch.resource_kind()?;
    let namespace = config.watch.namespace.as_deref();
    let stream = store.watch(kind, namespace).await?;
    info!(%kind, namespace = namespace.unwrap_or("*"), "watching");

    let mut sink = stdout_sink(kind, config.watch.output);
    Ok(tokio::spawn(async move {
        run_watch_loop(stream, kind, sink.as_mut(), &shutdown)
            .await
            .map(|summary| info!(emitted = summary.emitted, skipped = summary.skipped, "watch stopped"))
    }))
}

/// Start the store, controller, trigger source and watch loop.
pub async fn run_operator(config: OperatorConfig) -> Result<(), BoxError> {
    let store = Arc::new(InMemoryStore::new());
    let shutdown = CancellationToken::new();

    // Subscribe before seeding so seeded objects show up as changes.
    let triggers = TriggerSource::subscribe(store.as_ref(), None).await?;
    let mut watch = run_stdout_watch(&store, &config, shutdown.clone()).await?;
    seed(&store, &config).await?;

    let controller = Controller::new(store.clone(), config.controller.clone());
    let controller_task = {
        let controller = controller.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { controller.run(shutdown).await })
    };
    let trigger_task = {
        let store = store.clone();
        let queue = controller.queue();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { triggers.run(store.as_ref(), &queue, shutdown).await })
    };

    info!(objects = store.len(), "operator running");
    let watch_result = tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            None
        }
        res = &mut watch => Some(res),
    };

    shutdown.cancel();
    let watch_result = match watch_result {
        Some(res) => res,
        None => watch.await,
    };
    for (name, task) in [("controller", controller_task), ("triggers", trigger_task)] {
        if let Err(e) = task.await {
            error!(task = name, error = %e, "task panicked");
        }
    }

    watch_result??;
    info!("operator stopped");
    Ok(())
}

/// Run only the watch loop.
pub async fn run_watch_only(config: OperatorConfig) -> Result<(), BoxError> {
    let store = Arc::new(InMemoryStore::new());
    let shutdown = CancellationToken::new();

    let mut watch = run_stdout_watch(&store, &config, shutdown.clone()).await?;
    seed(&store, &config).await?;

    let finished = tokio::select! {
        _ = shutdown_signal() => None,
        res = &mut watch => Some(res),
    };
    shutdown.cancel();
    let result = match finished {
        Some(res) => res,
        None => watch.await,
    };
    result??;
    Ok(())
}
