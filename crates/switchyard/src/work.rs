// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchyard worker` command implementation.

use std::sync::Arc;

use switchyard_agent::{Processed, Worker, install_signal_handler};
use switchyard_config::SwitchyardConfig;
use switchyard_core::SwitchyardError;
use tracing::info;

use crate::app::App;

/// Run the worker until SIGINT/SIGTERM, or for a single task with `once`.
pub async fn run_worker(config: &SwitchyardConfig, once: bool) -> Result<(), SwitchyardError> {
    let app = App::open(config).await?;
    let outcome = work(config, &app, once).await;
    app.finish(outcome).await
}

async fn work(config: &SwitchyardConfig, app: &App, once: bool) -> Result<(), SwitchyardError> {
    let orchestrator = Arc::new(app.orchestrator(config)?);
    let worker = Worker::new(
        app.queue.clone(),
        orchestrator.clone(),
        config.worker.clone(),
    );

    if once {
        let processed = worker.run_once().await;
        orchestrator.shutdown().await;
        match processed? {
            Processed::Idle => println!("queue empty"),
            Processed::Task { id, status } => println!("{id} {status}"),
        }
    } else {
        let cancel = install_signal_handler();
        worker.run(cancel).await?;
        let stats = app.queue.stats().await?;
        info!(
            pending = stats.pending,
            done = stats.done,
            failed = stats.failed,
            "queue at shutdown"
        );
    }
    Ok(())
}
