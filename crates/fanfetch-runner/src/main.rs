#![doc = include_str!("../README.md")]

mod runner;

use clap::Parser;
use fanfetch::{
    AppController, AppState, Dispatcher,
    memory::{MemoryBroker, StaticRoutes},
};
use runner::config::{CliArgs, RunnerConfig};
use runner::consumer::{LoggingConsumers, MeteredMonitor};
use runner::input;
use runner::telemetry::{increment_dispatches, init_telemetry};
use std::sync::Arc;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunnerConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let result = run(config).await;

    providers.shutdown();
    result
}

async fn run(config: RunnerConfig) -> anyhow::Result<()> {
    let broker = MemoryBroker::new(config.poll_timeout, config.max_batch_size);
    if let Some(path) = &config.input {
        let seeded = input::seed_from_file(&broker, &config.routes, path)?;
        tracing::info!("Seeded {seeded} messages from {}", path.display());
    }
    if config.close_after_input {
        for route in &config.routes {
            broker.close(route.topic());
        }
    }

    let state = AppState::new();
    let consumers = LoggingConsumers::default();
    let dispatcher = Dispatcher::builder()
        .registry(Arc::new(StaticRoutes::new(config.routes)))
        .settings(Arc::new(config.dispatcher))
        .connector(Arc::new(broker))
        .consumers(Arc::new(consumers.clone()))
        .controller(Arc::new(state.clone()))
        .monitor(Arc::new(MeteredMonitor))
        .build()?;

    let shutdown = tokio::spawn(shutdown_signal(state));

    increment_dispatches();
    let result = dispatcher.dispatch(config.mode).await;
    shutdown.abort();

    match &result {
        Ok(()) => tracing::info!(
            "Runner finished after consuming {} messages",
            consumers.consumed()
        ),
        Err(err) => tracing::error!(
            "Runner failed after consuming {} messages: {err}",
            consumers.consumed()
        ),
    }

    Ok(result?)
}

fn log_startup_info(config: &RunnerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting runner with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting runner over {} routes in {:?} mode",
            config.routes.len(),
            config.mode
        );
    }
}

/// Stops the application on Ctrl+C or SIGTERM.
async fn shutdown_signal(state: AppState) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            core::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, stopping dispatch...");
    state.stop();
}
