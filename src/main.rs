use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use magnit_calc::api::api_routes;
use magnit_calc::broker::{Broker, InMemoryBroker, RedisBroker};
use magnit_calc::config::Config;
use magnit_calc::tasks::{QueryService, TaskRegistry};
use magnit_calc::worker::Worker;

#[derive(Parser)]
#[command(name = "magnit-calc", version, about = "Queued arithmetic tasks over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API against Redis.
    Serve,
    /// Process queued tasks from Redis.
    Worker {
        /// Number of concurrent workers in this process.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
    /// API and workers in one process over an in-memory broker.
    Standalone {
        /// Number of concurrent workers in this process.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;

    eprintln!("magnit-calc v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Queue: {}", config.keys.queue_key);
    eprintln!("   Done:  {}", config.keys.result_key);
    eprintln!("   Fail:  {}", config.keys.fail_key);

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    match cli.command {
        Command::Serve => {
            let broker = connect_redis(&config).await?;
            serve(&config, broker, cancel).await?;
        }
        Command::Worker { concurrency } => {
            let broker = connect_redis(&config).await?;
            let workers = spawn_workers(&config, broker, &cancel, concurrency);
            join_workers(workers, &cancel).await?;
        }
        Command::Standalone { concurrency } => {
            eprintln!("   Broker: in-memory (nothing is persisted)");
            let broker: Arc<dyn Broker> = InMemoryBroker::new();
            let workers = spawn_workers(&config, Arc::clone(&broker), &cancel, concurrency);
            let served = serve(&config, broker, cancel.clone()).await;
            cancel.cancel();
            join_workers(workers, &cancel).await?;
            served?;
        }
    }

    Ok(())
}

async fn connect_redis(config: &Config) -> anyhow::Result<Arc<dyn Broker>> {
    eprintln!("   Broker: {}", config.redis_url);
    let broker = RedisBroker::connect(&config.redis_url)
        .await
        .context("failed to connect to Redis")?;
    Ok(Arc::new(broker))
}

/// Serve the HTTP API until `cancel` fires.
async fn serve(
    config: &Config,
    broker: Arc<dyn Broker>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let app = api_routes(
        TaskRegistry::new(Arc::clone(&broker), config.keys.clone()),
        QueryService::new(broker, config.keys.clone()),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("HTTP server failed")?;

    info!("HTTP API stopped");
    Ok(())
}

fn spawn_workers(
    config: &Config,
    broker: Arc<dyn Broker>,
    cancel: &CancellationToken,
    concurrency: usize,
) -> Vec<JoinHandle<magnit_calc::error::Result<()>>> {
    let concurrency = concurrency.max(1);
    eprintln!("   Workers: {concurrency}");
    (0..concurrency)
        .map(|_| {
            Worker::new(
                Arc::clone(&broker),
                config.keys.clone(),
                config.worker.clone(),
            )
            .spawn(cancel.clone())
        })
        .collect()
}

/// Wait for every worker to stop. The first failure cancels the others.
async fn join_workers(
    mut workers: Vec<JoinHandle<magnit_calc::error::Result<()>>>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut first_err = None;
    while !workers.is_empty() {
        let (joined, _index, rest) = futures::future::select_all(workers).await;
        workers = rest;

        let outcome = joined
            .context("worker task panicked")
            .and_then(|run| run.context("worker halted"));
        if let Err(e) = outcome {
            cancel.cancel();
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

/// Cancel `cancel` on Ctrl-C.
fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });
}
