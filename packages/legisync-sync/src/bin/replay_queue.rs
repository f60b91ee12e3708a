//! replay-queue: push every pending queue entry into the search index
//!
//! USAGE:
//!     replay-queue
//!
//! Takes no arguments. Settings come from the environment (a `.env` file is
//! loaded first):
//!
//!     LEGISYNC_CONFIG            optional YAML config file
//!     LEGISYNC_SEARCH_HOST       search host        (127.0.0.1)
//!     LEGISYNC_SEARCH_PORT       search port        (8108)
//!     LEGISYNC_SEARCH_PROTOCOL   http | https       (http)
//!     LEGISYNC_SEARCH_API_KEY    API key
//!     LEGISYNC_QUEUE_PATH        queue database     (legisync-queue.db)
//!     RUST_LOG                   log filter         (info)
//!
//! Exit code 0 when the run completes (per-entry failures are logged),
//! 1 when the queue cannot be read or the collections cannot be created.

use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use legisync_storage::infrastructure::SqliteQueueStore;
use legisync_sync::{QueueReplayWorker, SyncConfig, TypesenseClient};

async fn run() -> anyhow::Result<()> {
    let config = SyncConfig::from_env().context("loading configuration")?;
    info!(
        "Queue {} → search {}",
        config.queue.database_path.display(),
        config.search.base_url()
    );

    let queue = SqliteQueueStore::open(&config.queue.database_path).with_context(|| {
        format!(
            "opening queue database {}",
            config.queue.database_path.display()
        )
    })?;
    let index = TypesenseClient::new(&config.search).context("building search client")?;

    let worker = QueueReplayWorker::from_config(Arc::new(queue), Arc::new(index), &config);
    let report = worker.run().await.context("replaying queue")?;

    if report.failed > 0 {
        error!(
            "{} entries could not be indexed and remain pending",
            report.failed
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if std::env::args().len() > 1 {
        eprintln!("replay-queue takes no arguments");
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Replay failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
