use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use verdant_core::config::BackendKind;
use verdant_core::{Record, VerdantConfig};
use verdant_ingest::{textlog, IngestionQueue, PostgresBackend, SqliteBackend, StorageBackend};
use verdant_scheduler::{JobRegistry, Scheduler, TickSink};
use verdant_workers::WorkerRegistry;

/// Runs configured sensor/actuator jobs on cron schedules and records
/// their readings into a time-series store.
#[derive(Parser)]
#[command(name = "verdant", version)]
struct Cli {
    /// Jobs file (JSON, hot-reloaded on change). Overrides the config value.
    jobs: Option<String>,

    /// Daemon config TOML. VERDANT_* env vars override file entries.
    #[arg(long)]
    config: Option<String>,
}

/// Fans a finished record out to both sinks and triggers the per-tick flush.
struct DaemonSink {
    queue: Arc<IngestionQueue>,
    text_log_dir: Option<PathBuf>,
    table_prefix: String,
}

impl TickSink for DaemonSink {
    fn record_ready(&self, record: &Record) {
        if let Err(e) = self.queue.enqueue(record) {
            warn!(sensor = %record.sensor, error = %e, "record rejected");
        }
        if let Some(dir) = &self.text_log_dir {
            textlog::write_line(dir, &self.table_prefix, record);
        }
    }

    fn tick_complete(&self) {
        self.queue.flush();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verdant=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = VerdantConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let backend: Arc<dyn StorageBackend> = match config.storage.backend {
        BackendKind::Sqlite => Arc::new(SqliteBackend::new(&config.storage.sqlite_path)),
        BackendKind::Postgres => {
            let url = config
                .storage
                .postgres_url
                .clone()
                .context("storage.postgres_url is required for the postgres backend")?;
            Arc::new(PostgresBackend::new(url))
        }
    };

    // The target must be reachable once at startup; afterwards outages are
    // absorbed by the retry buffer instead.
    backend
        .connect()
        .await
        .map_err(|e| anyhow::anyhow!("storage target unavailable at startup: {e}"))?;
    info!(backend = ?config.storage.backend, "storage target verified");

    let queue = Arc::new(IngestionQueue::new(
        backend,
        config.storage.table_prefix.clone(),
    ));
    let sink = Arc::new(DaemonSink {
        queue: Arc::clone(&queue),
        text_log_dir: config.storage.text_log_dir.clone().map(PathBuf::from),
        table_prefix: config.storage.table_prefix.clone(),
    });

    let jobs_path = cli
        .jobs
        .unwrap_or_else(|| config.scheduler.jobs_path.clone());
    let registry = JobRegistry::new(jobs_path.clone(), WorkerRegistry::with_builtins());
    let scheduler = Scheduler::new(registry, sink, &config.scheduler);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    info!(jobs = %jobs_path, "verdant running; Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("interrupt received; shutting down");
    let _ = shutdown_tx.send(true);
    scheduler_task.await?;

    // Final drain: waits for any background flush spawned by the last tick,
    // then writes what is still pending.
    queue.drain().await;
    Ok(())
}
