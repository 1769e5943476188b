//! Entry Point (spec.md §4 C12), grounded on
//! `original_source/bin/receive_matrix_email.py`: a stdin-fed mail
//! handler that acquires a process-wide advisory lock before doing
//! anything else, and exits non-zero on any failure so the MTA bounces
//! the message and alerts operators.

use matrix_cli::config::Config;
use matrix_cli::db::PersistenceGateway;
use matrix_cli::email;
use matrix_cli::metrics::MetricsSink;
use matrix_cli::object_store::ObjectStoreGateway;
use std::fs::OpenOptions;
use std::io::Read;
use std::os::unix::io::AsRawFd;
use std::process::ExitCode;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "/etc/matrix/ingest.ini";

fn acquire_lock(path: &str) -> std::io::Result<std::fs::File> {
    let file = OpenOptions::new().create(true).write(true).open(path)?;
    // SAFETY: `file` owns a valid fd for the duration of the flock call
    // and the lock is released when `file` is dropped at process exit.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(file)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).init();

    let config_path = std::env::var("MATRIX_INGEST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load configuration from '{config_path}': {e}");
            return ExitCode::FAILURE;
        }
    };

    // One instance of this process runs per delivery; the downstream
    // store historically contended badly under concurrent load, so only
    // one delivery is processed at a time (spec.md §5).
    let _lock = match acquire_lock(&config.lock.path) {
        Ok(lock) => lock,
        Err(e) => {
            error!("failed to acquire process lock at '{}': {e}", config.lock.path);
            return ExitCode::FAILURE;
        }
    };

    let mut raw = Vec::new();
    if let Err(e) = std::io::stdin().read_to_end(&mut raw) {
        error!("failed to read email from stdin: {e}");
        return ExitCode::FAILURE;
    }

    match run(&raw, &config).await {
        Ok(()) => {
            info!("email processed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("error when processing email: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(raw: &[u8], config: &Config) -> anyhow::Result<()> {
    let db = PersistenceGateway::connect(&config.db).await?;
    let object_store = ObjectStoreGateway::new(
        &config.object_store.bucket,
        &config.object_store.region,
        config.object_store.endpoint.as_deref(),
    )
    .await;
    let metrics = MetricsSink::new(&config.monitoring.statsd_host, config.monitoring.statsd_port);

    email::process_email(raw, &db, &object_store, &metrics, config).await?;
    Ok(())
}
