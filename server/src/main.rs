mod handlers;
mod routes;
mod state;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use thiserror::Error;

use pdfintake::logging::{self, LoggingError};
use pdfintake::worker::DirectoryScanner;
use pdfintake::{load_config, Config, ConfigError, IntakeError, IntakeService, WorkerError};

use state::{AppState, Pipeline};

#[derive(Error, Debug)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Parser)]
#[command(name = "pdfintake-server", version, about = "PDF invoice intake service")]
struct Cli {
    /// Path to a JSON config file; defaults apply when omitted
    #[arg(short, long, global = true, env = "PDFINTAKE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the watch folder
    #[arg(long, global = true)]
    watch_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API and watch the folder (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Process every PDF already in the watch folder, then exit
    Scan,
}

fn load(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.watch_dir {
        config.watch_directory = dir.to_string_lossy().to_string();
    }
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Logging may not be up yet
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ServerError> {
    let mut config = load(&cli)?;
    logging::init(&config.logging)?;

    info!("Starting pdfintake-server v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config)
        }
        Commands::Scan => scan(config),
    }
}

fn serve(config: Config) -> Result<(), ServerError> {
    let store = state::open_store(&config)?;
    let pipeline = Pipeline::start(&config, &store)?;

    let service = IntakeService::new(store, config.watch_directory()).with_pool(pipeline.pool());
    let app = routes::create_router(AppState::new(service));
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(ServerError::Serve)?;

    let served = runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;
        info!("Listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(ServerError::Serve)
    });

    // Handlers hold pool clones until the runtime is gone
    drop(runtime);
    pipeline.stop();
    info!("Server stopped");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

/// Totals printed by the `scan` command.
#[derive(Debug, Default)]
struct ScanSummary {
    submitted: usize,
    succeeded: usize,
    degraded: usize,
    failed: usize,
}

fn scan(config: Config) -> Result<(), ServerError> {
    let store = state::open_store(&config)?;
    store.fail_unfinished_jobs().map_err(IntakeError::from)?;

    let jobs = DirectoryScanner::new(config.watch_directory()).scan()?;
    let pool = Arc::new(state::start_pool(&config, &store));
    let mut summary = ScanSummary {
        submitted: jobs.len(),
        ..Default::default()
    };

    // Submit on a separate thread so results are drained while the queue fills
    let pool_for_submit = Arc::clone(&pool);
    let submitter = std::thread::spawn(move || {
        let mut rejected = 0;
        for job in jobs {
            if let Err(e) = pool_for_submit.submit(job) {
                error!("Failed to submit job: {}", e);
                rejected += 1;
            }
        }
        rejected
    });

    let results = pool.results();
    let mut expected = summary.submitted;
    let mut received = 0;
    let mut submitter = Some(submitter);

    while received < expected {
        if let Ok(result) = results.recv_timeout(Duration::from_millis(200)) {
            state::log_result(&result);
            received += 1;
            match (result.success, result.degraded) {
                (true, false) => summary.succeeded += 1,
                (true, true) => summary.degraded += 1,
                (false, _) => summary.failed += 1,
            }
        }

        if submitter.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = submitter.take() {
                let rejected = handle.join().unwrap_or_else(|_| {
                    warn!("Submit thread panicked");
                    expected - received
                });
                summary.failed += rejected;
                expected -= rejected;
            }
        }
    }

    if let Some(handle) = submitter.take() {
        let _ = handle.join();
    }
    drop(results);
    match Arc::try_unwrap(pool) {
        Ok(pool) => pool.wait(),
        Err(pool) => pool.shutdown(),
    }

    println!(
        "Scanned {}: {} submitted, {} succeeded, {} stored with errors, {} failed",
        config.watch_directory().display(),
        summary.submitted,
        summary.succeeded,
        summary.degraded,
        summary.failed
    );
    Ok(())
}
