use clap::{Parser, Subcommand};
use fleetops_client::lookup::{resolve_request, ResourceLookup, ServerDirectory};
use fleetops_client::orchestration::PowerStatePreflight;
use fleetops_client::templates::JobTemplateCatalog;
use fleetops_client::version::VERSION;
use fleetops_client::{ClientConfig, HttpTransport, Orchestrator, SystemClock, WaitOptions};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wait for a job to reach a terminal state
    Wait {
        job_uri: String,
        /// Seconds to wait before giving up
        #[arg(long)]
        timeout: Option<u64>,
        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Ask the service to stop a serial job
    Cancel {
        job_uri: String,
        /// Also wait up to this many seconds for the job to stop
        #[arg(long)]
        wait: Option<u64>,
    },
    /// Submit an operation request read from a JSON file
    Submit {
        request: String,
        /// Server name or serial number to target instead of the request's `target`
        #[arg(long)]
        server: Option<String>,
        /// Wait for the created job to finish
        #[arg(long)]
        wait: bool,
    },
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "fleetops.log");
    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false).json();

    // Results go to stdout, so human-readable logs go to stderr
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("fleetops version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    let config = match ClientConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!("Starting fleetops, version: {}", VERSION);

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping local wait.");
            let _ = shutdown_tx.send(());
        }
    });

    let transport = Arc::new(HttpTransport::new(&config)?);
    let orchestrator = Orchestrator::with_shutdown(&config, transport.clone(), Arc::new(SystemClock), shutdown_rx);
    let defaults = orchestrator.default_wait();
    let catalog = Arc::new(JobTemplateCatalog::from_config(&config));

    let outcome = match args.command {
        Command::Wait {
            job_uri,
            timeout,
            interval,
        } => {
            let options = WaitOptions::new(
                timeout.unwrap_or(defaults.timeout_seconds),
                interval.unwrap_or(defaults.interval_seconds),
            );
            match orchestrator.poller().wait(job_uri, options).await {
                Ok(result) => print_json(&result).map_err(Into::into),
                Err(e) => Err(e),
            }
        }
        Command::Cancel { job_uri, wait } => {
            let options = wait.map(|seconds| defaults.with_timeout_seconds(seconds));
            match orchestrator.cancellation().cancel_by_uri(&job_uri, options).await {
                Ok(result) => print_json(&result).map_err(Into::into),
                Err(e) => Err(e),
            }
        }
        Command::Submit { request, server, wait } => {
            let contents = std::fs::read_to_string(&request)?;
            let body: serde_json::Value = serde_json::from_str(&contents)?;
            let directory: Arc<dyn ResourceLookup> =
                Arc::new(ServerDirectory::new(transport, config.servers_endpoint.clone()));
            let preflight = PowerStatePreflight::new(directory.clone(), catalog);
            match resolve_request(directory.as_ref(), body, server.as_deref()).await {
                Ok(request) => match orchestrator
                    .execute(request, Some(&preflight), wait.then_some(defaults))
                    .await
                {
                    Ok(outcome) => print_json(&outcome).map_err(Into::into),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = outcome {
        error!(error = %e, "Operation failed.");
        return Err(e.into());
    }
    Ok(())
}
