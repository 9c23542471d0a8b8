use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use qsearch::backend::{probe, BackendStatus, StatevectorBackend};
use qsearch::calibration::{now_timestamp, CalibrationRecord};
use qsearch::config::{self, Config};
use qsearch::server::{backend_router, search_router};
use qsearch::service::{SearchRequest, SearchService};

#[derive(Parser, Debug)]
#[command(name = "qsearch")]
#[command(about = "Exact Grover word search")]
#[command(version)]
struct Cli {
    /// TOML config file. Defaults are used when omitted.
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a statevector backend server, unless one already answers at the endpoint
    Backend,
    /// Run the word search HTTP service
    Serve,
    /// Search a single word and print the response
    Search {
        /// Word to look for
        #[arg(long)]
        word: String,
        /// Text to search in
        #[arg(long)]
        text: String,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };
    init_tracing(&config);

    match cli.command {
        Command::Backend => run_backend(&config),
        Command::Serve => run_service(config),
        Command::Search { word, text } => {
            let response = SearchService::new(config).handle(SearchRequest::new(word, text))?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

fn run_backend(config: &Config) -> color_eyre::Result<()> {
    let cfg = &config.backend;
    // Probe before starting a runtime; the health check uses a blocking client.
    if probe(&cfg.endpoint, cfg.timeout()) == BackendStatus::Serving {
        tracing::info!(endpoint = %cfg.endpoint, "A backend is already serving.");
        return Ok(());
    }
    CalibrationRecord::noiseless(&now_timestamp()?).write(&cfg.calibration_path)?;

    let backend = match cfg.rng_seed {
        Some(seed) => StatevectorBackend::seeded(seed),
        None => StatevectorBackend::new(),
    }
    .with_max_qubits(cfg.max_qubits);
    let app = backend_router(Arc::new(backend));
    let addr = bind_address(&cfg.endpoint).to_string();

    runtime()?.block_on(async move {
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(err) if err.kind() == ErrorKind::AddrInUse => {
                tracing::info!(%addr, "Backend address already bound; assuming another instance.");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        tracing::info!(%addr, "Backend server listening.");
        axum::serve(listener, app).await?;
        Ok::<(), color_eyre::Report>(())
    })
}

fn run_service(config: Config) -> color_eyre::Result<()> {
    let addr = config.service.http_bind.clone();
    if addr.is_empty() {
        return Err(eyre::eyre!("service.http_bind must be non-empty."));
    }
    let app = search_router(Arc::new(SearchService::new(config)));

    runtime()?.block_on(async move {
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(%addr, "Search service listening.");
        axum::serve(listener, app).await?;
        Ok::<(), color_eyre::Report>(())
    })
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build()
}

fn bind_address(endpoint: &str) -> &str {
    endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/')
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.service.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
