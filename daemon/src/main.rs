//! Votum daemon — entry point for running the voting service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use votum_chain::HttpLedgerClient;
use votum_rpc::{AppState, RpcServer};
use votum_session::config::VerifierMode;
use votum_session::logging::{init_logging, LogFormat};
use votum_session::{
    Reconciler, ServiceConfig, SessionEvent, SessionOrchestrator, ShutdownController,
};
use votum_store_lmdb::LmdbEnvironment;
use votum_verifier::{HttpVerifier, IdentityVerifier, SimulatedVerifier};
use votum_wallet::HttpAuthorizationProvider;

/// LMDB map size for the idempotency ledger (256 MiB).
const LMDB_MAP_SIZE: usize = 256 * 1024 * 1024;
const LMDB_MAX_DBS: u32 = 4;

/// Wallet prompts wait on a human; give them a generous timeout.
const WALLET_PROMPT_TIMEOUT_MS: u64 = 120_000;

#[derive(Parser)]
#[command(name = "votum-daemon", about = "Votum voting service daemon")]
struct Cli {
    /// Data directory for the idempotency ledger.
    #[arg(long, env = "VOTUM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address the HTTP API binds to.
    #[arg(long, env = "VOTUM_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Port the HTTP API listens on.
    #[arg(long, env = "VOTUM_LISTEN_PORT")]
    listen_port: Option<u16>,

    /// Verifier backend: "simulated" or "http".
    #[arg(long, env = "VOTUM_VERIFIER_MODE")]
    verifier_mode: Option<String>,

    /// Base URL of the biometric matching service (http mode).
    #[arg(long, env = "VOTUM_VERIFIER_URL")]
    verifier_url: Option<String>,

    /// Base URL of the wallet bridge.
    #[arg(long, env = "VOTUM_WALLET_URL")]
    wallet_url: Option<String>,

    /// URL of the ledger gateway.
    #[arg(long, env = "VOTUM_LEDGER_URL")]
    ledger_url: Option<String>,

    /// Enrollments for the simulated verifier, as "identity:name" pairs
    /// (comma-separated: "REG-001:alice,REG-002:bob").
    #[arg(long, env = "VOTUM_ENROLL", value_delimiter = ',')]
    enroll: Vec<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "VOTUM_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "VOTUM_LOG_FORMAT")]
    log_format: String,

    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the voting service.
    Serve,
    /// Run one reconciliation pass over non-terminal vote records and exit.
    Reconcile,
}

fn merge_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = ServiceConfig::from_toml_file(&path.display().to_string())?;
            tracing::info!("loaded config from {}", path.display());
            config
        }
        None => ServiceConfig::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(addr) = &cli.listen_addr {
        config.listen_addr = addr.clone();
    }
    if let Some(port) = cli.listen_port {
        config.listen_port = port;
    }
    if let Some(mode) = &cli.verifier_mode {
        config.verifier_mode = match mode.to_lowercase().as_str() {
            "http" => VerifierMode::Http,
            _ => VerifierMode::Simulated,
        };
    }
    if let Some(url) = &cli.verifier_url {
        config.verifier_url = url.clone();
    }
    if let Some(url) = &cli.wallet_url {
        config.wallet_url = url.clone();
    }
    if let Some(url) = &cli.ledger_url {
        config.ledger_url = url.clone();
    }
    config.log_level = cli.log_level.clone();
    config.log_format = cli.log_format.clone();

    Ok(config)
}

fn build_verifier(config: &ServiceConfig, cli: &Cli) -> anyhow::Result<Arc<dyn IdentityVerifier>> {
    match config.verifier_mode {
        VerifierMode::Http => {
            let verifier = HttpVerifier::new(
                config.verifier_url.clone(),
                config.params.similarity_threshold,
                config.params.verifier_timeout_ms,
            )?;
            tracing::info!(url = %config.verifier_url, "using HTTP verifier");
            Ok(Arc::new(verifier))
        }
        VerifierMode::Simulated => {
            let verifier = SimulatedVerifier::new(config.params.similarity_threshold);
            for pair in &cli.enroll {
                match pair.split_once(':') {
                    Some((identity, name)) => verifier.enroll(identity, name),
                    None => tracing::warn!(pair = %pair, "ignoring malformed --enroll entry"),
                }
            }
            tracing::info!(enrollments = cli.enroll.len(), "using simulated verifier");
            Ok(Arc::new(verifier))
        }
    }
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::SessionStarted { session_id } => {
            tracing::info!(%session_id, "session started");
        }
        SessionEvent::IdentityVerified {
            session_id,
            identity_key,
            similarity,
        } => {
            tracing::info!(%session_id, %identity_key, similarity, "identity verified");
        }
        SessionEvent::VerificationFailed {
            session_id,
            attempts,
        } => {
            tracing::warn!(%session_id, attempts, "verification failed");
        }
        SessionEvent::AuthorizationGranted {
            session_id,
            address,
        } => {
            tracing::info!(%session_id, %address, "authorization granted");
        }
        SessionEvent::VoteConfirmed {
            session_id,
            identity_key,
            candidate_id,
            reference,
        } => {
            tracing::info!(%session_id, %identity_key, %candidate_id, %reference, "vote confirmed");
        }
        SessionEvent::DuplicateRejected {
            session_id,
            identity_key,
            existing,
        } => {
            tracing::warn!(%session_id, %identity_key, %existing, "duplicate vote rejected");
        }
        SessionEvent::VoteFailed { session_id, reason } => {
            tracing::warn!(%session_id, reason = %reason, "vote failed");
        }
        SessionEvent::SessionExpired { session_id } => {
            tracing::info!(%session_id, "session expired");
        }
    }
}

async fn serve(config: ServiceConfig, cli: &Cli) -> anyhow::Result<()> {
    let env = LmdbEnvironment::open(&config.data_dir, LMDB_MAX_DBS, LMDB_MAP_SIZE)?;
    let store = Arc::new(env.vote_store());

    let verifier = build_verifier(&config, cli)?;
    let wallet = Arc::new(HttpAuthorizationProvider::new(
        config.wallet_url.clone(),
        WALLET_PROMPT_TIMEOUT_MS,
    )?);
    let ledger = Arc::new(HttpLedgerClient::new(config.ledger_url.clone())?);

    let orchestrator = Arc::new(SessionOrchestrator::new(
        verifier,
        wallet,
        ledger,
        store,
        config.params.clone(),
    ));

    let shutdown = ShutdownController::new();

    // ── RPC server task ───────────────────────────────────────────────
    let server = RpcServer::new(config.listen_addr.clone(), config.listen_port);
    let rpc_state = Arc::new(AppState {
        orchestrator: Arc::clone(&orchestrator),
    });
    let rpc_shutdown = shutdown.subscribe();
    let rpc_handle = tokio::spawn(async move {
        if let Err(e) = server.start(rpc_state, rpc_shutdown).await {
            tracing::error!("RPC server error: {e}");
        }
    });

    // ── Session sweep task ────────────────────────────────────────────
    let sweep_orchestrator = Arc::clone(&orchestrator);
    let mut sweep_shutdown = shutdown.subscribe();
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs.max(1));
    let sweep_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            tokio::select! {
                biased;
                _ = sweep_shutdown.recv() => {
                    tracing::info!("sweep task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    sweep_orchestrator.expire_stale_sessions().await;
                    for event in sweep_orchestrator.drain_events() {
                        log_event(&event);
                    }
                }
            }
        }
    });

    tracing::info!(
        addr = %config.listen_addr,
        port = config.listen_port,
        data_dir = %config.data_dir.display(),
        "votum service started"
    );

    shutdown.wait_for_signal().await;

    let _ = rpc_handle.await;
    let _ = sweep_handle.await;
    tracing::info!("votum daemon exited cleanly");
    Ok(())
}

async fn reconcile(config: ServiceConfig) -> anyhow::Result<()> {
    let env = LmdbEnvironment::open(&config.data_dir, LMDB_MAX_DBS, LMDB_MAP_SIZE)?;
    let store = Arc::new(env.vote_store());
    let ledger = Arc::new(HttpLedgerClient::new(config.ledger_url.clone())?);

    let report = Reconciler::new(store, ledger).run().await?;
    tracing::info!(
        examined = report.examined,
        confirmed = report.confirmed,
        adopted = report.adopted,
        failed = report.failed,
        unresolved = report.unresolved,
        "reconciliation finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(LogFormat::from_config(&cli.log_format), &cli.log_level);

    let config = merge_config(&cli)?;

    match cli.command {
        Command::Serve => serve(config, &cli).await,
        Command::Reconcile => reconcile(config).await,
    }
}
