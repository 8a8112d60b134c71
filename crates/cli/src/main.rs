//! `repo-tracker` entry point.
//!
//! This binary is the composition root for the whole system:
//!
//! 1. **Parse configuration**: load `tracker.toml` (or `--config`) and apply
//!    environment overrides.
//! 2. **Wire observability**: configure `tracing-subscriber` with a text or
//!    JSON layer and, when an endpoint is configured, an OpenTelemetry OTLP
//!    exporter. Every span and event emitted by the workspace crates flows
//!    through it.
//! 3. **Construct infrastructure**: open the [`store::SqliteStore`] (or an
//!    in-memory store with `--ephemeral`) and build the
//!    [`github::GithubClient`], then inject both into the tracker services.
//! 4. **Run the subcommand**: `serve` starts the webhook receiver; everything
//!    else is a one-shot operation against the store.

mod commands;
mod config;
mod output;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use github::GithubClient;
use listener::{Dispatcher, SignatureVerifier, WebhookState};
use store::SqliteStore;
use tracing::info;
use tracker::{ActivityGateway, MemoryStore, ProjectStore};

use crate::commands::{Command, Context, ServeArgs};
use crate::config::Config;
use crate::output::OutputMode;

/// Track projects against their GitHub repositories.
#[derive(Parser, Debug)]
#[command(name = "repo-tracker", version, about)]
struct Cli {
    /// Configuration file (defaults to ./tracker.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Use a throwaway in-memory store instead of the database file.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let _telemetry = telemetry::init(&config.log)?;

    let store: Arc<dyn ProjectStore> = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            SqliteStore::open(&config.database)
                .with_context(|| format!("cannot open database {}", config.database.display()))?,
        )
    };
    let gateway: Arc<dyn ActivityGateway> =
        Arc::new(GithubClient::new(&config.github).context("cannot build GitHub client")?);

    match cli.command {
        Command::Serve(args) => serve(&config, args, store, gateway).await,
        command => {
            let ctx = Context {
                store,
                gateway,
                mode: OutputMode::from_flag(cli.json),
            };
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            commands::execute(command, &ctx, &mut out).await
        }
    }
}

async fn serve(
    config: &Config,
    args: ServeArgs,
    store: Arc<dyn ProjectStore>,
    gateway: Arc<dyn ActivityGateway>,
) -> anyhow::Result<()> {
    let addr = args.listen.unwrap_or(config.listen);
    let verifier = SignatureVerifier::new(config.webhook.secret.as_deref());
    let state = WebhookState::new(verifier, Dispatcher::new(store, gateway));

    let tcp = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    info!(%addr, path = listener::WEBHOOK_PATH, "webhook receiver listening");

    axum::serve(tcp, listener::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server failed")?;
    info!("webhook receiver stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}
