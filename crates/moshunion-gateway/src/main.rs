use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use moshunion_core::config::MoshConfig;
use moshunion_scheduler::{SchedulerEngine, Sweeper};
use tracing::info;

mod app;
mod http;
mod watch;
mod ws;

/// Realtime venue capacity and crowd-energy gateway.
#[derive(Parser)]
#[command(name = "moshunion-gateway", version, about)]
struct Cli {
    /// Config file (defaults to ~/.moshunion/moshunion.toml).
    #[arg(long, global = true, env = "MOSHUNION_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP + WebSocket server (default).
    Serve,
    /// Subscribe to one tour and log every push.
    Watch {
        /// Gateway WebSocket URL; defaults to the configured bind address.
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        tour: String,
        /// Display name used in the room.
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "moshunion_gateway=info,moshunion_scheduler=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config / MOSHUNION_CONFIG > ~/.moshunion/moshunion.toml
    let config = MoshConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        MoshConfig::default()
    });

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Watch { url, tour, name } => {
            let url = url.unwrap_or_else(|| {
                format!("ws://{}:{}/ws", config.gateway.bind, config.gateway.port)
            });
            watch::run(&config, url, tour, name).await
        }
    }
}

async fn serve(config: MoshConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let tick = config.scheduler.tick_period();
    let sweep = config.scheduler.sweep_period();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let state = Arc::new(app::AppState::new(config, shutdown_rx.clone()));

    // Update channel: SchedulerEngine → delivery task → BroadcastHub
    let (updates_tx, updates_rx) = tokio::sync::mpsc::channel(256);
    let engine = SchedulerEngine::new(
        Arc::clone(&state.store),
        state.hub.clone(),
        updates_tx,
        tick,
    );
    let sweeper = Sweeper::new(Arc::clone(&state.store), sweep);

    let engine_task = tokio::spawn(engine.run(shutdown_rx.clone()));
    let sweeper_task = tokio::spawn(sweeper.run(shutdown_rx));
    tokio::spawn(app::run_delivery(Arc::clone(&state), updates_rx));

    let router = app::build_router(state);
    info!("MoshUnion gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            // open sockets and SSE streams watch the same flag and close
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = tokio::join!(engine_task, sweeper_task);
    info!("gateway stopped");
    Ok(())
}
