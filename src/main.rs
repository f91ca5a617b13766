mod types;
mod config;
mod engine;
mod error;
mod tools;
mod web;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::{LoggingSettings, RiskProfile, RuntimeConfig};
use engine::{SimulationEvent, SimulationHandle};
use tools::position_size_from_input;
use types::{signed_pct, TradingPair};
use web::{start_dashboard_server, AppState};

#[derive(Parser)]
#[command(name = "sim-trading-bot")]
#[command(author = "Trading Bot")]
#[command(version = "0.1.0")]
#[command(about = "Simulated crypto trading bot dashboard. Places no real trades.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard and the simulation API
    Serve {
        /// Dashboard port (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a headless simulation and print the results
    Simulate {
        /// Trading pair (e.g., BTCUSDT, ETH/USDT)
        #[arg(short, long, default_value = "BTCUSDT")]
        pair: String,
        /// Risk profile (conservative, balanced, aggressive)
        #[arg(short, long, default_value = "balanced")]
        risk: String,
        /// Simulated capital in USDT
        #[arg(short, long, default_value = "1000")]
        capital: String,
        /// How long to run before withdrawing
        #[arg(short, long, default_value = "15")]
        seconds: u64,
    },
    /// Compute the maximum risk per trade
    PositionSize {
        /// Account balance
        #[arg(short, long)]
        balance: String,
        /// Risk per trade, in percent
        #[arg(short, long)]
        risk: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = RuntimeConfig::load(Some(&cli.config))?;
    init_logging(&config.logging, cli.verbose)?;

    info!("Simulated Trading Bot v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { port } => {
            run_server(config, port).await?;
        }
        Commands::Simulate { pair, risk, capital, seconds } => {
            let pair: TradingPair = pair.parse()?;
            let risk: RiskProfile = risk.parse().map_err(|e: String| anyhow!(e))?;
            run_headless(config, pair, risk, capital, seconds).await?;
        }
        Commands::PositionSize { balance, risk } => {
            let allocation = position_size_from_input(&balance, &risk)?;
            println!("{}", allocation.message);
        }
    }

    Ok(())
}

fn init_logging(settings: &LoggingSettings, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if settings.json {
        builder.json().try_init().map_err(|e| anyhow!(e))?;
    } else {
        builder.try_init().map_err(|e| anyhow!(e))?;
    }

    Ok(())
}

async fn run_server(config: RuntimeConfig, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);
    let (simulation, task) = SimulationHandle::spawn(config.simulation.clone());
    let app_state = AppState::new(simulation.clone());

    info!("Mode: Simulation (no real trades are placed)");

    tokio::select! {
        result = start_dashboard_server(app_state, &config.server.host, port) => {
            if let Err(e) = result {
                error!("Dashboard server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    simulation.shutdown().await;
    if let Err(e) = task.await {
        warn!("Simulation task ended abnormally: {}", e);
    }

    Ok(())
}

async fn run_headless(
    config: RuntimeConfig,
    pair: TradingPair,
    risk: RiskProfile,
    capital: String,
    seconds: u64,
) -> Result<()> {
    let (simulation, task) = SimulationHandle::spawn(config.simulation.clone());
    let mut events = simulation.subscribe();

    let configuration = simulation.apply_configuration(pair, risk, capital).await??;
    info!(
        "Configured {} / {} with ${} simulated capital",
        configuration.pair(),
        configuration.risk_profile(),
        configuration.simulated_capital()
    );
    simulation.start().await?;

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    simulation.pause().await?;
    let snapshot = simulation.snapshot().await?;
    simulation.withdraw().await?;

    let stats = snapshot.stats;
    println!("\n=== Simulation Results ===");
    println!("Cycles: {}", stats.cycles);
    println!("Trades: {} ({} wins / {} losses)", stats.total_trades, stats.wins, stats.losses);
    println!("Win Rate: {:.2}%", stats.win_rate);
    println!("Total P&L: {}", signed_pct(stats.total_pnl_percent));
    println!("Simulated Profit: ${:.2}", stats.total_profit_absolute);
    println!("Risk Metric: {:.2}", stats.derived_risk_metric);

    simulation.shutdown().await;
    if let Err(e) = task.await {
        warn!("Simulation task ended abnormally: {}", e);
    }

    Ok(())
}

fn print_event(event: &SimulationEvent) {
    match event {
        SimulationEvent::TradeAppended { trade } => {
            info!(
                "{} {} {} @ {} -> {} ({})",
                trade.side,
                trade.size,
                trade.pair,
                trade.entry_price,
                trade.exit_price,
                signed_pct(trade.profit_percent)
            );
        }
        SimulationEvent::VolatilityUpdated { reading } => {
            info!("Volatility {}% ({}): {}", reading.value, reading.regime, reading.comment);
        }
        SimulationEvent::NewLog { log } => {
            info!("{}", log.message);
        }
        _ => {}
    }
}
