use anyhow::Result;
use clap::Parser;
use perps_risk_dashboard::config::{ConfigError, DashboardConfig, LookbackDays, SETUP_INSTRUCTIONS};
use perps_risk_dashboard::logging;
use perps_risk_dashboard::presentation::{render_snapshot, Dashboard, Header};
use perps_risk_dashboard::services::{
    AccountDataClient, DashboardSession, RefreshScheduler, RefreshTrigger,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Read-only risk dashboard for a perpetual futures account.
#[derive(Debug, Parser)]
#[command(name = "risk-dashboard", version)]
struct Args {
    /// Secrets file with a [risk_management] table
    #[arg(long, env = "RISK_DASHBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Trade history lookback in days, overrides the configured value
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=7))]
    days: Option<u32>,

    /// Fetch once, print a text snapshot and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Held until main returns so buffered log lines are flushed on every exit path.
    let (_log_guard, log_dir) = logging::init_logging()?;
    info!(log_dir = %log_dir.display(), "Starting Perps Risk Dashboard");

    let mut config = match DashboardConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(ConfigError::MissingCredentials) => {
            error!("Missing wallet credentials");
            eprintln!("{}", SETUP_INSTRUCTIONS);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    if let Some(days) = args.days {
        config.trade_history_days = LookbackDays::clamped(days as i64);
    }

    info!("Configuration:");
    info!("  Network: {}", config.credentials.network);
    info!("  Lookback: {} days", config.trade_history_days);
    info!("  Symbols: {}", config.trade_symbols.join(", "));
    info!("  Refresh interval: {}s", config.refresh_interval.as_secs());

    let client = AccountDataClient::initialize(&config.credentials);
    let mut session = DashboardSession::from_config(client, &config);

    if args.once {
        session.show_trade_statistics = true;
        session.refresh(RefreshTrigger::Manual).await;
        let header = Header {
            wallet_address: &config.credentials.wallet_address,
            network: config.credentials.network,
            refresh_secs: config.refresh_interval.as_secs(),
        };
        print!("{}", render_snapshot(&header, &session));
        return Ok(ExitCode::SUCCESS);
    }

    let mut dashboard = Dashboard::new(
        session,
        RefreshScheduler::new(config.refresh_interval),
        config.credentials.wallet_address.clone(),
        config.credentials.network,
    );
    dashboard.run().await?;
    Ok(ExitCode::SUCCESS)
}
