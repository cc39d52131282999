//! `withdraw-all`: withdraw everything from a wallet's vault in one shot.
//!
//! Loads configuration, wires the backend and relayer clients into the
//! withdraw-all action and reports the outcome through the log.

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vault_notify::TracingNotifier;
use vault_ops::{WithdrawAll, WithdrawConfig};
use vault_types::Result;

const DEFAULT_FILTER: &str = "withdraw_all=info,vault_ops=info,vault_api=info,vault_tx=info,vault_notify=info";

#[derive(Debug, Parser)]
#[command(name = "withdraw-all", version, about = "Withdraw all funds from a wallet's vault")]
struct Cli {
    /// Wallet identifier to withdraw from
    #[arg(long)]
    wallet_id: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Override the relayer base URL
    #[arg(long)]
    relayer_url: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// File values first, then command-line overrides.
fn resolve_config(cli: &Cli) -> Result<WithdrawConfig> {
    let mut config = match cli.config {
        Some(ref path) => WithdrawConfig::load(path)?,
        None => WithdrawConfig::default(),
    };
    if let Some(ref url) = cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(ref url) = cli.relayer_url {
        config.relayer_url = url.clone();
    }
    Ok(config)
}

/// Run once and map the outcome to an exit code, writing the hash to `out`.
///
/// Failures have already been reported by the action's notifier.
async fn execute(withdraw: &WithdrawAll, wallet_id: Option<&str>, out: &mut impl Write) -> ExitCode {
    match withdraw.run(wallet_id).await {
        Ok(result) => match writeln!(out, "{}", result.transaction_hash) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "failed to write transaction hash");
                ExitCode::FAILURE
            }
        },
        Err(_) => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(
        backend_url = %config.backend_url,
        relayer_url = %config.relayer_url,
        "configuration loaded"
    );

    let withdraw = match WithdrawAll::from_config(&config, Arc::new(TracingNotifier)) {
        Ok(withdraw) => withdraw,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    execute(&withdraw, cli.wallet_id.as_deref(), &mut std::io::stdout().lock()).await
}
