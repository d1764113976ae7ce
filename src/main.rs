mod cli;

use std::str::FromStr;

use alloy::primitives::U256;
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use cli::{render_split, render_text, OutputFormat, SplitterCli, SplitterCommand};
use token_splitter::{
    chain::connect,
    distribution::{apply_remainder_policy, compute_split},
    errors::{ConfigError, SplitterError},
    Session, TokenChain,
};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run<C: TokenChain>(
    session: &mut Session<C>,
    command: SplitterCommand,
    cancel: &CancellationToken,
) -> Result<(), SplitterError> {
    match command {
        SplitterCommand::Connect | SplitterCommand::Split { .. } => {}
        SplitterCommand::Discover => {
            session.discover(cancel).await?;
        }
        SplitterCommand::Distribute { token } => {
            session.discover(cancel).await?;
            session.distribute_one(token).await?;
        }
        SplitterCommand::DistributeAll => {
            session.discover(cancel).await?;
            session.distribute_all(cancel).await?;
        }
        SplitterCommand::DistributeContract => {
            session.discover(cancel).await?;
            session.distribute_contract_batch().await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = SplitterCli::parse();
    init_tracing(cli.verbose);

    let config = cli.resolve_config()?;

    if let SplitterCommand::Split {
        balance,
        decimals,
        remainder,
    } = &cli.command
    {
        let raw = U256::from_str(balance).with_context(|| format!("invalid balance {}", balance))?;
        let breakdown = apply_remainder_policy(
            compute_split(raw, *decimals, &config.share_table()?),
            (*remainder).into(),
        );
        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&breakdown)?),
            OutputFormat::Text => print!("{}", render_split(&breakdown)),
        }
        return Ok(());
    }

    let rpc_url = config
        .rpc_url
        .clone()
        .ok_or(ConfigError::Missing("rpc_url"))?;
    let private_key = cli
        .private_key
        .clone()
        .ok_or(ConfigError::Missing("private_key"))?;

    let chain = connect(&rpc_url, &private_key).await?;
    let mut session = Session::from_config(chain, &config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling scan");
            ctrl_c.cancel();
        }
    });

    session.connect().await?;
    info!(contract = %config.custodial_contract, "Session ready");

    let outcome = run(&mut session, cli.command, &cancel).await;

    let view = session.view();
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Text => print!("{}", render_text(&view)),
    }

    outcome?;
    Ok(())
}
