use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    derive_disburse,
    proposal_options::{ProposalOptionsPanel, DURATION_MIN},
    AxonClient, ClientEvent, DisburseForm, DisburseOutcome, GovernanceContext, QueryKey,
};
use serde_json::json;
use shared::{
    domain::{AxonId, TokenAmount},
    protocol::ProposalOptions,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(name = "axon-monitor", about = "Watch and prepare Axon governance actions")]
struct Cli {
    #[arg(long, default_value = "axon.toml")]
    config: PathBuf,
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(long)]
    axon_id: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll pending actions, all actions and info until interrupted.
    Watch,
    /// Build a disburse command from raw inputs.
    Disburse {
        #[arg(long, default_value = "")]
        account: String,
        #[arg(long, default_value = "")]
        amount: String,
        /// Neuron stake in tokens; caps the amount.
        #[arg(long)]
        stake: Option<String>,
        /// Read `account <hex>` / `amount <tokens>` edits from stdin.
        #[arg(long)]
        interactive: bool,
    },
    /// Print proposal settings as the options panel would report them.
    Options {
        #[arg(long)]
        time_start: Option<String>,
        #[arg(long)]
        duration_seconds: Option<String>,
        #[arg(long)]
        no_execute: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config)?;
    if let Some(url) = cli.backend_url {
        settings.backend_url = url;
    }
    if cli.axon_id.is_some() {
        settings.axon_id = cli.axon_id;
    }

    match cli.command {
        Command::Watch => watch(&settings).await,
        Command::Disburse {
            account,
            amount,
            stake,
            interactive,
        } => {
            let stake = stake
                .as_deref()
                .map(TokenAmount::parse_tokens)
                .transpose()
                .context("invalid --stake")?;
            if interactive {
                disburse_interactive(&settings, stake).await
            } else {
                let outcome = derive_disburse(&account, &amount, stake);
                println!("{}", outcome_json(&outcome));
                if let Some(error) = outcome.error {
                    bail!(error);
                }
                Ok(())
            }
        }
        Command::Options {
            time_start,
            duration_seconds,
            no_execute,
        } => {
            let options = collect_options(time_start, duration_seconds, !no_execute);
            if !options.meets_declared_minimums() {
                warn!(
                    duration_min = DURATION_MIN,
                    "proposal settings are below the declared minimums"
                );
            }
            println!("{}", serde_json::to_string_pretty(&options)?);
            Ok(())
        }
    }
}

async fn watch(settings: &Settings) -> Result<()> {
    let Some(axon_id) = settings.axon_id.map(AxonId) else {
        bail!("no axon id configured; pass --axon-id or set AXON_ID");
    };
    let context = GovernanceContext::http(&settings.backend_url, axon_id)?;

    let client = AxonClient::start(settings.poller_config());
    let mut events = client.subscribe_events();
    client.switch_context(context).await;
    info!(axon_id = axon_id.0, backend_url = %settings.backend_url, "watching axon");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => report(&client, event).await,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    client.shutdown().await;
    Ok(())
}

async fn report(client: &AxonClient, event: ClientEvent) {
    match event {
        ClientEvent::QueryUpdated {
            key: QueryKey::PendingActions,
        } => {
            let pending = client.pending_actions().await.data;
            let executing = pending.iter().filter(|a| a.status.is_executing()).count();
            println!("pending actions: {} ({executing} executing)", pending.len());
        }
        ClientEvent::QueryUpdated {
            key: QueryKey::AllActions,
        } => {
            let all = client.all_actions().await.data;
            println!("all actions: {}", all.len());
            if let Some(latest) = all.iter().max_by_key(|a| a.id) {
                println!("  latest #{} {}", latest.id, latest.status.label());
            }
        }
        ClientEvent::QueryUpdated { key: QueryKey::Info } => {
            if let Some(info) = client.info().await.data {
                println!(
                    "axon {} '{}': {} members, {} neurons, supply {}",
                    info.id, info.name, info.member_count, info.neuron_count, info.total_supply
                );
            }
        }
        ClientEvent::QueryFailed { key, reason } => eprintln!("{key} failed: {reason}"),
        ClientEvent::ExecutionStateChanged { executing } => {
            println!("execution in progress: {executing}");
        }
        ClientEvent::ContextChanged { axon_id } => println!("switched to axon {axon_id}"),
    }
}

async fn disburse_interactive(settings: &Settings, stake: Option<TokenAmount>) -> Result<()> {
    let (form, mut outcomes) = DisburseForm::spawn(stake, settings.debounce());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim().split_once(' ') {
                    Some(("account", value)) => form.set_account(value.trim()),
                    Some(("amount", value)) => form.set_amount(value.trim()),
                    _ => eprintln!("expected 'account <hex>' or 'amount <tokens>'"),
                }
            }
            Some(outcome) = outcomes.recv() => println!("{}", outcome_json(&outcome)),
        }
    }

    // Let the last edit settle before shutting the form down.
    tokio::time::sleep(settings.debounce() * 2).await;
    while let Ok(outcome) = outcomes.try_recv() {
        println!("{}", outcome_json(&outcome));
    }
    form.close().await;
    Ok(())
}

fn outcome_json(outcome: &DisburseOutcome) -> serde_json::Value {
    json!({
        "command": outcome.command,
        "error": outcome.error,
    })
}

fn collect_options(
    time_start: Option<String>,
    duration_seconds: Option<String>,
    execute: bool,
) -> ProposalOptions {
    let mut latest = ProposalOptions::default();
    let mut panel = ProposalOptionsPanel::new(|options: &ProposalOptions| {
        latest = options.clone();
    });
    if let Some(v) = time_start {
        panel.set_time_start(v);
    }
    if let Some(v) = duration_seconds {
        panel.set_duration_seconds(v);
    }
    panel.set_execute(execute);
    drop(panel);
    latest
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
