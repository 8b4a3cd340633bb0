//! Ignis deployment runner.
//!
//! Executes declarative deployment modules against a chain backend. Every
//! step is appended to a journal before it takes effect, so a run that is
//! interrupted, killed, or fails halfway can be re-run and picks up exactly
//! where it stopped instead of repeating transactions.
//!
//! ## Usage
//!
//! ```bash
//! # Run a module against the in-process chain
//! ignis deploy module.json --simulate
//!
//! # Run against a development node
//! ignis deploy module.json --rpc-url http://127.0.0.1:8545
//!
//! # Inspect recorded progress offline
//! ignis status deployments/Module1
//! ignis journal deployments/Module1
//!
//! # Forget one future so the next run redoes it
//! ignis wipe deployments/Module1 Module1:Contract1
//! ```

mod args;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;

use ignis_chain::{ChainAdapter, HttpChainAdapter, SimulatedChainAdapter};
use ignis_core::deployment::DeploymentDir;
use ignis_core::module::{load_module, load_parameters};
use ignis_core::{
    reconcile, ExecutionConfig, ExecutionEngine, ExecutionStateMap, ExecutionStatus, FileJournal,
    Journal, JournalMessage,
};

use crate::args::{Cli, Command, DeployArgs, JournalArgs, StatusArgs, WipeArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Deploy(args) => deploy(args).await,
        Command::Status(args) => status(args),
        Command::Wipe(args) => wipe(args),
        Command::Journal(args) => journal(args),
    }
}

async fn deploy(args: DeployArgs) -> Result<()> {
    let graph = load_module(&args.module)?;
    let parameters = match &args.parameters {
        Some(path) => load_parameters(path)?,
        None => BTreeMap::new(),
    };

    let config = ExecutionConfig::from_env();
    let adapter: Arc<dyn ChainAdapter> = if args.simulate {
        Arc::new(SimulatedChainAdapter::new(args.accounts)?)
    } else if let Some(url) = &args.rpc_url {
        Arc::new(
            HttpChainAdapter::new(url).with_required_confirmations(config.required_confirmations),
        )
    } else {
        bail!(
            "no chain backend configured. Pass --rpc-url for a JSON-RPC node \
             or --simulate for the in-process chain."
        );
    };

    let root = args
        .deployment_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("deployments").join(&graph.module));
    let dir = DeploymentDir::open_or_create(&root, &graph.module, adapter.network_name())?;
    let journal = Arc::new(FileJournal::new(dir.journal_path()));
    let recovered = ExecutionStateMap::replay(&journal.read_all()?)
        .with_context(|| format!("recovering deployment state from {}", root.display()))?;

    let accounts = adapter
        .accounts()
        .await
        .context("fetching accounts from the chain backend")?;

    let report = reconcile(&recovered, &graph, &accounts, &parameters)?;
    for future_id in &report.missing_executed_futures {
        eprintln!("note: \"{future_id}\" has recorded state but is no longer in the module");
    }
    if !report.is_successful() {
        eprintln!("reconciliation failed:");
        for failure in &report.reconciliation_failures {
            eprintln!("  - {failure}");
        }
        bail!(
            "{} future(s) no longer match their recorded state; \
             update the module or wipe the affected futures",
            report.reconciliation_failures.len()
        );
    }

    if !recovered.is_empty() {
        println!(
            "resuming deployment in {} ({} future(s) with recorded state)",
            root.display(),
            recovered.len()
        );
    }

    let engine = ExecutionEngine::new(adapter, journal, config);
    let result = engine.execute(&graph, recovered, &parameters).await?;
    print!("{result}");

    dir.write_addresses(&result.addresses)?;
    if !result.addresses.is_empty() {
        println!("addresses written to {}", dir.addresses_path().display());
    }

    if !result.is_success() {
        bail!(
            "deployment did not complete: {} failed, {} timed out, {} skipped; \
             re-run to retry",
            result.failed.len(),
            result.timed_out.len(),
            result.skipped.len()
        );
    }
    Ok(())
}

fn status(args: StatusArgs) -> Result<()> {
    let dir = DeploymentDir::open_existing(&args.deployment_dir)?;
    let journal = FileJournal::new(dir.journal_path());
    let states = ExecutionStateMap::replay(&journal.read_all()?)?;

    if args.json {
        let all: Vec<_> = states.states().collect();
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    if let Some(manifest) = dir.read_manifest()? {
        println!(
            "deployment {} of module \"{}\" on {} (last run {})",
            manifest.deployment_id,
            manifest.module,
            manifest.network,
            manifest.last_run_at.to_rfc3339()
        );
    }
    if states.is_empty() {
        println!("no futures recorded yet");
        return Ok(());
    }

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut timed_out = 0usize;
    let mut in_flight = 0usize;
    for state in states.states() {
        let detail = match state.status {
            ExecutionStatus::Success => {
                succeeded += 1;
                state
                    .reference_value()
                    .map(|value| format!(" -> {}", display_value(&value)))
                    .unwrap_or_default()
            }
            ExecutionStatus::Failed => {
                failed += 1;
                state
                    .error
                    .as_deref()
                    .map(|reason| format!(": {reason}"))
                    .unwrap_or_default()
            }
            ExecutionStatus::TimedOut => {
                timed_out += 1;
                state
                    .last_accepted_tx()
                    .map(|tx| format!(": tx {tx} awaiting confirmation"))
                    .unwrap_or_default()
            }
            ExecutionStatus::Started => {
                in_flight += 1;
                ": interrupted, settles on the next run".to_string()
            }
        };
        println!(
            "  {:<9} {}{}",
            state.status.to_string(),
            state.future_id,
            detail
        );
    }
    println!(
        "{} recorded: {} succeeded, {} failed, {} timed out, {} in flight",
        states.len(),
        succeeded,
        failed,
        timed_out,
        in_flight
    );
    Ok(())
}

fn wipe(args: WipeArgs) -> Result<()> {
    let dir = DeploymentDir::open_existing(&args.deployment_dir)?;
    let journal = FileJournal::new(dir.journal_path());
    let states = ExecutionStateMap::replay(&journal.read_all()?)?;

    let future_id = args.future_id;
    if states.get(&future_id).is_none() {
        bail!(
            "no recorded state for \"{}\" in {}",
            future_id,
            dir.root().display()
        );
    }
    let dependents: Vec<&str> = states
        .states()
        .filter(|state| state.dependencies.iter().any(|dep| dep == &future_id))
        .map(|state| state.future_id.as_str())
        .collect();
    if !dependents.is_empty() {
        bail!(
            "\"{}\" still has recorded dependents: {}. Wipe those first.",
            future_id,
            dependents.join(", ")
        );
    }

    journal.append(&JournalMessage::Wipe {
        future_id: future_id.clone(),
    })?;
    println!("wiped \"{future_id}\"; the next run executes it from scratch");
    Ok(())
}

fn journal(args: JournalArgs) -> Result<()> {
    let dir = DeploymentDir::open_existing(&args.deployment_dir)?;
    let journal = FileJournal::new(dir.journal_path());
    let messages = journal.read_all()?;
    if messages.is_empty() {
        println!("journal is empty");
        return Ok(());
    }
    for (index, message) in messages.iter().enumerate() {
        println!("{:>4}  {}", index + 1, serde_json::to_string(message)?);
    }
    Ok(())
}

/// Strings print bare, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
