use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "ignis",
    author,
    version,
    about = "Resumable, journal-backed deployment runner",
    long_about = "Runs declarative deployment modules against a chain backend, journaling \
                  every step so interrupted runs resume instead of repeating work."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a module to completion, resuming any recorded progress
    Deploy(DeployArgs),

    /// Show the recorded status of every future without touching the network
    Status(StatusArgs),

    /// Erase one future's recorded state so the next run re-executes it
    Wipe(WipeArgs),

    /// Print the raw journal records of a deployment
    Journal(JournalArgs),
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Module definition file (JSON)
    #[arg(value_name = "MODULE")]
    pub module: PathBuf,

    /// Deployment parameters file ({ "name": value })
    #[arg(long, value_name = "PATH")]
    pub parameters: Option<PathBuf>,

    /// Deployment directory (default: deployments/<module>)
    #[arg(long, value_name = "DIR")]
    pub deployment_dir: Option<PathBuf>,

    /// JSON-RPC endpoint of a development node with unlocked accounts
    #[arg(long, value_name = "URL", conflicts_with = "simulate")]
    pub rpc_url: Option<String>,

    /// Run against the deterministic in-process chain instead of a node
    #[arg(long, default_value_t = false)]
    pub simulate: bool,

    /// How many accounts the in-process chain derives
    #[arg(long, default_value_t = 3, value_name = "N")]
    pub accounts: usize,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Deployment directory
    #[arg(value_name = "DIR")]
    pub deployment_dir: PathBuf,

    /// Output the replayed states as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct WipeArgs {
    /// Deployment directory
    #[arg(value_name = "DIR")]
    pub deployment_dir: PathBuf,

    /// Id of the future to wipe, e.g. Module1:Contract1
    #[arg(value_name = "FUTURE_ID")]
    pub future_id: String,
}

#[derive(Debug, Args)]
pub struct JournalArgs {
    /// Deployment directory
    #[arg(value_name = "DIR")]
    pub deployment_dir: PathBuf,
}
