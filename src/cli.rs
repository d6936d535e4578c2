//! CLI struct definitions for the volumapper command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "volumapper",
    version = env!("CARGO_PKG_VERSION"),
    about = "Map Amazon EBS volumes to EC2 instances and output them as a table.\nNOTE: AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be defined for `report`."
)]
pub(crate) struct Cli {
    /// Root of the snapshot tree (defaults to the config value, then `results/`).
    #[clap(long, global = true)]
    pub results_dir: Option<PathBuf>,
    /// Config file (defaults to `./volumapper.toml` when present).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Provide debugging information.
    #[clap(short, long, global = true)]
    pub verbose: bool,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Poll (or replay) inventory and print the volume → instance table
    Report(ReportCli),
    /// Show every cached partition and how fresh its latest snapshot is
    Status(StatusCli),
    /// Delete all but the latest snapshot in every partition
    Cleanup,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ReportCli {
    /// Region(s) the EC2 instances are located in. Repeatable.
    #[clap(short, long = "region")]
    pub regions: Vec<String>,
    /// Forcefully poll the API for the freshest data.
    #[clap(short, long)]
    pub force: bool,
    /// Include volumes that are detached from instances.
    #[clap(long)]
    pub include_rogue_volumes: bool,
    /// Output format.
    #[clap(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub(crate) struct StatusCli {
    /// Output format.
    #[clap(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}
