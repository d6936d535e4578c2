//! volumapper: map EBS volumes to their EC2 instances across regions.
//!
//! Provider inventory calls are rate-limited and the inventory rarely changes,
//! so every (account, region, data source) result is captured to disk and
//! replayed until it is older than its freshness budget.
//!
//! # Architecture
//!
//! - [`core::store`]: timestamped JSON snapshots under
//!   `{results}/{identity}/{region}/{source}/{epoch}.json`, published with an
//!   atomic rename.
//! - [`core::freshness`]: pure REUSE / REFRESH decision.
//! - [`core::cache`]: fetch-or-reuse around an arbitrary remote call. Remote
//!   failures degrade to "no data"; store failures are surfaced.
//! - [`pollers`]: one poller per region, fanned out by the aggregator.
//! - [`report`]: joins volumes to instances and renders the table.
//!
//! # Examples
//!
//! ```bash
//! # Report across the default region set, replaying anything younger than a day
//! volumapper report
//!
//! # Two regions, bypassing the cache, with unattached volumes
//! volumapper report -r us-east-1 -r eu-west-1 --force --include-rogue-volumes
//!
//! # Drop every snapshot but the latest
//! volumapper cleanup
//! ```

mod cli;
pub mod core;
pub mod model;
pub mod pollers;
pub mod report;

use crate::core::cache::SnapshotCache;
use crate::core::config::{self, Config};
use crate::core::error::VolumapperError;
use crate::core::freshness::{self, Decision};
use crate::core::store::{DataSourceKind, SnapshotStore};
use crate::core::time::now_epoch_secs;
use crate::pollers::aggregator::Aggregator;
use crate::pollers::credentials::AwsCredentials;
use crate::pollers::provider::RegionConnector;
use crate::pollers::region::PollSettings;
use clap::Parser;
use cli::{Cli, Command, OutputFormat, ReportCli, StatusCli};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV_VAR: &str = "VOLUMAPPER_LOG";

/// Initialize tracing on stderr. `VOLUMAPPER_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,volumapper=debug"
    } else {
        "warn,volumapper=info"
    };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub fn run() -> Result<(), VolumapperError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load_config(cli.config.as_deref())?;
    let results_dir = cli
        .results_dir
        .clone()
        .unwrap_or_else(|| config.results_dir.clone());

    match cli.command {
        Command::Report(args) => cmd_report(&args, &config, results_dir),
        Command::Status(args) => cmd_status(&args, &config, results_dir),
        Command::Cleanup => cmd_cleanup(results_dir),
    }
}

fn cmd_report(
    args: &ReportCli,
    config: &Config,
    results_dir: PathBuf,
) -> Result<(), VolumapperError> {
    let credentials = AwsCredentials::from_env()?;
    let connector = build_connector(&credentials, config)?;

    let regions = if args.regions.is_empty() {
        config.regions.clone()
    } else {
        args.regions.clone()
    };
    let settings = PollSettings {
        force: args.force,
        include_rogue_volumes: args.include_rogue_volumes,
        instances_budget: config.budget_for(DataSourceKind::Instances),
        volumes_budget: config.budget_for(DataSourceKind::Volumes),
    };

    info!(results_dir = %results_dir.display(), "setting up the file-tree to store API data");
    let cache = SnapshotCache::new(Arc::new(SnapshotStore::new(results_dir)));
    let inventory = Aggregator::new(
        &credentials.access_key_id,
        &regions,
        connector,
        cache,
        settings,
    )
    .parallel(config.parallel)
    .run()?;

    if inventory.volumes.is_empty() {
        info!("No EBS Volumes were found, nothing to output");
        return Ok(());
    }

    info!("Outputting EBS Volumes and their EC2 Instances");
    let rows = report::build_rows(&inventory.volumes, &inventory.instances);
    match args.format {
        OutputFormat::Table => println!("{}", report::render_table(&rows)),
        OutputFormat::Json => println!("{}", report::render_json(&rows)?),
    }
    Ok(())
}

#[cfg(feature = "aws")]
fn build_connector(
    credentials: &AwsCredentials,
    config: &Config,
) -> Result<Arc<dyn RegionConnector>, VolumapperError> {
    let connector =
        pollers::aws::AwsConnector::new(credentials.clone(), config.endpoint_url.clone())?;
    Ok(Arc::new(connector))
}

#[cfg(not(feature = "aws"))]
fn build_connector(
    _credentials: &AwsCredentials,
    _config: &Config,
) -> Result<Arc<dyn RegionConnector>, VolumapperError> {
    Err(VolumapperError::ConfigError(
        "volumapper was built without the `aws` feature; no provider available".into(),
    ))
}

#[derive(Debug, Serialize)]
struct PartitionStatus {
    partition: String,
    snapshots: usize,
    latest: Option<i64>,
    age_secs: Option<u64>,
    fresh: bool,
}

fn cmd_status(
    args: &StatusCli,
    config: &Config,
    results_dir: PathBuf,
) -> Result<(), VolumapperError> {
    let store = SnapshotStore::new(results_dir);
    let now = now_epoch_secs();

    let mut statuses = Vec::new();
    for partition in store.partitions()? {
        let instants = store.instants(&partition)?;
        let latest = instants.last().copied();
        let budget = DataSourceKind::ALL
            .iter()
            .find(|k| k.name() == partition.source)
            .map(|k| config.budget_for(*k))
            .unwrap_or(freshness::DEFAULT_BUDGET);
        statuses.push(PartitionStatus {
            partition: partition.to_string(),
            snapshots: instants.len(),
            latest,
            age_secs: latest.map(|l| freshness::age(l, now)),
            fresh: freshness::decide(latest, now, budget, false) == Decision::Reuse,
        });
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&statuses)?),
        OutputFormat::Table => {
            if statuses.is_empty() {
                println!(
                    "{} No snapshots under {}",
                    "ℹ".bright_blue(),
                    store.root().display()
                );
            }
            for s in &statuses {
                let marker = if s.fresh {
                    "✓".bright_green()
                } else {
                    "⚠".bright_yellow()
                };
                match (s.latest, s.age_secs) {
                    (Some(latest), Some(age)) => println!(
                        "{} {} latest {} ({} old, {} snapshot{})",
                        marker,
                        s.partition.bold(),
                        latest,
                        format_age(age),
                        s.snapshots,
                        if s.snapshots == 1 { "" } else { "s" }
                    ),
                    _ => println!("{} {} {}", marker, s.partition.bold(), "empty".dimmed()),
                }
            }
        }
    }
    Ok(())
}

fn cmd_cleanup(results_dir: PathBuf) -> Result<(), VolumapperError> {
    let store = SnapshotStore::new(results_dir);
    println!(
        "Walking through '{}' cleaning up old data-files...",
        store.root().display()
    );
    for path in store.prune_all()? {
        println!("  Deleting {}", path.display());
    }
    Ok(())
}

/// Compact human age, e.g. `2d 3h`, `14m`, `9s`.
pub fn format_age(secs: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;
    match secs {
        s if s >= DAY => format!("{}d {}h", s / DAY, (s % DAY) / HOUR),
        s if s >= HOUR => format!("{}h {}m", s / HOUR, (s % HOUR) / MINUTE),
        s if s >= MINUTE => format!("{}m", s / MINUTE),
        s => format!("{}s", s),
    }
}
