use cli_common::LogArgs;
use spool::AlertState;
use std::path::PathBuf;

pub mod config;
mod enqueue;
pub mod host_notes;
mod prune;
pub mod reconcile;
pub mod templates;

#[cfg(test)]
mod testing;

pub use reconcile::{DrainStats, Outcome, Reconciler};
pub use templates::Templates;

/// Relays Nagios notifications into Mantis issues.
///
/// Notifications are spooled locally by `enqueue`, which never talks to Mantis.
/// `drain` later reconciles spooled alerts with Mantis, opening an issue for
/// each newly failing host or service and adding notes to issues still open.
#[derive(Debug, clap::Parser)]
#[clap(author, about, version)]
pub struct Cli {
    /// Path of the YAML configuration file.
    #[clap(long, env = "NAGIOS2MANTIS_CONFIG", default_value = config::DEFAULT_PATH)]
    config: PathBuf,

    #[clap(subcommand)]
    cmd: Command,

    #[clap(flatten)]
    pub log_args: LogArgs,
}

#[derive(Debug, clap::Subcommand)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Spool a Nagios notification for a later drain.
    ///
    /// Intended to be invoked as a Nagios notification command. The alert is
    /// durably recorded, and the marker file is touched so that a watcher
    /// may trigger a drain.
    #[clap(alias = "spool")]
    Enqueue(enqueue::Enqueue),
    /// Reconcile all spooled alerts with Mantis.
    ///
    /// Alerts whose Mantis call fails remain spooled, and are retried by the next drain.
    #[clap(alias = "empty")]
    Drain,
    /// Forget cached issue relations older than a duration.
    #[clap(alias = "clean")]
    Prune(prune::Prune),
}

impl Cli {
    pub async fn run(&self) -> anyhow::Result<()> {
        let config = config::Config::load(&self.config)?;
        tracing::debug!(?config, "loaded configuration");

        match &self.cmd {
            Command::Enqueue(enqueue) => enqueue.run(&config),
            Command::Drain => drain(&config).await,
            Command::Prune(prune) => prune.run(&config),
        }
    }
}

async fn drain(config: &config::Config) -> anyhow::Result<()> {
    let store = spool::Store::open(&config.spool.database)?;
    let tracker = config.tracker()?;
    let templates = config.templates()?;

    let stats = Reconciler::new(&store, &tracker, &templates, &config.mantis.category)
        .drain()
        .await?;

    let DrainStats {
        created,
        noted,
        discarded,
        retained,
        failed,
    } = stats;
    tracing::info!(%created, %noted, %discarded, %retained, %failed, "drained spooled alerts");

    Ok(())
}

/// Summary of the issue opened for an alert. Host alerts are summarized as
/// `{hostname} is {state}`, and service alerts as
/// `{service} is {state} on host {hostname}`.
pub fn summary(hostname: &str, state: AlertState, service: Option<&str>) -> String {
    match service {
        Some(service) => format!("{service} is {state} on host {hostname}"),
        None => format!("{hostname} is {state}"),
    }
}
