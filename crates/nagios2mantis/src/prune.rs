use crate::config::Config;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, clap::Args)]
#[clap(rename_all = "kebab-case")]
pub struct Prune {
    /// Relations cached for longer than this duration are removed.
    #[clap(long, default_value = "30days", value_parser = humantime::parse_duration)]
    older_than: Duration,
}

impl Prune {
    pub fn run(&self, config: &Config) -> anyhow::Result<()> {
        let cutoff = cutoff(Utc::now(), self.older_than)?;

        let store = spool::Store::open(&config.spool.database).with_context(|| {
            format!(
                "failed to open spool database {}",
                config.spool.database.display()
            )
        })?;
        let pruned = store
            .prune_relations_older_than(cutoff)
            .context("failed to prune issue relations")?;

        tracing::info!(%pruned, %cutoff, "pruned issue relations");
        Ok(())
    }
}

fn cutoff(now: DateTime<Utc>, older_than: Duration) -> anyhow::Result<DateTime<Utc>> {
    let older_than = chrono::Duration::from_std(older_than)
        .context("--older-than is out of range")?;

    now.checked_sub_signed(older_than)
        .context("--older-than is out of range")
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[derive(Debug, clap::Parser)]
    struct Args {
        #[clap(flatten)]
        prune: Prune,
    }

    #[test]
    fn test_older_than_parsing() {
        let args = Args::try_parse_from(["prune"]).unwrap();
        assert_eq!(args.prune.older_than, Duration::from_secs(30 * 86400));

        let args = Args::try_parse_from(["prune", "--older-than", "1week 2days"]).unwrap();
        assert_eq!(args.prune.older_than, Duration::from_secs(9 * 86400));

        assert!(Args::try_parse_from(["prune", "--older-than", "soon"]).is_err());
    }

    #[test]
    fn test_cutoff() {
        let now = "2024-03-31T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(
            cutoff(now, Duration::from_secs(30 * 86400)).unwrap().to_rfc3339(),
            "2024-03-01T12:00:00+00:00"
        );
        assert!(cutoff(now, Duration::MAX).is_err());
    }
}
