use crate::config::Config;
use crate::host_notes;
use anyhow::Context;
use spool::AlertState;
use std::path::Path;

#[derive(Debug, clap::Args)]
#[clap(rename_all = "kebab-case")]
pub struct Enqueue {
    /// Name of the alerting host ($HOSTNAME$).
    #[clap(long)]
    hostname: String,
    /// Nagios state of the host or service ($HOSTSTATE$ or $SERVICESTATE$).
    #[clap(long, value_parser = parse_state)]
    state: AlertState,
    /// Description of the alerting service ($SERVICEDESC$).
    /// Omitted or empty for host alerts.
    #[clap(long)]
    service: Option<String>,
    /// Output of the check plugin ($HOSTOUTPUT$ or $SERVICEOUTPUT$).
    #[clap(long)]
    plugin_output: String,
    /// Notes of the host ($HOSTNOTES$). A YAML document with a
    /// `mantis_project_id` overrides the default Mantis project.
    #[clap(long)]
    host_notes: Option<String>,
}

fn parse_state(s: &str) -> Result<AlertState, spool::InvalidState> {
    s.parse()
}

impl Enqueue {
    pub fn run(&self, config: &Config) -> anyhow::Result<()> {
        let Self {
            hostname,
            state,
            service,
            plugin_output,
            host_notes,
        } = self;

        // Nagios passes an empty $SERVICEDESC$ for host notifications.
        let service = service.as_deref().filter(|s| !s.is_empty());
        let project_id = host_notes::project_id(host_notes.as_deref())
            .unwrap_or(config.mantis.default_project_id);

        let store = spool::Store::open(&config.spool.database).with_context(|| {
            format!(
                "failed to open spool database {}",
                config.spool.database.display()
            )
        })?;
        let id = store
            .enqueue(hostname, *state, service, plugin_output, project_id)
            .context("failed to spool alert")?;

        tracing::info!(%id, %hostname, %state, ?service, %project_id, "spooled alert");

        touch_marker(&config.spool.marker_file)
    }
}

// Truncates or creates the marker file, which watchers observe to trigger a drain.
fn touch_marker(path: &Path) -> anyhow::Result<()> {
    std::fs::File::create(path)
        .with_context(|| format!("failed to touch marker file {}", path.display()))?;
    Ok(())
}
