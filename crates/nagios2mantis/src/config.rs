use crate::Templates;
use anyhow::Context;
use derivative::Derivative;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Path of the configuration file used when none is given.
pub const DEFAULT_PATH: &str = "/etc/nagios2mantis.yaml";

/// Config of nagios2mantis, loaded from a YAML file like:
///
/// ```yaml
/// mantis:
///   endpoint: https://mantis.example.com/api/soap/mantisconnect.php
///   username: nagios
///   password: secret
///   default_project_id: 1
///   category: General
///   issue_description: "{{plugin_output}}"
///   note_description: "State: {{state}}\n{{plugin_output}}"
/// spool:
///   database: /var/lib/nagios2mantis/spool.sqlite
///   marker_file: /var/lib/nagios2mantis/pending
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub mantis: MantisConfig,
    pub spool: SpoolConfig,
}

#[derive(Derivative, Deserialize)]
#[derivative(Debug)]
#[serde(deny_unknown_fields)]
pub struct MantisConfig {
    /// URL of the Mantis Connect SOAP endpoint.
    pub endpoint: url::Url,
    pub username: String,
    #[derivative(Debug = "ignore")]
    pub password: String,
    /// Project of opened issues, unless a host's notes name another.
    pub default_project_id: i64,
    /// Category of opened issues.
    pub category: String,
    /// Template of the description of opened issues.
    pub issue_description: String,
    /// Template of the notes added to already-open issues.
    pub note_description: String,
    /// Bound on the duration of each call to Mantis.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpoolConfig {
    /// SQLite database holding spooled alerts and issue relations.
    pub database: PathBuf,
    /// File which is truncated after each spooled alert,
    /// for watchers which trigger a drain.
    pub marker_file: PathBuf,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("invalid configuration {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;

        if config.mantis.username.is_empty() {
            anyhow::bail!("mantis.username must not be empty");
        }
        if config.mantis.category.is_empty() {
            anyhow::bail!("mantis.category must not be empty");
        }
        // Surface template errors now, rather than once per drained alert.
        config.templates()?;

        Ok(config)
    }

    pub fn templates(&self) -> anyhow::Result<Templates> {
        Templates::new(
            &self.mantis.issue_description,
            &self.mantis.note_description,
        )
    }

    pub fn tracker(&self) -> anyhow::Result<mantis::Client> {
        let MantisConfig {
            endpoint,
            username,
            password,
            request_timeout,
            ..
        } = &self.mantis;

        mantis::Client::new(
            endpoint.clone(),
            username.as_str(),
            password.as_str(),
            *request_timeout,
        )
        .context("failed to build Mantis client")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const FIXTURE: &str = r#"
mantis:
  endpoint: https://mantis.example.com/api/soap/mantisconnect.php
  username: nagios
  password: hunter2
  default_project_id: 3
  category: Monitoring
  issue_description: "{{plugin_output}}"
  note_description: "{{state}}: {{plugin_output}}"
spool:
  database: /var/lib/nagios2mantis/spool.sqlite
  marker_file: /var/lib/nagios2mantis/pending
"#;

    #[test]
    fn test_parse_fixture() {
        let config = Config::parse(FIXTURE).unwrap();

        assert_eq!(
            config.mantis.endpoint.as_str(),
            "https://mantis.example.com/api/soap/mantisconnect.php"
        );
        assert_eq!(config.mantis.default_project_id, 3);
        assert_eq!(config.mantis.category, "Monitoring");
        assert_eq!(config.mantis.request_timeout, Duration::from_secs(60));
        assert_eq!(
            config.spool.marker_file,
            PathBuf::from("/var/lib/nagios2mantis/pending")
        );

        // Passwords are kept out of logged configuration.
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"), "{debug}");
    }

    #[test]
    fn test_request_timeout_is_humantime() {
        let content = FIXTURE.replace(
            "  category: Monitoring\n",
            "  category: Monitoring\n  request_timeout: 15s\n",
        );
        let config = Config::parse(&content).unwrap();
        assert_eq!(config.mantis.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_missing_and_invalid_settings() {
        let err = Config::parse(&FIXTURE.replace("  password: hunter2\n", "")).unwrap_err();
        assert!(format!("{err:#}").contains("missing field `password`"), "{err:#}");

        let err = Config::parse(&FIXTURE.replace("default_project_id: 3", "default_project_id: three"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("default_project_id"), "{err:#}");

        let err = Config::parse(&FIXTURE.replace("username: nagios", "username: ''")).unwrap_err();
        assert_eq!(format!("{err:#}"), "mantis.username must not be empty");

        let err = Config::parse(&FIXTURE.replace("{{state}}", "{{hostname}}")).unwrap_err();
        assert!(format!("{err:#}").contains("note_description"), "{err:#}");
    }

    #[test]
    fn test_load_reports_path() {
        let err = Config::load(Path::new("/does/not/exist.yaml")).unwrap_err();
        assert!(
            format!("{err:#}").starts_with("failed to read configuration /does/not/exist.yaml"),
            "{err:#}"
        );
    }
}
