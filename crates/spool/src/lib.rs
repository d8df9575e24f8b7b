//! Durable spool of Nagios alerts awaiting reconciliation with Mantis,
//! and the cache of Mantis issues previously opened for a host or service.
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::str::FromStr;

mod store;

pub use store::Store;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    // rusqlite does a pretty good job of showing context in its errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("{count} issue relations exist for hostname {hostname:?} and service {service:?}")]
    AmbiguousRelation {
        hostname: String,
        service: Option<String>,
        count: usize,
    },
    #[error("a relation to issue {existing} already exists for hostname {hostname:?} and service {service:?} (adding issue {issue_id})")]
    RelationExists {
        hostname: String,
        service: Option<String>,
        existing: i64,
        issue_id: i64,
    },
    #[error("relation for hostname {hostname:?} has an invalid creation timestamp {created_at:?}")]
    InvalidTimestamp {
        hostname: String,
        created_at: String,
        #[source]
        err: chrono::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// State of a Nagios host or service, as reported by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum AlertState {
    Up,
    Down,
    Critical,
    Warning,
    Ok,
    Unknown,
    Pending,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Up => "UP",
            AlertState::Down => "DOWN",
            AlertState::Critical => "CRITICAL",
            AlertState::Warning => "WARNING",
            AlertState::Ok => "OK",
            AlertState::Unknown => "UNKNOWN",
            AlertState::Pending => "PENDING",
        }
    }

    /// UP is the recovery state: an entity in this state needs no new issue.
    pub fn is_recovery(&self) -> bool {
        matches!(self, AlertState::Up)
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("{0:?} is not a Nagios state")]
pub struct InvalidState(pub String);

impl FromStr for AlertState {
    type Err = InvalidState;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        use strum::IntoEnumIterator;

        AlertState::iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| InvalidState(s.to_string()))
    }
}

impl ToSql for AlertState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AlertState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        AlertState::from_str(s).map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

/// An alert which was spooled but not yet turned into a Mantis issue or note.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAlert {
    pub id: i64,
    pub hostname: String,
    pub state: AlertState,
    pub service: Option<String>,
    pub plugin_output: String,
    pub project_id: i64,
}

/// Cached link between a host (or one of its services) and the Mantis issue
/// opened for it.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRelation {
    pub hostname: String,
    pub service: Option<String>,
    pub issue_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
