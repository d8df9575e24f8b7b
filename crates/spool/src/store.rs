use super::{AlertState, Error, IssueRelation, PendingAlert, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

/// How long a writer waits on another process holding the database lock,
/// for example a `drain` racing an `enqueue`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(120);

/// Store is the SQLite-backed spool of pending alerts and issue relations.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open the spool database at `path`, creating it and its tables if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened spool database");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Spool a new alert, returning its assigned identifier.
    pub fn enqueue(
        &self,
        hostname: &str,
        state: AlertState,
        service: Option<&str>,
        plugin_output: &str,
        project_id: i64,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO pending_alerts (hostname, state, service, plugin_output, project_id)
             VALUES (?, ?, ?, ?, ?)",
            params![hostname, state, service, plugin_output, project_id],
        )?;
        let id = self.conn.last_insert_rowid();

        tracing::debug!(%id, %hostname, %state, ?service, %project_id, "spooled alert");
        Ok(id)
    }

    /// All pending alerts, in the order they were spooled.
    pub fn list_pending(&self) -> Result<Vec<PendingAlert>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, hostname, state, service, plugin_output, project_id
             FROM pending_alerts ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PendingAlert {
                id: row.get(0)?,
                hostname: row.get(1)?,
                state: row.get(2)?,
                service: row.get(3)?,
                plugin_output: row.get(4)?,
                project_id: row.get(5)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Remove a pending alert. Removing an absent alert is not an error.
    pub fn delete_pending(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM pending_alerts WHERE id = ?", params![id])?;

        tracing::debug!(%id, %deleted, "removed pending alert");
        Ok(())
    }

    /// Returns the issue cached for `hostname` and `service`, if any.
    /// A `None` service matches only host-level relations.
    pub fn find_relation(&self, hostname: &str, service: Option<&str>) -> Result<Option<i64>> {
        find_relation(&self.conn, hostname, service)
    }

    /// Cache `issue_id` as the issue opened for `hostname` and `service`.
    /// It's an error for a relation to already exist for that key.
    pub fn add_relation(&self, hostname: &str, service: Option<&str>, issue_id: i64) -> Result<()> {
        self.add_relation_at(hostname, service, issue_id, Utc::now())
    }

    /// Like `add_relation`, but with an explicit creation time.
    pub fn add_relation_at(
        &self,
        hostname: &str,
        service: Option<&str>,
        issue_id: i64,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let txn = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        if let Some(existing) = find_relation(&txn, hostname, service)? {
            return Err(Error::RelationExists {
                hostname: hostname.to_string(),
                service: service.map(str::to_string),
                existing,
                issue_id,
            });
        }

        txn.execute(
            "INSERT INTO issue_relations (hostname, service, issue_id, created_at)
             VALUES (?, ?, ?, ?)",
            params![hostname, service, issue_id, format_timestamp(created_at)],
        )?;
        txn.commit()?;

        tracing::debug!(%hostname, ?service, %issue_id, "cached issue relation");
        Ok(())
    }

    /// Remove the relation of `hostname` and `service`, if there is one.
    pub fn delete_relation(&self, hostname: &str, service: Option<&str>) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM issue_relations WHERE hostname = ? AND service IS ?",
            params![hostname, service],
        )?;

        tracing::debug!(%hostname, ?service, %deleted, "removed issue relation");
        Ok(())
    }

    /// Remove all relations created strictly before `cutoff`,
    /// returning the number removed.
    pub fn prune_relations_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM issue_relations WHERE created_at < ?",
            params![format_timestamp(cutoff)],
        )?;

        tracing::debug!(%cutoff, %deleted, "pruned issue relations");
        Ok(deleted)
    }

    pub fn list_relations(&self) -> Result<Vec<IssueRelation>> {
        let mut stmt = self.conn.prepare(
            "SELECT hostname, service, issue_id, created_at
             FROM issue_relations ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(hostname, service, issue_id, created_at)| {
                let parsed = match DateTime::parse_from_rfc3339(&created_at) {
                    Ok(parsed) => parsed.with_timezone(&Utc),
                    Err(err) => {
                        return Err(Error::InvalidTimestamp {
                            hostname,
                            created_at,
                            err,
                        })
                    }
                };
                Ok(IssueRelation {
                    hostname,
                    service,
                    issue_id,
                    created_at: parsed,
                })
            })
            .collect()
    }
}

fn find_relation(conn: &Connection, hostname: &str, service: Option<&str>) -> Result<Option<i64>> {
    // `IS` rather than `=`, so that a NULL service matches only a NULL service.
    let mut stmt =
        conn.prepare("SELECT issue_id FROM issue_relations WHERE hostname = ? AND service IS ?")?;
    let issues = stmt
        .query_map(params![hostname, service], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    match issues.as_slice() {
        [] => Ok(None),
        [issue_id] => Ok(Some(*issue_id)),
        _ => Err(Error::AmbiguousRelation {
            hostname: hostname.to_string(),
            service: service.map(str::to_string),
            count: issues.len(),
        }),
    }
}

// Fixed-width UTC timestamps, so that SQLite's text comparison orders them.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
