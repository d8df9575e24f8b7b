use crate::{summary, Templates};
use anyhow::Context;
use mantis::{Issue, IssueId, NewIssue, Note, Tracker};
use spool::{PendingAlert, Store};

/// Outcome of reconciling one pending alert with the tracker.
#[derive(Debug)]
pub enum Outcome {
    /// A new issue was opened, and the alert was removed from the spool.
    Created(IssueId),
    /// A note was added to an open issue, and the alert was removed from the spool.
    Noted(IssueId),
    /// The entity recovered without an open issue. The alert was dropped.
    Discarded,
    /// The tracker call failed. The alert remains spooled for the next drain.
    Retained(mantis::Error),
}

/// Counts of outcomes of a drain.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainStats {
    pub created: usize,
    pub noted: usize,
    pub discarded: usize,
    pub retained: usize,
    /// Alerts which failed with an error other than a tracker failure.
    pub failed: usize,
}

/// Reconciler turns spooled alerts into tracker issues and notes.
pub struct Reconciler<'a, T> {
    store: &'a Store,
    tracker: &'a T,
    templates: &'a Templates,
    category: &'a str,
}

impl<'a, T: Tracker> Reconciler<'a, T> {
    pub fn new(
        store: &'a Store,
        tracker: &'a T,
        templates: &'a Templates,
        category: &'a str,
    ) -> Self {
        Self {
            store,
            tracker,
            templates,
            category,
        }
    }

    /// Reconcile each currently pending alert, in spool order.
    /// A failure to reconcile one alert is logged and doesn't stop the drain.
    pub async fn drain(&self) -> anyhow::Result<DrainStats> {
        let pending = self
            .store
            .list_pending()
            .context("failed to list pending alerts")?;

        let mut stats = DrainStats::default();

        for alert in pending {
            match self.reconcile(&alert).await {
                Ok(Outcome::Created(_)) => stats.created += 1,
                Ok(Outcome::Noted(_)) => stats.noted += 1,
                Ok(Outcome::Discarded) => stats.discarded += 1,
                Ok(Outcome::Retained(err)) => {
                    tracing::warn!(
                        row_id = alert.id,
                        hostname = %alert.hostname,
                        service = ?alert.service,
                        error = %err,
                        "Mantis call failed, alert remains spooled"
                    );
                    stats.retained += 1;
                }
                Err(err) => {
                    tracing::error!(row_id = alert.id, error = ?err, "failed to reconcile alert");
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Reconcile a single pending alert.
    pub async fn reconcile(&self, alert: &PendingAlert) -> anyhow::Result<Outcome> {
        let PendingAlert {
            id,
            hostname,
            state,
            service,
            plugin_output,
            project_id,
        } = alert;
        let service = service.as_deref();
        let summary = summary(hostname, *state, service);

        let open_issue = match self.open_issue(hostname, service).await? {
            Ok(open_issue) => open_issue,
            Err(err) => return Ok(Outcome::Retained(err)),
        };

        let outcome = match open_issue {
            None if state.is_recovery() => {
                tracing::debug!(row_id = id, %summary, "recovered without an open issue");
                Outcome::Discarded
            }
            None => {
                let issue = NewIssue {
                    description: self.templates.issue_description(*state, plugin_output)?,
                    summary,
                    category: self.category.to_string(),
                    project_id: *project_id,
                };
                tracing::info!(row_id = id, summary = %issue.summary, %project_id, "opening issue");

                match self.tracker.create_issue(&issue).await {
                    Ok(issue_id) => {
                        self.store.add_relation(hostname, service, issue_id)?;
                        Outcome::Created(issue_id)
                    }
                    Err(err) => return Ok(Outcome::Retained(err)),
                }
            }
            Some(issue) => {
                let note = Note {
                    text: self.templates.note_description(*state, plugin_output)?,
                };
                tracing::info!(row_id = id, %summary, issue_id = issue.id, "adding note to issue");

                match self.tracker.add_note(issue.id, &note).await {
                    Ok(_note_id) => Outcome::Noted(issue.id),
                    Err(err) => return Ok(Outcome::Retained(err)),
                }
            }
        };

        self.store.delete_pending(*id)?;
        Ok(outcome)
    }

    // Returns the issue cached for the host or service, if it's still open.
    // Relations of issues which are resolved, closed, or which Mantis reports
    // as faulted are forgotten. Other fetch failures leave the relation in
    // place and are returned for the alert to be retained.
    async fn open_issue(
        &self,
        hostname: &str,
        service: Option<&str>,
    ) -> anyhow::Result<Result<Option<Issue>, mantis::Error>> {
        let Some(issue_id) = self.store.find_relation(hostname, service)? else {
            return Ok(Ok(None));
        };

        match self.tracker.fetch_issue(issue_id).await {
            Ok(issue) if !issue.is_closed() => return Ok(Ok(Some(issue))),
            Ok(issue) => {
                tracing::info!(%issue_id, status = %issue.status.name, "cached issue is no longer open");
            }
            Err(err) if err.is_fault() => {
                tracing::warn!(%issue_id, error = %err, "Mantis faulted fetching cached issue");
            }
            Err(err) => return Ok(Err(err)),
        }
        self.store.delete_relation(hostname, service)?;

        Ok(Ok(None))
    }
}
