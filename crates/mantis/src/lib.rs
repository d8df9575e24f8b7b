//! A minimal client of the Mantis bug tracker's SOAP API (Mantis Connect),
//! covering the three operations needed to relay monitoring alerts:
//! fetching an issue, opening an issue, and adding a note to an issue.
use std::future::Future;

mod client;
mod soap;

pub use client::Client;

pub type IssueId = i64;
pub type NoteId = i64;

/// Status code of an issue which a developer has resolved.
pub const STATUS_RESOLVED: i64 = 80;
/// Status code of an issue which has been closed.
pub const STATUS_CLOSED: i64 = 90;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Mantis returned fault {code:?}: {message}")]
    Fault { code: String, message: String },
    #[error("failed to call Mantis")]
    Http(#[from] reqwest::Error),
    #[error("Mantis responded with {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to encode or decode a Mantis SOAP message")]
    Xml(#[from] quick_xml::Error),
    #[error("Mantis response is missing field {0:?}")]
    MissingField(&'static str),
    #[error("Mantis response field {field:?} is not an integer: {value:?}")]
    NotAnInteger {
        field: &'static str,
        value: String,
    },
}

impl Error {
    /// Is this a fault raised by the Mantis server, as opposed to a
    /// transport or decoding failure?
    pub fn is_fault(&self) -> bool {
        matches!(self, Error::Fault { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub id: i64,
    pub name: String,
}

/// Issue as returned by `mc_issue_get`. Only fields we act upon are decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: IssueId,
    pub summary: String,
    pub status: Status,
}

impl Issue {
    /// Resolved and closed issues no longer track an ongoing problem.
    pub fn is_closed(&self) -> bool {
        matches!(self.status.id, STATUS_RESOLVED | STATUS_CLOSED)
    }
}

/// Issue to be opened with `mc_issue_add`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub summary: String,
    pub description: String,
    pub category: String,
    pub project_id: i64,
}

/// Note to be added to an issue with `mc_issue_note_add`.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub text: String,
}

/// Tracker is the set of issue-tracker operations used to relay alerts.
/// `Client` implements it against a live Mantis; tests substitute fakes.
pub trait Tracker {
    fn fetch_issue(&self, issue_id: IssueId) -> impl Future<Output = Result<Issue>> + Send;

    fn create_issue(&self, issue: &NewIssue) -> impl Future<Output = Result<IssueId>> + Send;

    fn add_note(&self, issue_id: IssueId, note: &Note)
        -> impl Future<Output = Result<NoteId>> + Send;
}
