use mantis::{Issue, IssueId, NewIssue, Note, NoteId, Status, Tracker};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// A request observed by FakeTracker.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Fetch(IssueId),
    Create(NewIssue),
    Note(IssueId, Note),
}

/// FakeTracker is an in-memory Tracker which records its requests.
/// Fetching an issue it doesn't know of is a fault, as it is with Mantis.
#[derive(Debug, Default)]
pub struct FakeTracker {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    statuses: BTreeMap<IssueId, i64>,
    next_issue_id: IssueId,
    next_note_id: NoteId,
    fail_fetches: bool,
    fail_creates: bool,
    fail_notes: bool,
    requests: Vec<Request>,
}

fn fault(message: String) -> mantis::Error {
    mantis::Error::Fault {
        code: "Client".to_string(),
        message,
    }
}

impl FakeTracker {
    pub fn insert_issue(&self, issue_id: IssueId, status: i64) {
        self.inner.lock().unwrap().statuses.insert(issue_id, status);
    }

    pub fn next_issue_id(&self, issue_id: IssueId) {
        self.inner.lock().unwrap().next_issue_id = issue_id;
    }

    /// Fail fetches as an unavailable server would, rather than with a fault.
    pub fn fail_fetches(&self, fail: bool) {
        self.inner.lock().unwrap().fail_fetches = fail;
    }

    pub fn fail_creates(&self, fail: bool) {
        self.inner.lock().unwrap().fail_creates = fail;
    }

    pub fn fail_notes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_notes = fail;
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.lock().unwrap().requests.clone()
    }
}

impl Tracker for FakeTracker {
    async fn fetch_issue(&self, issue_id: IssueId) -> mantis::Result<Issue> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(Request::Fetch(issue_id));

        if inner.fail_fetches {
            return Err(mantis::Error::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "Service Unavailable".to_string(),
            });
        }

        match inner.statuses.get(&issue_id) {
            Some(status) => Ok(Issue {
                id: issue_id,
                summary: String::new(),
                status: Status {
                    id: *status,
                    name: format!("status-{status}"),
                },
            }),
            None => Err(fault(format!("Issue '{issue_id}' does not exist."))),
        }
    }

    async fn create_issue(&self, issue: &NewIssue) -> mantis::Result<IssueId> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(Request::Create(issue.clone()));

        if inner.fail_creates {
            return Err(fault("Access denied.".to_string()));
        }
        let issue_id = inner.next_issue_id;
        inner.next_issue_id += 1;
        inner.statuses.insert(issue_id, 10);

        Ok(issue_id)
    }

    async fn add_note(&self, issue_id: IssueId, note: &Note) -> mantis::Result<NoteId> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(Request::Note(issue_id, note.clone()));

        if inner.fail_notes || !inner.statuses.contains_key(&issue_id) {
            return Err(fault(format!("Issue '{issue_id}' does not exist.")));
        }
        inner.next_note_id += 1;

        Ok(inner.next_note_id)
    }
}
