use super::soap::{self, Credentials, Response};
use super::{Error, Issue, IssueId, NewIssue, Note, NoteId, Result, Tracker};
use std::time::Duration;

/// Client of a Mantis Connect SOAP endpoint, such as
/// `https://mantis.example.com/api/soap/mantisconnect.php`.
#[derive(Clone)]
pub struct Client {
    endpoint: url::Url,
    username: String,
    password: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a Client which authenticates as `username`, and bounds each
    /// call to the endpoint by `timeout`.
    pub fn new(
        endpoint: url::Url,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            username: username.into(),
            password: password.into(),
            http_client,
        })
    }

    fn credentials(&self) -> Credentials<'_> {
        Credentials {
            username: &self.username,
            password: &self.password,
        }
    }

    async fn call(&self, operation: &'static str, envelope: Vec<u8>) -> Result<Response> {
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("{}/{operation}", self.endpoint))
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::trace!(%operation, %status, %body, "Mantis response");

        // Faults are typically delivered with a 500 status,
        // so look for one before considering the status code.
        match Response::parse(&body) {
            Ok(decoded) => match decoded.fault() {
                Some(fault) => Err(fault),
                None if !status.is_success() => Err(Error::Status { status, body }),
                None => Ok(decoded),
            },
            Err(_) if !status.is_success() => Err(Error::Status { status, body }),
            Err(err) => Err(err),
        }
    }
}

impl Tracker for Client {
    async fn fetch_issue(&self, issue_id: IssueId) -> Result<Issue> {
        let envelope = soap::issue_get(&self.credentials(), issue_id)?;
        let issue = self.call("mc_issue_get", envelope).await?.into_issue()?;

        tracing::debug!(%issue_id, status = %issue.status.id, "fetched Mantis issue");
        Ok(issue)
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueId> {
        let envelope = soap::issue_add(&self.credentials(), issue)?;
        let issue_id = self.call("mc_issue_add", envelope).await?.into_id()?;

        tracing::debug!(%issue_id, summary = %issue.summary, "opened Mantis issue");
        Ok(issue_id)
    }

    async fn add_note(&self, issue_id: IssueId, note: &Note) -> Result<NoteId> {
        let envelope = soap::issue_note_add(&self.credentials(), issue_id, note)?;
        let note_id = self.call("mc_issue_note_add", envelope).await?.into_id()?;

        tracing::debug!(%issue_id, %note_id, "added note to Mantis issue");
        Ok(note_id)
    }
}
