use super::{Error, Issue, IssueId, NewIssue, Note, Result, Status};
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::{Reader, Writer};

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const MANTIS_NS: &str = "http://futureware.biz/mantisconnect";

pub(crate) struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

pub(crate) fn issue_get(creds: &Credentials, issue_id: IssueId) -> Result<Vec<u8>> {
    envelope("mc_issue_get", creds, |w| {
        text_element(w, "issue_id", &issue_id.to_string())
    })
}

pub(crate) fn issue_add(creds: &Credentials, issue: &NewIssue) -> Result<Vec<u8>> {
    envelope("mc_issue_add", creds, |w| {
        w.create_element("issue").write_inner_content(|w| {
            text_element(w, "summary", &issue.summary)?;
            text_element(w, "description", &issue.description)?;
            text_element(w, "category", &issue.category)?;
            w.create_element("project")
                .write_inner_content(|w| text_element(w, "id", &issue.project_id.to_string()))?;
            Ok::<(), quick_xml::Error>(())
        })?;
        Ok(())
    })
}

pub(crate) fn issue_note_add(creds: &Credentials, issue_id: IssueId, note: &Note) -> Result<Vec<u8>> {
    envelope("mc_issue_note_add", creds, |w| {
        text_element(w, "issue_id", &issue_id.to_string())?;
        w.create_element("note")
            .write_inner_content(|w| text_element(w, "text", &note.text))?;
        Ok(())
    })
}

// Wraps the arguments written by `args` into an RPC-style SOAP envelope
// invoking `operation` with leading username and password arguments.
fn envelope<F>(operation: &str, creds: &Credentials, args: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut Writer<Vec<u8>>) -> quick_xml::Result<()>,
{
    let mut w = Writer::new(Vec::new());
    let operation = format!("man:{operation}");

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.create_element("soapenv:Envelope")
        .with_attribute(("xmlns:soapenv", ENVELOPE_NS))
        .with_attribute(("xmlns:man", MANTIS_NS))
        .write_inner_content(|w| {
            w.create_element("soapenv:Body").write_inner_content(|w| {
                w.create_element(&operation).write_inner_content(|w| {
                    text_element(w, "username", creds.username)?;
                    text_element(w, "password", creds.password)?;
                    args(w)
                })?;
                Ok::<(), quick_xml::Error>(())
            })?;
            Ok::<(), quick_xml::Error>(())
        })?;

    Ok(w.into_inner())
}

fn text_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> quick_xml::Result<()> {
    w.create_element(name)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

/// Response is a decoded SOAP response body, flattened into the text content
/// of each element and the path of local element names leading to it.
/// Paths are relative to the SOAP Body: the first component is the response
/// wrapper (like `mc_issue_getResponse`) or `Fault`.
#[derive(Debug)]
pub(crate) struct Response {
    fields: Vec<(Vec<String>, String)>,
}

impl Response {
    pub fn parse(body: &str) -> Result<Self> {
        let mut reader = Reader::from_str(body);
        reader.trim_text(true);

        let mut path: Vec<String> = Vec::new();
        let mut fields = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
                Event::End(_) => {
                    path.pop();
                }
                Event::Empty(e) => {
                    path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    push_field(&mut fields, &path, String::new());
                    path.pop();
                }
                Event::Text(t) => {
                    let text = t.unescape()?.into_owned();
                    push_field(&mut fields, &path, text);
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c).into_owned();
                    push_field(&mut fields, &path, text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { fields })
    }

    /// Returns the fault carried by this response, if any.
    pub fn fault(&self) -> Option<Error> {
        let message = self.get(&["Fault", "faultstring"])?;
        let code = self.get(&["Fault", "faultcode"]).unwrap_or_default();

        Some(Error::Fault {
            code: code.to_string(),
            message: message.to_string(),
        })
    }

    /// Text of the `return` value at `rel` beneath the response wrapper.
    fn returned(&self, rel: &[&str]) -> Option<&str> {
        self.fields
            .iter()
            .find(|(path, _)| {
                path.len() == rel.len() + 2
                    && path[1] == "return"
                    && path[2..].iter().zip(rel).all(|(l, r)| l == r)
            })
            .map(|(_, text)| text.as_str())
    }

    fn get(&self, full: &[&str]) -> Option<&str> {
        self.fields
            .iter()
            .find(|(path, _)| path.len() == full.len() && path.iter().zip(full).all(|(l, r)| l == r))
            .map(|(_, text)| text.as_str())
    }

    fn returned_int(&self, rel: &[&str], field: &'static str) -> Result<i64> {
        let value = self.returned(rel).ok_or(Error::MissingField(field))?;
        value.trim().parse().map_err(|_| Error::NotAnInteger {
            field,
            value: value.to_string(),
        })
    }

    pub fn into_issue(self) -> Result<Issue> {
        Ok(Issue {
            id: self.returned_int(&["id"], "id")?,
            summary: self.returned(&["summary"]).unwrap_or_default().to_string(),
            status: Status {
                id: self.returned_int(&["status", "id"], "status.id")?,
                name: self
                    .returned(&["status", "name"])
                    .unwrap_or_default()
                    .to_string(),
            },
        })
    }

    /// Decodes a response whose return value is a bare integer.
    pub fn into_id(self) -> Result<i64> {
        self.returned_int(&[], "return")
    }
}

fn push_field(fields: &mut Vec<(Vec<String>, String)>, path: &[String], text: String) {
    // Skip Envelope and Body, and anything outside of them such as Header.
    if path.len() > 2 && path[1] == "Body" {
        fields.push((path[2..].to_vec(), text));
    }
}
