/// Key of Nagios host notes which overrides the Mantis project of the host's issues.
pub const PROJECT_ID_KEY: &str = "mantis_project_id";

/// Extracts the Mantis project ID from Nagios host notes, which may be a
/// YAML document like `mantis_project_id: 12`. Returns None if the notes are
/// blank, are not YAML, or don't carry a positive integer project ID.
pub fn project_id(host_notes: Option<&str>) -> Option<i64> {
    let notes = host_notes?;
    if notes.trim().is_empty() {
        return None;
    }

    let doc: serde_yaml::Value = match serde_yaml::from_str(notes) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(error = %err, %notes, "host notes are not YAML, using the default project");
            return None;
        }
    };

    let project_id = match doc.get(PROJECT_ID_KEY)? {
        serde_yaml::Value::Number(n) => n.as_i64(),
        serde_yaml::Value::String(s) => s.trim().parse().ok(),
        other => {
            tracing::warn!(value = ?other, "host notes have an invalid {PROJECT_ID_KEY}");
            None
        }
    };
    // Mantis project IDs are positive.
    project_id.filter(|id| *id > 0)
}
