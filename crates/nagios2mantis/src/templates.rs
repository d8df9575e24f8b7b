use anyhow::Context;
use spool::AlertState;

const ISSUE_DESCRIPTION: &str = "issue_description";
const NOTE_DESCRIPTION: &str = "note_description";

/// Templates renders the text of opened issues and added notes.
///
/// Templates are handlebars, and may use placeholders `{{plugin_output}}`
/// and `{{state}}`. Rendered text is not HTML-escaped, and a template using
/// any other placeholder is rejected when it's built.
#[derive(Debug)]
pub struct Templates {
    registry: handlebars::Handlebars<'static>,
}

#[derive(serde::Serialize)]
struct Arguments<'a> {
    state: &'a str,
    plugin_output: &'a str,
}

impl Templates {
    pub fn new(issue_description: &str, note_description: &str) -> anyhow::Result<Self> {
        let mut registry = handlebars::Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .register_template_string(ISSUE_DESCRIPTION, issue_description)
            .context("registering issue_description template")?;
        registry
            .register_template_string(NOTE_DESCRIPTION, note_description)
            .context("registering note_description template")?;

        let templates = Self { registry };

        // Strict mode catches unknown placeholders only while rendering.
        templates.issue_description(AlertState::Down, "")?;
        templates.note_description(AlertState::Down, "")?;

        Ok(templates)
    }

    pub fn issue_description(&self, state: AlertState, plugin_output: &str) -> anyhow::Result<String> {
        self.render(ISSUE_DESCRIPTION, state, plugin_output)
    }

    pub fn note_description(&self, state: AlertState, plugin_output: &str) -> anyhow::Result<String> {
        self.render(NOTE_DESCRIPTION, state, plugin_output)
    }

    fn render(&self, name: &str, state: AlertState, plugin_output: &str) -> anyhow::Result<String> {
        let args = Arguments {
            state: state.as_str(),
            plugin_output,
        };
        self.registry
            .render(name, &args)
            .with_context(|| format!("rendering {name} template"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render() {
        let templates = Templates::new(
            "Nagios reports:\n{{plugin_output}}",
            "Now {{state}}: {{plugin_output}}",
        )
        .unwrap();

        insta::assert_snapshot!(
            templates.issue_description(AlertState::Critical, "DISK CRITICAL - /var < 5% & falling").unwrap(),
            @r###"
        Nagios reports:
        DISK CRITICAL - /var < 5% & falling
        "###
        );
        insta::assert_snapshot!(
            templates.note_description(AlertState::Up, "PING OK - rta=0.1ms").unwrap(),
            @"Now UP: PING OK - rta=0.1ms"
        );
    }

    #[test]
    fn test_invalid_templates_are_rejected() {
        let err = Templates::new("{{#if}}", "{{state}}").unwrap_err();
        assert_eq!(err.to_string(), "registering issue_description template");

        let err = Templates::new("{{plugin_output}}", "{{hostname}} is {{state}}").unwrap_err();
        assert_eq!(err.to_string(), "rendering note_description template");
    }
}
