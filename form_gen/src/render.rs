//! HTML rendering of the form page.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::form::{Field, FormSpec, InputKind};

/// What the page reports besides the form itself
#[derive(Debug, Clone, Default)]
pub enum Outcome {
    #[default]
    Empty,
    /// The submission produced output, downloadable through `/export`
    Ready { workspace: String },
    /// The submission ran but wrote no output
    NoOutput,
    Failed { message: String },
}

/// Generates HTML for form fields based on field descriptors
fn generate_form_fields(fields: &[Field]) -> Markup {
    html! {
        @for field in fields {
            @let id = &field.name;
            @let required_marker = if field.required { " *" } else { "" };
            @let default_val = field.default.as_deref().unwrap_or("");

            @match field.input_kind {
                InputKind::Text => {
                    div.field-group data-field-name=(id) data-multiple=(field.multiple.to_string()) {
                        label for=(id) { (field.label) (required_marker) }
                        input type="text"
                              id=(id)
                              name=(id)
                              value=(default_val)
                              placeholder=(placeholder(field))
                              required[field.required];
                        (help_text(field))
                    }
                }
                InputKind::Number => {
                    div.field-group data-field-name=(id) {
                        label for=(id) { (field.label) (required_marker) }
                        input type="number"
                              id=(id)
                              name=(id)
                              value=(default_val)
                              min="0"
                              required[field.required];
                        (help_text(field))
                    }
                }
                InputKind::Checkbox => {
                    div.field-group.checkbox-group data-field-name=(id) {
                        label for=(id) {
                            input type="checkbox" id=(id) name=(id);
                            (field.label)
                        }
                        (help_text(field))
                    }
                }
                InputKind::File => {
                    div.field-group.file-group data-field-name=(id) {
                        label for=(id) { (field.label) (required_marker) }
                        input type="file"
                              id=(id)
                              name=(id)
                              multiple[field.multiple]
                              data-limit=[field.multiple_limit];
                        (help_text(field))
                    }
                }
                InputKind::Select => {
                    div.field-group data-field-name=(id) {
                        label for=(id) { (field.label) (required_marker) }
                        select id=(id) name=(id) multiple[field.multiple] required[field.required] {
                            @if !field.required && default_val.is_empty() {
                                option value="" selected { "-- Select an option --" }
                            }
                            @for choice in &field.choices {
                                @if choice == default_val {
                                    option value=(choice) selected { (choice) }
                                } @else {
                                    option value=(choice) { (choice) }
                                }
                            }
                        }
                        (help_text(field))
                    }
                }
            }
        }
    }
}

fn placeholder(field: &Field) -> String {
    match (field.multiple, field.multiple_limit) {
        (true, Some(limit)) => format!("Up to {} values, separated by spaces", limit),
        (true, None) => "Values separated by spaces".to_string(),
        (false, _) => String::new(),
    }
}

fn help_text(field: &Field) -> Markup {
    html! {
        @if !field.help.is_empty() {
            span.help-text { (field.help) }
        }
    }
}

fn generate_outcome(outcome: &Outcome) -> Markup {
    html! {
        @match outcome {
            Outcome::Empty => {}
            Outcome::Ready { workspace } => {
                div #status.success {
                    p { "Done. Your results are ready." }
                    form method="post" action="/export" {
                        input type="hidden" name="workspace" value=(workspace);
                        button type="submit" { "Download" }
                    }
                }
            }
            Outcome::NoOutput => {
                div #status.success {
                    p { "Done. No output files were produced." }
                }
            }
            Outcome::Failed { message } => {
                div #status.error {
                    pre { (message) }
                }
            }
        }
    }
}

/// Helper function to generate CSS styles
fn generate_styles() -> Markup {
    const CSS_CONTENT: &str = include_str!("form.css");

    html! {
        style {
            (PreEscaped(CSS_CONTENT))
        }
    }
}

/// Generates the complete form page
///
/// # Example
///
/// ```
/// use clap_web_form::form::FormSpec;
/// use clap_web_form::render::{render_page, Outcome};
///
/// let spec = FormSpec {
///     title: "Merge".to_string(),
///     subtitle: String::new(),
///     fields: vec![],
///     advanced_fields: vec![],
/// };
/// let html = render_page(&spec, &Outcome::Empty);
/// assert!(html.contains("<h1>Merge</h1>"));
/// ```
pub fn render_page(spec: &FormSpec, outcome: &Outcome) -> String {
    let page = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="UTF-8";
                title { (spec.title) }
                (generate_styles())
            }
            body {
                div .container {
                    h1 { (spec.title) }
                    @if !spec.subtitle.is_empty() {
                        p .subtitle { (spec.subtitle) }
                    }

                    (generate_outcome(outcome))

                    form #webForm method="post" action="/" enctype="multipart/form-data" {
                        div .form-section {
                            (generate_form_fields(&spec.fields))
                        }

                        @if !spec.advanced_fields.is_empty() {
                            details .form-section.advanced-section {
                                summary { "Advanced options" }
                                (generate_form_fields(&spec.advanced_fields))
                            }
                        }

                        div .button-group {
                            button #runButton type="submit" { "Run" }
                            button #clearButton.clear-btn type="reset" { "Reset" }
                        }
                    }
                }
            }
        }
    };

    page.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::DeclaredType;

    fn field(name: &str, input_kind: InputKind) -> Field {
        Field {
            name: name.to_string(),
            label: name.to_string(),
            help: format!("Help for {name}"),
            input_kind,
            value_type: DeclaredType::Inferred,
            multiple: false,
            multiple_limit: None,
            default: None,
            required: false,
            choices: vec![],
        }
    }

    fn spec(fields: Vec<Field>, advanced_fields: Vec<Field>) -> FormSpec {
        FormSpec {
            title: "Test Page".to_string(),
            subtitle: "Merge translations".to_string(),
            fields,
            advanced_fields,
        }
    }

    #[test]
    fn test_generate_basic_page() {
        let html = render_page(&spec(vec![field("sheet", InputKind::Text)], vec![]), &Outcome::Empty);

        assert!(html.contains("Test Page"));
        assert!(html.contains("Merge translations"));
        assert!(html.contains(r#"enctype="multipart/form-data""#));
        assert!(html.contains(r#"name="sheet""#));
        assert!(html.contains("Help for sheet"));
        assert!(!html.contains("Advanced options"));
    }

    #[test]
    fn test_widgets() {
        let mut source = field("source", InputKind::File);
        source.multiple = true;
        let mut format = field("format", InputKind::Select);
        format.choices = vec!["xlsx".to_string(), "csv".to_string()];
        format.default = Some("csv".to_string());

        let html = render_page(
            &spec(
                vec![source, format, field("limit", InputKind::Number)],
                vec![field("carry", InputKind::Checkbox)],
            ),
            &Outcome::Empty,
        );

        assert!(html.contains(r#"type="file""#));
        assert!(html.contains(" multiple"));
        assert!(html.contains("<select"));
        assert!(html.contains(r#"<option value="csv" selected>"#));
        assert!(html.contains(r#"type="number""#));
        assert!(html.contains(r#"type="checkbox""#));
        assert!(html.contains("Advanced options"));
    }

    #[test]
    fn test_outcomes() {
        let spec = spec(vec![], vec![]);

        let ready = render_page(
            &spec,
            &Outcome::Ready {
                workspace: "2026-10-19 10.00.00-abcd1234".to_string(),
            },
        );
        assert!(ready.contains(r#"action="/export""#));
        assert!(ready.contains("2026-10-19 10.00.00-abcd1234"));

        let failed = render_page(
            &spec,
            &Outcome::Failed {
                message: "An unexpected error occurred:\n\n<boom>".to_string(),
            },
        );
        assert!(failed.contains("An unexpected error occurred"));
        assert!(failed.contains("&lt;boom&gt;"));
        assert!(!failed.contains(r#"action="/export""#));
    }
}
