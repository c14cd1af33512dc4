use dynform_spec::{FieldType, RenderField, RenderPayload, ValidationErrors};
use serde_json::Value;

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: step titles and prompts only.
    Clean,
    /// Verbose output: status, progress and hidden-field notes.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints steps, prompts and errors for the line-based wizard.
pub struct WizardPresenter {
    verbosity: Verbosity,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn show_step(&self, payload: &RenderPayload) {
        println!(
            "== Step {}/{}: {} ==",
            payload.progress.step + 1,
            payload.progress.step_count,
            payload.section_title
        );
        if self.verbosity.is_verbose() {
            println!(
                "Status: {} ({}/{} answered)",
                payload.status.as_str(),
                payload.progress.answered,
                payload.progress.total
            );
        }
        if payload.progress.total == 0 {
            println!("Nothing to answer on this step.");
        }
    }

    pub fn show_prompt(&self, field: &RenderField) {
        let mut line = field.label.clone();
        if field.required && !field.kind.is_table() {
            line.push_str(" *");
        }
        if let Some(hint) = hint(field) {
            line.push(' ');
            line.push_str(&hint);
        }
        println!("{}", line);
        if let Some(current) = describe_current(&field.current_value)
            && !field.kind.is_table()
        {
            println!("  current: {}", current);
        }
    }

    pub fn show_hidden(&self, label: &str) {
        if self.verbosity.is_verbose() {
            println!("(skipping hidden field '{}')", label);
        }
    }

    pub fn show_errors(&self, errors: &ValidationErrors) {
        eprintln!("Please fix the following before continuing:");
        for error in errors.iter() {
            eprintln!("  - {}", error.message);
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_completion(&self, to_stdout: bool) {
        if to_stdout {
            eprintln!("Done ✅");
        } else {
            println!("Done ✅");
        }
    }
}

fn hint(field: &RenderField) -> Option<String> {
    let options = field.options.as_deref().unwrap_or_default();
    match field.kind {
        FieldType::Date => Some("(YYYY-MM-DD)".to_string()),
        FieldType::Email => Some("(name@example.org)".to_string()),
        FieldType::Select | FieldType::Radio if !options.is_empty() => {
            Some(format!("({})", options.join("/")))
        }
        FieldType::Checkbox if !options.is_empty() => {
            Some(format!("(comma separated: {})", options.join(", ")))
        }
        FieldType::Multiple => field
            .columns
            .as_ref()
            .map(|columns| format!("(one line per row: {})", columns.join(" | "))),
        FieldType::CheckboxMatrix => field
            .columns
            .as_ref()
            .map(|columns| format!("(ticked columns per row: {})", columns.join(", "))),
        _ => None,
    }
}

fn describe_current(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Array(values) if !values.is_empty() => Some(
            values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}
