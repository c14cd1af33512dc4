use serde_json::{Map, Value, json};

use crate::{
    answers::{Answer, ResponseStore},
    spec::{Field, FieldType, Schema},
    validate::{ValidationErrors, Validator},
    visibility::is_visible,
    wizard::Wizard,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A visible required field on this step is still empty.
    NeedInput,
    /// The step would pass validation.
    Complete,
    /// The responses were accepted by the backend.
    Submitted,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
            RenderStatus::Submitted => "submitted",
        }
    }
}

/// Progress counters exposed to renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderProgress {
    pub step: usize,
    pub step_count: usize,
    pub answered: usize,
    pub total: usize,
}

/// Describes a single field for render outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderField {
    pub id: String,
    pub key: String,
    pub label: String,
    pub kind: FieldType,
    pub required: bool,
    pub visible: bool,
    pub focused: bool,
    pub options: Option<Vec<String>>,
    pub rows: Option<Vec<String>>,
    pub columns: Option<Vec<String>>,
    pub current_value: Value,
    pub error: Option<String>,
}

/// Everything a front end needs to draw one wizard step.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPayload {
    pub section_title: String,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub fields: Vec<RenderField>,
}

/// Builds the payload for the wizard's current step, including errors when
/// the wizard is showing them.
pub fn build_render_payload(wizard: &Wizard) -> RenderPayload {
    let empty = ValidationErrors::default();
    let errors = if wizard.show_errors() {
        wizard.errors()
    } else {
        &empty
    };
    let mut payload = build_step_payload(
        wizard.schema(),
        wizard.responses(),
        wizard.current_step(),
        wizard.validator(),
        errors,
    );
    if wizard.is_submitted() {
        payload.status = RenderStatus::Submitted;
    }
    if let Some(focus) = wizard.focus() {
        for field in &mut payload.fields {
            field.focused = field.id == focus.as_str();
        }
    }
    payload
}

/// Builds the payload for section `step` of `schema`. The status reflects
/// what `validator` would say about the step; `errors` are only attached to
/// fields. A step past the end renders as an empty section.
pub fn build_step_payload(
    schema: &Schema,
    responses: &ResponseStore,
    step: usize,
    validator: &Validator,
    errors: &ValidationErrors,
) -> RenderPayload {
    let all_fields = schema.all_fields();
    let Some(section) = schema.sections.get(step) else {
        return RenderPayload {
            section_title: String::new(),
            status: RenderStatus::Complete,
            progress: RenderProgress {
                step,
                step_count: schema.sections.len(),
                answered: 0,
                total: 0,
            },
            fields: Vec::new(),
        };
    };

    let fields = section
        .fields
        .iter()
        .map(|field| {
            let answer = responses
                .get(&field.id)
                .filter(|answer| answer.fits(field))
                .cloned()
                .unwrap_or_else(|| Answer::empty_for(field));
            render_field(
                field,
                &answer,
                is_visible(field, responses, &all_fields),
                errors.get(&field.id).map(|error| error.message.clone()),
            )
        })
        .collect::<Vec<_>>();

    let visible = section
        .fields
        .iter()
        .zip(&fields)
        .filter(|(_, rendered)| rendered.visible)
        .collect::<Vec<_>>();
    let answered = visible
        .iter()
        .filter(|(field, _)| responses.get(&field.id).is_some_and(is_answered))
        .count();

    let status = if validator
        .validate_section(section, responses, &all_fields)
        .is_empty()
    {
        RenderStatus::Complete
    } else {
        RenderStatus::NeedInput
    };

    RenderPayload {
        section_title: section.title.clone(),
        status,
        progress: RenderProgress {
            step,
            step_count: schema.sections.len(),
            answered,
            total: visible.len(),
        },
        fields,
    }
}

fn render_field(field: &Field, answer: &Answer, visible: bool, error: Option<String>) -> RenderField {
    let (rows, columns) = match field.kind.table_labels() {
        Some((rows, columns)) => (Some(rows.to_vec()), Some(columns.to_vec())),
        None => (None, None),
    };
    RenderField {
        id: field.id.to_string(),
        key: field.key.clone(),
        label: field.label.clone(),
        kind: field.field_type(),
        required: field.required,
        visible,
        focused: false,
        options: field.kind.options().map(<[String]>::to_vec),
        rows,
        columns,
        current_value: answer_json(answer),
        error,
    }
}

fn answer_json(answer: &Answer) -> Value {
    match answer {
        Answer::Text(text) => Value::String(text.clone()),
        Answer::Choices(values) => json!(values),
        Answer::TextGrid(grid) => json!(grid),
        Answer::BoolGrid(grid) => json!(grid),
    }
}

fn is_answered(answer: &Answer) -> bool {
    match answer {
        Answer::Text(text) => !text.trim().is_empty(),
        Answer::Choices(values) => !values.is_empty(),
        Answer::TextGrid(grid) => grid.iter().flatten().any(|cell| !cell.trim().is_empty()),
        Answer::BoolGrid(grid) => grid.iter().flatten().any(|cell| *cell),
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("key".into(), Value::String(field.key.clone()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert("type".into(), Value::String(field.kind.as_str().to_string()));
            map.insert("required".into(), Value::Bool(field.required));
            map.insert("visible".into(), Value::Bool(field.visible));
            if field.focused {
                map.insert("focused".into(), Value::Bool(true));
            }
            if let Some(options) = &field.options {
                map.insert("options".into(), json!(options));
            }
            if let Some(rows) = &field.rows {
                map.insert("rowLabels".into(), json!(rows));
            }
            if let Some(columns) = &field.columns {
                map.insert("columnLabels".into(), json!(columns));
            }
            map.insert("current_value".into(), field.current_value.clone());
            if let Some(error) = &field.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "section": payload.section_title,
        "status": payload.status.as_str(),
        "progress": {
            "step": payload.progress.step,
            "step_count": payload.progress.step_count,
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "fields": fields,
    })
}

/// Render the payload as human-friendly text. Hidden fields are skipped.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Step {}/{}: {}",
        payload.progress.step + 1,
        payload.progress.step_count,
        payload.section_title
    ));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));

    for field in payload.fields.iter().filter(|field| field.visible) {
        let marker = if field.focused { ">" } else { "-" };
        let mut entry = format!(" {} {} ({})", marker, field.label, field.kind);
        if field.required {
            entry.push_str(" [required]");
        }
        match &field.current_value {
            Value::String(text) if !text.is_empty() => entry.push_str(&format!(" = {}", text)),
            Value::Array(values) if !values.is_empty() && field.rows.is_none() => {
                let values = values.iter().map(value_to_display).collect::<Vec<_>>();
                entry.push_str(&format!(" = {}", values.join(", ")));
            }
            _ => {}
        }
        lines.push(entry);
        if let Some(options) = &field.options {
            lines.push(format!("     options: {}", options.join(", ")));
        }
        if let (Some(rows), Some(columns)) = (&field.rows, &field.columns) {
            lines.push(format!("     columns: {}", columns.join(" | ")));
            let grid = field.current_value.as_array().cloned().unwrap_or_default();
            for (index, label) in rows.iter().enumerate() {
                let cells = grid
                    .get(index)
                    .and_then(Value::as_array)
                    .map(|cells| cells.iter().map(value_to_display).collect::<Vec<_>>())
                    .unwrap_or_default();
                lines.push(format!("     {}: {}", label, cells.join(" | ")));
            }
        }
        if let Some(error) = &field.error {
            lines.push(format!("     ! {}", error));
        }
    }

    lines.join("\n")
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(true) => "[x]".to_string(),
        Value::Bool(false) => "[ ]".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_value(json!({
            "sections": [
                { "title": "Work", "fields": [
                    { "label": "Employed?", "type": "radio", "options": ["Yes", "No"], "required": true },
                    { "label": "Employer Name", "type": "text", "required": true,
                      "showWhen": { "key": "Employed?", "equals": "Yes" } },
                    { "label": "Skills", "type": "checkbox-matrix", "rowLabels": ["Rust"],
                      "columnLabels": ["Basic", "Expert"] }
                ]},
                { "title": "Done", "fields": [] }
            ]
        }))
        .expect("schema")
    }

    #[test]
    fn payload_tracks_visibility_and_progress() {
        let schema = schema();
        let fields = &schema.sections[0].fields;
        let mut store = ResponseStore::for_schema(&schema);
        let validator = Validator::default();
        let none = ValidationErrors::default();
        let payload = build_step_payload(&schema, &store, 0, &validator, &none);
        assert_eq!(payload.status, RenderStatus::NeedInput);
        assert_eq!(payload.progress.total, 2);
        assert!(!payload.fields[1].visible);

        store.set(&fields[0], "Yes").expect("set");
        let payload = build_step_payload(&schema, &store, 0, &validator, &none);
        assert_eq!(payload.progress.answered, 1);
        assert_eq!(payload.progress.total, 3);
        assert_eq!(payload.status, RenderStatus::NeedInput);

        let json = render_json_ui(&payload);
        assert_eq!(json["fields"][0]["current_value"], json!("Yes"));
        assert_eq!(json["fields"][2]["type"], json!("checkbox-matrix"));
        assert_eq!(json["fields"][2]["current_value"], json!([[false, false]]));
        assert_eq!(json["progress"]["step_count"], json!(2));
    }

    #[test]
    fn wizard_errors_are_rendered_on_the_focused_field() {
        let mut wizard = Wizard::new(schema());
        assert!(!wizard.next());
        let payload = build_render_payload(&wizard);
        assert_eq!(payload.fields[0].error.as_deref(), Some("Employed? is required"));
        assert!(payload.fields[0].focused);

        let text = render_text(&payload);
        assert!(text.starts_with("Step 1/2: Work"));
        assert!(text.contains(" > Employed? (radio) [required]"));
        assert!(text.contains("! Employed? is required"));
        assert!(!text.contains("Employer Name"));
        assert!(text.contains("     Rust: [ ] | [ ]"));
    }

    #[test]
    fn status_follows_the_configured_validator() {
        let schema = Schema::from_value(json!({
            "sections": [{ "title": "Contact", "fields": [
                { "label": "Email", "type": "email" }
            ]}]
        }))
        .expect("schema");
        let mut store = ResponseStore::for_schema(&schema);
        store
            .set(&schema.sections[0].fields[0], "not-an-address")
            .expect("set");
        let none = ValidationErrors::default();

        let lenient = build_step_payload(&schema, &store, 0, &Validator::default(), &none);
        assert_eq!(lenient.status, RenderStatus::Complete);

        let strict = Validator::new(&crate::config::EngineConfig {
            check_email_format: true,
            ..Default::default()
        })
        .expect("validator");
        let payload = build_step_payload(&schema, &store, 0, &strict, &none);
        assert_eq!(payload.status, RenderStatus::NeedInput);
        assert!(payload.fields[0].error.is_none());
    }

    #[test]
    fn step_past_the_end_is_empty() {
        let schema = schema();
        let store = ResponseStore::for_schema(&schema);
        let payload = build_step_payload(
            &schema,
            &store,
            9,
            &Validator::default(),
            &ValidationErrors::default(),
        );
        assert!(payload.fields.is_empty());
        assert_eq!(payload.status, RenderStatus::Complete);
    }
}
