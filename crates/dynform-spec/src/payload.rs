//! Outbound response payloads: answers keyed by field label, tables expanded
//! to `{rows, columns, values}`.

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::answers::{Answer, ResponseStore};
use crate::spec::{Field, FieldKind, Schema};
use crate::visibility::{is_visible, value_to_display};

/// Formats the answers of every visible field for submission.
pub fn format_response(schema: &Schema, responses: &ResponseStore) -> Value {
    let all_fields = schema.all_fields();
    let mut map = Map::new();
    for field in &all_fields {
        if !is_visible(field, responses, &all_fields) {
            continue;
        }
        let answer = responses
            .get(&field.id)
            .filter(|answer| answer.fits(field))
            .cloned()
            .unwrap_or_else(|| Answer::empty_for(field));
        if map.contains_key(&field.label) {
            debug!(label = %field.label, "duplicate label, later field wins");
        }
        map.insert(field.label.clone(), answer_value(field, answer));
    }
    Value::Object(map)
}

fn answer_value(field: &Field, answer: Answer) -> Value {
    let (rows, columns) = field
        .kind
        .table_labels()
        .map(|(rows, columns)| (rows.to_vec(), columns.to_vec()))
        .unwrap_or_default();
    match answer {
        Answer::Text(text) => Value::String(text),
        Answer::Choices(values) => json!(values),
        Answer::TextGrid(values) => json!({ "rows": rows, "columns": columns, "values": values }),
        Answer::BoolGrid(values) => json!({ "rows": rows, "columns": columns, "values": values }),
    }
}

/// Rebuilds a store from a payload produced by [`format_response`].
///
/// Missing or unreadable entries fall back to the field's empty answer.
pub fn import_response(schema: &Schema, payload: &Value) -> ResponseStore {
    let mut store = ResponseStore::for_schema(schema);
    let Some(map) = payload.as_object() else {
        warn!("response payload is not an object; starting empty");
        return store;
    };
    for field in schema.all_fields() {
        let Some(value) = map.get(&field.label) else {
            continue;
        };
        match parse_answer(field, value) {
            Some(answer) => store.insert(field, answer),
            None => warn!(label = %field.label, "ignoring unreadable answer"),
        }
    }
    store
}

fn parse_answer(field: &Field, value: &Value) -> Option<Answer> {
    match &field.kind {
        FieldKind::Text
        | FieldKind::Email
        | FieldKind::Date
        | FieldKind::Select { .. }
        | FieldKind::Radio { .. } => match value {
            Value::Array(_) | Value::Object(_) => None,
            scalar => Some(Answer::Text(value_to_display(scalar))),
        },
        FieldKind::Checkbox { .. } => {
            let mut values: Vec<String> = Vec::new();
            for item in value.as_array()? {
                let text = value_to_display(item);
                if !values.contains(&text) {
                    values.push(text);
                }
            }
            Some(Answer::Choices(values))
        }
        FieldKind::Multiple(_) => {
            let rows = grid_values(value)?
                .iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(value_to_display).collect())
                })
                .collect::<Option<Vec<Vec<String>>>>()?;
            Some(Answer::TextGrid(rows))
        }
        FieldKind::CheckboxMatrix(_) => {
            let rows = grid_values(value)?
                .iter()
                .map(|row| {
                    row.as_array().map(|cells| {
                        cells
                            .iter()
                            .map(|cell| cell.as_bool().unwrap_or(false))
                            .collect()
                    })
                })
                .collect::<Option<Vec<Vec<bool>>>>()?;
            Some(Answer::BoolGrid(rows))
        }
    }
}

/// Accepts both `{rows, columns, values}` and a bare 2-D array.
fn grid_values(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(rows) => Some(rows),
        Value::Object(map) => map.get("values").and_then(Value::as_array),
        _ => None,
    }
}
