use serde_json::Value;

use crate::answers::{Answer, ResponseStore};
use crate::spec::{Condition, Field, FieldId, Logic, Schema};

pub type VisibilityMap = std::collections::BTreeMap<FieldId, bool>;

/// Decides whether `field` is active given the current answers.
///
/// A condition whose reference matches no field in `all_fields` counts as
/// satisfied, so a dangling dependency never hides a field for good.
pub fn is_visible(field: &Field, responses: &ResponseStore, all_fields: &[&Field]) -> bool {
    let Some(rule) = &field.show_when else {
        return true;
    };
    let mut outcomes = rule
        .conditions()
        .iter()
        .map(|condition| condition_holds(condition, responses, all_fields));
    match rule.logic() {
        Logic::And => outcomes.all(|holds| holds),
        Logic::Or => outcomes.any(|holds| holds),
    }
}

/// Visibility of every field in `schema`.
pub fn resolve_visibility(schema: &Schema, responses: &ResponseStore) -> VisibilityMap {
    let all_fields = schema.all_fields();
    all_fields
        .iter()
        .map(|field| (field.id.clone(), is_visible(field, responses, &all_fields)))
        .collect()
}

fn resolve<'a>(reference: &str, all_fields: &[&'a Field]) -> Option<&'a Field> {
    all_fields
        .iter()
        .find(|field| field.id.as_str() == reference)
        .or_else(|| {
            all_fields
                .iter()
                .find(|field| field.key == reference || field.label == reference)
        })
        .copied()
}

fn condition_holds(condition: &Condition, responses: &ResponseStore, all_fields: &[&Field]) -> bool {
    let Some(dependency) = resolve(&condition.key, all_fields) else {
        return true;
    };
    let expected = value_to_display(&condition.equals);
    match responses.get(&dependency.id) {
        Some(Answer::Choices(values)) => values.iter().any(|value| *value == expected),
        Some(Answer::Text(text)) => *text == expected,
        Some(Answer::TextGrid(_)) | Some(Answer::BoolGrid(_)) | None => false,
    }
}

/// Renders a condition operand the way answers are stored, so `3` matches
/// the text answer `"3"`.
pub(crate) fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
