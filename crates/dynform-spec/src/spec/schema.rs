use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::spec::field::{Field, FieldId, FieldKind};
use crate::table;

/// Ordered group of fields rendered as one wizard step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_fields")]
    #[schemars(with = "Vec<Field>")]
    pub fields: Vec<Field>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }
}

/// Top-level form definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Schema {
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Schema {
    /// Parses a schema document and normalizes it.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let schema: Schema = serde_json::from_value(value)?;
        Ok(schema.normalized())
    }

    /// Every field across all sections, in display order.
    pub fn all_fields(&self) -> Vec<&Field> {
        self.sections
            .iter()
            .flat_map(|section| section.fields.iter())
            .collect()
    }

    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.sections
            .iter()
            .flat_map(|section| section.fields.iter())
            .find(|field| &field.id == id)
    }

    /// Index of the section that holds `id`.
    pub fn section_of(&self, id: &FieldId) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.fields.iter().any(|field| &field.id == id))
    }

    /// Assigns missing or duplicate ids, squares table grids and binds
    /// `showWhen` references to field ids.
    pub fn normalized(&self) -> Schema {
        let mut schema = self.clone();
        let mut seen = HashSet::new();
        for (index, section) in schema.sections.iter_mut().enumerate() {
            for field in &mut section.fields {
                if !field.id.is_unset() && seen.contains(&field.id) {
                    warn!(id = %field.id, label = %field.label, "duplicate field id replaced");
                    field.id = FieldId::default();
                }
                if field.id.is_unset() {
                    field.id = (0..)
                        .map(|ordinal| FieldId::derive(index, &field.key, &field.label, ordinal))
                        .find(|id| !seen.contains(id))
                        .unwrap_or_else(FieldId::generate);
                }
                seen.insert(field.id.clone());
            }
        }
        for field in schema
            .sections
            .iter_mut()
            .flat_map(|section| section.fields.iter_mut())
        {
            match &mut field.kind {
                FieldKind::Multiple(grid) => table::repair(grid),
                FieldKind::CheckboxMatrix(grid) => table::repair(grid),
                _ => {}
            }
        }
        schema.bind_conditions()
    }

    /// Rewrites condition references that name a field key or label into
    /// that field's id. Unresolvable references are left untouched.
    pub fn bind_conditions(&self) -> Schema {
        let targets = self
            .all_fields()
            .into_iter()
            .map(|field| {
                (
                    field.id.clone(),
                    field.key.clone(),
                    field.label.clone(),
                )
            })
            .collect::<Vec<_>>();
        let resolve = |reference: &str| -> Option<FieldId> {
            targets
                .iter()
                .find(|(id, _, _)| id.as_str() == reference)
                .or_else(|| {
                    targets
                        .iter()
                        .find(|(_, key, label)| key == reference || label == reference)
                })
                .map(|(id, _, _)| id.clone())
        };

        let mut schema = self.clone();
        for field in schema
            .sections
            .iter_mut()
            .flat_map(|section| section.fields.iter_mut())
        {
            if let Some(rule) = &mut field.show_when {
                for condition in rule.conditions_mut() {
                    if let Some(id) = resolve(&condition.key) {
                        condition.key = id.to_string();
                    }
                }
            }
        }
        schema
    }
}

fn lenient_fields<'de, D>(deserializer: D) -> Result<Vec<Field>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let fields = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let value = match value {
                Value::Object(mut map) => {
                    if !map.contains_key("type") {
                        map.insert("type".into(), Value::String("text".into()));
                    }
                    Value::Object(map)
                }
                other => other,
            };
            match serde_json::from_value::<Field>(value) {
                Ok(field) => Some(field),
                Err(err) => {
                    warn!(index, error = %err, "dropping malformed field");
                    None
                }
            }
        })
        .collect();
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_arrays_default_to_empty() {
        let schema: Schema = serde_json::from_value(json!({})).expect("schema");
        assert!(schema.sections.is_empty());

        let schema: Schema =
            serde_json::from_value(json!({ "sections": [{ "title": "Intro" }] })).expect("schema");
        assert_eq!(schema.sections[0].title, "Intro");
        assert!(schema.sections[0].fields.is_empty());
    }

    #[test]
    fn malformed_fields_are_dropped_and_untyped_default_to_text() {
        let schema: Schema = serde_json::from_value(json!({
            "sections": [{
                "title": "S",
                "fields": [
                    { "label": "Name" },
                    { "label": "Bad", "type": "slider" },
                    42
                ]
            }]
        }))
        .expect("schema");
        let fields = &schema.sections[0].fields;
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].kind, FieldKind::Text);
    }

    #[test]
    fn normalization_assigns_ids_and_binds_conditions() {
        let schema = Schema::from_value(json!({
            "sections": [{
                "title": "Work",
                "fields": [
                    { "key": "employed", "label": "Employed?", "type": "radio", "options": ["Yes", "No"] },
                    { "key": "employer", "label": "Employer", "type": "text",
                      "showWhen": { "key": "Employed?", "equals": "Yes" } },
                    { "key": "ghost", "label": "Ghost", "type": "text",
                      "showWhen": { "key": "missing", "equals": "Yes" } }
                ]
            }]
        }))
        .expect("schema");
        let fields = &schema.sections[0].fields;
        assert!(fields.iter().all(|field| !field.id.is_unset()));
        let bound = fields[1].show_when.as_ref().expect("rule").conditions()[0]
            .key
            .clone();
        assert_eq!(bound, fields[0].id.to_string());
        let dangling = fields[2].show_when.as_ref().expect("rule").conditions()[0]
            .key
            .clone();
        assert_eq!(dangling, "missing");
    }

    #[test]
    fn normalization_keeps_existing_ids() {
        let schema = Schema::from_value(json!({
            "sections": [{ "title": "S", "fields": [{ "id": "f-1", "label": "A", "type": "date" }] }]
        }))
        .expect("schema");
        assert_eq!(schema.sections[0].fields[0].id.as_str(), "f-1");
        assert_eq!(schema.section_of(&"f-1".into()), Some(0));
    }

    #[test]
    fn loading_the_same_document_twice_yields_the_same_ids() {
        let document = json!({
            "sections": [{ "title": "S", "fields": [
                { "label": "Name", "type": "text" },
                { "label": "Name", "type": "text" }
            ]}]
        });
        let first = Schema::from_value(document.clone()).expect("schema");
        let second = Schema::from_value(document).expect("schema");
        let ids = |schema: &Schema| {
            schema
                .all_fields()
                .into_iter()
                .map(|field| field.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
        assert_ne!(ids(&first)[0], ids(&first)[1]);
    }

    #[test]
    fn duplicate_ids_are_replaced() {
        let schema = Schema::from_value(json!({
            "sections": [{ "title": "S", "fields": [
                { "id": "f-1", "label": "A", "type": "text" },
                { "id": "f-1", "label": "B", "type": "text" }
            ]}]
        }))
        .expect("schema");
        let fields = &schema.sections[0].fields;
        assert_eq!(fields[0].id.as_str(), "f-1");
        assert_ne!(fields[1].id.as_str(), "f-1");
        assert!(!fields[1].id.is_unset());
        assert_eq!(schema.normalized(), schema);
    }
}
