//! Authoring operations over the schema.
//!
//! Every function takes the current value by reference and returns the next
//! one; inputs are never mutated, so callers can keep old versions for undo.

use crate::config::SectionPlacement;
use crate::spec::{Field, FieldKind, FieldType, Schema, Section, ShowWhen};
use crate::table;

/// Adds an empty section at the end.
pub fn add_section(schema: &Schema) -> Schema {
    add_section_at(schema, SectionPlacement::Append)
}

/// Adds an empty section titled after the current count. Existing sections
/// keep their titles.
pub fn add_section_at(schema: &Schema, placement: SectionPlacement) -> Schema {
    let mut next = schema.clone();
    let section = Section::new(format!("Section {}", schema.sections.len() + 1));
    match placement {
        SectionPlacement::Append => next.sections.push(section),
        SectionPlacement::Prepend => next.sections.insert(0, section),
    }
    next
}

/// Removes the section at `index`; out of range is a no-op.
pub fn remove_section(schema: &Schema, index: usize) -> Schema {
    let mut next = schema.clone();
    if index < next.sections.len() {
        next.sections.remove(index);
    }
    next
}

pub fn rename_section(schema: &Schema, index: usize, title: &str) -> Schema {
    update_section(schema, index, |section| Section {
        title: title.to_string(),
        fields: section.fields.clone(),
    })
}

/// Replaces the section at `index` with `edit(section)`.
pub fn update_section(
    schema: &Schema,
    index: usize,
    edit: impl FnOnce(&Section) -> Section,
) -> Schema {
    let mut next = schema.clone();
    if let Some(section) = next.sections.get_mut(index) {
        *section = edit(section);
    }
    next
}

/// Replaces the field at `index` with `edit(field)`.
pub fn update_field(section: &Section, index: usize, edit: impl FnOnce(&Field) -> Field) -> Section {
    let mut next = section.clone();
    if let Some(field) = next.fields.get_mut(index) {
        let id = field.id.clone();
        *field = edit(field);
        field.id = id;
    }
    next
}

/// Appends a `text` field keyed after the section title and field count.
pub fn add_field(section: &Section) -> Section {
    let mut next = section.clone();
    let number = section.fields.len() + 1;
    let key = format!("{}_{}", slug(&section.title), number);
    next.fields
        .push(Field::new(key, format!("Question {}", number), FieldKind::Text));
    next
}

pub fn remove_field(section: &Section, index: usize) -> Section {
    let mut next = section.clone();
    if index < next.fields.len() {
        next.fields.remove(index);
    }
    next
}

/// Swaps the field at `index` with its predecessor.
pub fn move_field_up(section: &Section, index: usize) -> Section {
    let mut next = section.clone();
    if index > 0 && index < next.fields.len() {
        next.fields.swap(index - 1, index);
    }
    next
}

/// Swaps the field at `index` with its successor.
pub fn move_field_down(section: &Section, index: usize) -> Section {
    let mut next = section.clone();
    if index + 1 < next.fields.len() {
        next.fields.swap(index, index + 1);
    }
    next
}

pub fn set_label(field: &Field, label: &str) -> Field {
    Field {
        label: label.to_string(),
        ..field.clone()
    }
}

pub fn set_key(field: &Field, key: &str) -> Field {
    Field {
        key: key.to_string(),
        ..field.clone()
    }
}

pub fn set_required(field: &Field, required: bool) -> Field {
    Field {
        required,
        ..field.clone()
    }
}

pub fn set_show_when(field: &Field, rule: Option<ShowWhen>) -> Field {
    Field {
        show_when: rule,
        ..field.clone()
    }
}

/// Switches the field type, carrying options and table labels across where
/// both types have them.
pub fn set_field_type(field: &Field, field_type: FieldType) -> Field {
    let mut kind = field.kind.convert(field_type);
    match &mut kind {
        FieldKind::Multiple(grid) => table::repair(grid),
        FieldKind::CheckboxMatrix(grid) => table::repair(grid),
        _ => {}
    }
    Field {
        kind,
        ..field.clone()
    }
}

/// Appends `"Option N"` with N = current option count + 1.
///
/// Deleting and re-adding can repeat a default label; labels are editable.
pub fn add_option(field: &Field) -> Field {
    let mut next = field.clone();
    if let Some(options) = next.kind.options_mut() {
        let label = format!("Option {}", options.len() + 1);
        options.push(label);
    }
    next
}

pub fn set_option(field: &Field, index: usize, text: &str) -> Field {
    let mut next = field.clone();
    if let Some(option) = next
        .kind
        .options_mut()
        .and_then(|options| options.get_mut(index))
    {
        *option = text.to_string();
    }
    next
}

pub fn remove_option(field: &Field, index: usize) -> Field {
    let mut next = field.clone();
    if let Some(options) = next.kind.options_mut()
        && index < options.len()
    {
        options.remove(index);
    }
    next
}

/// Runs the cleanup pass over every field, then rebinds conditions.
/// Call right before persisting, never while editing.
pub fn clean_schema(schema: &Schema) -> Schema {
    let sections = schema
        .sections
        .iter()
        .map(|section| Section {
            title: section.title.clone(),
            fields: section.fields.iter().map(table::clean_table_data).collect(),
        })
        .collect();
    Schema { sections }.normalized()
}

fn slug(title: &str) -> String {
    let words = title
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|ch| ch.is_alphanumeric() || *ch == '_' || *ch == '-')
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>();
    if words.is_empty() {
        "field".into()
    } else {
        words.join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Condition, Table};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn add_section_numbers_from_current_count() {
        let schema = add_section(&add_section(&Schema::default()));
        assert_eq!(schema.sections[0].title, "Section 1");
        assert_eq!(schema.sections[1].title, "Section 2");

        let trimmed = remove_section(&schema, 0);
        let again = add_section(&trimmed);
        let titles = again
            .sections
            .iter()
            .map(|section| section.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Section 2", "Section 2"]);
    }

    #[test]
    fn prepend_places_new_section_first() {
        let schema = add_section(&Schema::default());
        let schema = add_section_at(&schema, SectionPlacement::Prepend);
        assert_eq!(schema.sections[0].title, "Section 2");
        assert_eq!(schema.sections[1].title, "Section 1");
    }

    #[test]
    fn remove_section_out_of_range_is_noop() {
        let schema = add_section(&Schema::default());
        assert_eq!(remove_section(&schema, 5), schema);
    }

    #[test]
    fn add_field_derives_key_and_unique_ids() {
        let section = Section::new("Work History");
        let section = add_field(&add_field(&section));
        assert_eq!(section.fields[0].key, "work_history_1");
        assert_eq!(section.fields[1].key, "work_history_2");
        assert_eq!(section.fields[1].kind, FieldKind::Text);
        assert_ne!(section.fields[0].id, section.fields[1].id);
        assert!(!section.fields[0].id.is_unset());
    }

    #[test]
    fn move_field_reorders_within_bounds() {
        let section = add_field(&add_field(&Section::new("S")));
        let moved = move_field_down(&section, 0);
        assert_eq!(moved.fields[0].key, "s_2");
        assert_eq!(move_field_up(&moved, 0), moved);
    }

    #[test]
    fn add_option_numbering_is_local_to_the_call() {
        let field = set_field_type(&Field::new("c", "Pick", FieldKind::Text), FieldType::Select);
        let field = add_option(&add_option(&field));
        let field = remove_option(&field, 0);
        let field = add_option(&field);
        assert_eq!(
            field.kind.options(),
            Some(&["Option 2".to_string(), "Option 2".to_string()][..])
        );
    }

    #[test]
    fn update_field_keeps_the_stable_id() {
        let section = add_field(&Section::new("S"));
        let id = section.fields[0].id.clone();
        let edited = update_field(&section, 0, |field| {
            let mut replacement = Field::new("other", "Renamed", FieldKind::Date);
            replacement.required = field.required;
            replacement
        });
        assert_eq!(edited.fields[0].id, id);
        assert_eq!(edited.fields[0].label, "Renamed");
    }

    #[test]
    fn switching_type_squares_the_table() {
        let field = Field::new(
            "m",
            "Matrix",
            FieldKind::CheckboxMatrix(Table {
                row_labels: vec!["a".into(), "b".into()],
                column_labels: vec!["x".into()],
                table_data: vec![vec![true], vec![false]],
            }),
        );
        let converted = set_field_type(&field, FieldType::Multiple);
        match converted.kind {
            FieldKind::Multiple(grid) => {
                assert_eq!(grid.row_labels, vec!["a", "b"]);
                assert_eq!(grid.table_data, vec![vec![""], vec![""]]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn clean_schema_round_trips_through_json() {
        let schema = Schema::from_value(json!({
            "sections": [
                { "title": "Second", "fields": [
                    { "label": "Grid", "type": "multiple",
                      "rowLabels": ["2020", ""], "columnLabels": ["Company", ""],
                      "tableData": [["Acme", ""], ["", ""]] },
                    { "label": "Pick", "type": "radio", "options": ["Yes", "", "No"] },
                    { "label": "Why", "type": "text", "showWhen": { "key": "Pick", "equals": "Yes" } }
                ]},
                { "title": "First", "fields": [] }
            ]
        }))
        .expect("schema");
        let cleaned = clean_schema(&schema);
        let persisted = serde_json::to_value(&cleaned).expect("json");
        let reloaded = Schema::from_value(persisted).expect("reload");
        assert_eq!(reloaded, cleaned);
        assert_eq!(reloaded.sections[0].title, "Second");
        assert_eq!(
            reloaded.sections[0].fields[1].kind.options(),
            Some(&["Yes".to_string(), "No".to_string()][..])
        );
        assert_eq!(clean_schema(&cleaned), cleaned);
    }

    #[test]
    fn set_show_when_accepts_field_ids() {
        let section = add_field(&add_field(&Section::new("S")));
        let target = section.fields[0].id.clone();
        let rule = ShowWhen::Single(Condition::new(target.as_str(), "yes"));
        let field = set_show_when(&section.fields[1], Some(rule.clone()));
        assert_eq!(field.show_when, Some(rule));
    }
}
