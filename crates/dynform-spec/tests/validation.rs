use serde_json::{Value, json};

use dynform_spec::{
    EngineConfig, ErrorCode, FieldId, ResponseStore, Schema, Validator, validate_all,
    validate_section,
};

fn schema() -> Schema {
    let value: Value =
        serde_json::from_str(include_str!("../tests/fixtures/alumni_survey.json")).expect("json");
    Schema::from_value(value).expect("schema")
}

fn id(schema: &Schema, key: &str) -> FieldId {
    schema
        .all_fields()
        .into_iter()
        .find(|field| field.key == key)
        .map(|field| field.id.clone())
        .expect("field")
}

#[test]
fn hidden_required_fields_never_error() {
    let schema = schema();
    let mut store = ResponseStore::for_schema(&schema);
    let employed = schema.field(&id(&schema, "employed")).expect("field");
    store.set(employed, "No").expect("set");

    let errors = validate_section(&schema.sections[1], &store, &schema.all_fields());
    assert!(errors.is_empty());

    store.set(employed, "Yes").expect("set");
    let errors = validate_section(&schema.sections[1], &store, &schema.all_fields());
    assert_eq!(errors.len(), 1);
    assert!(errors.get(&id(&schema, "employer")).is_some());
    assert!(errors.get(&id(&schema, "history")).is_none());
}

#[test]
fn validate_all_reports_in_schema_order() {
    let schema = schema();
    let store = ResponseStore::for_schema(&schema);
    let errors = validate_all(&schema, &store, &schema.all_fields());
    let labels = errors.iter().map(|error| error.label.as_str()).collect::<Vec<_>>();
    assert_eq!(labels, vec!["Full Name", "Email", "Employed?", "Tools"]);
}

#[test]
fn custom_messages_and_email_check() {
    let schema = schema();
    let config = EngineConfig::from_json(
        &json!({
            "check_email_format": true,
            "messages": { "required": "Please answer \"{{label}}\"" }
        })
        .to_string(),
    )
    .expect("config");
    let validator = Validator::new(&config).expect("validator");

    let mut store = ResponseStore::for_schema(&schema);
    let email = schema.field(&id(&schema, "email")).expect("field");
    store.set(email, "alumni at example dot org").expect("set");

    let errors = validator.validate_section(&schema.sections[0], &store, &schema.all_fields());
    let full_name = errors.get(&id(&schema, "full_name")).expect("error");
    assert_eq!(full_name.message, "Please answer \"Full Name\"");
    let email_error = errors.get(&email.id).expect("error");
    assert_eq!(email_error.code, ErrorCode::InvalidEmail);
    assert_eq!(email_error.message, "Email must be a valid email address");
}
