use schemars::schema_for;
use serde_json::Value;

use crate::spec::Schema;

/// JSON Schema of the persisted form schema format.
pub fn schema_document() -> Result<Value, serde_json::Error> {
    serde_json::to_value(schema_for!(Schema))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_describes_sections() {
        let document = schema_document().expect("document");
        assert_eq!(document["title"], "Schema");
        assert!(document["properties"]["sections"].is_object());
    }
}
