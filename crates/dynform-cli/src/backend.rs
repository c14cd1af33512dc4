use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dynform_spec::{FormBackend, TransportError};
use serde_json::{Value, json};
use tracing::debug;

/// Where saved schemas and submitted responses are written.
#[derive(Debug, Clone)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl Output {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map(Output::File).unwrap_or(Output::Stdout)
    }

    fn write_json(&self, value: &Value) -> Result<(), TransportError> {
        let pretty = serde_json::to_string_pretty(value)?;
        match self {
            Output::Stdout => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{}", pretty)?;
                stdout.flush()?;
            }
            Output::File(path) => {
                fs::write(path, format!("{}\n", pretty))?;
                debug!(path = %path.display(), "wrote output");
            }
        }
        Ok(())
    }
}

/// Backend over local files: the schema is read from disk and everything
/// sent to the backend is written to `output`.
#[derive(Debug)]
pub struct FileBackend {
    schema_path: PathBuf,
    output: Output,
}

impl FileBackend {
    pub fn new(schema_path: impl Into<PathBuf>, output: Output) -> Self {
        Self {
            schema_path: schema_path.into(),
            output,
        }
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }
}

impl FormBackend for FileBackend {
    fn fetch_schema(&mut self) -> Result<Value, TransportError> {
        let contents = fs::read_to_string(&self.schema_path)?;
        let document: Value = serde_json::from_str(&contents)?;
        if document.get("success").is_some() {
            Ok(document)
        } else {
            Ok(json!({ "success": true, "schema": document }))
        }
    }

    fn save_schema(&mut self, schema: &Value) -> Result<(), TransportError> {
        self.output.write_json(schema)
    }

    fn submit_response(&mut self, payload: &Value) -> Result<(), TransportError> {
        self.output.write_json(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bare_documents_are_wrapped_in_an_envelope() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("schema.json");
        fs::write(&path, r#"{ "sections": [] }"#).expect("write");
        let mut backend = FileBackend::new(&path, Output::Stdout);
        let envelope = backend.fetch_schema().expect("fetch");
        assert_eq!(envelope["success"], json!(true));
        assert_eq!(envelope["schema"]["sections"], json!([]));
    }

    #[test]
    fn envelopes_pass_through() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("schema.json");
        fs::write(&path, r#"{ "success": false }"#).expect("write");
        let mut backend = FileBackend::new(&path, Output::Stdout);
        assert_eq!(backend.fetch_schema().expect("fetch"), json!({ "success": false }));
    }

    #[test]
    fn submissions_land_in_the_output_file() {
        let dir = tempdir().expect("tempdir");
        let out = dir.path().join("out.json");
        let mut backend = FileBackend::new(dir.path().join("unused.json"), Output::File(out.clone()));
        backend.submit_response(&json!({ "Name": "Ada" })).expect("submit");
        let written: Value =
            serde_json::from_str(&fs::read_to_string(out).expect("read")).expect("json");
        assert_eq!(written, json!({ "Name": "Ada" }));
    }

    #[test]
    fn missing_schema_is_an_io_error() {
        let dir = tempdir().expect("tempdir");
        let mut backend = FileBackend::new(dir.path().join("missing.json"), Output::Stdout);
        assert!(matches!(backend.fetch_schema(), Err(TransportError::Io(_))));
    }
}
