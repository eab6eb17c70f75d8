//! Loading and saving form values as JSON
//!
//! The command line reads a form's values from a flat JSON object such as
//! `{"school_year_id": 3, "start_date": "2024-09-01"}`. Integers become
//! selections, `YYYY-MM-DD` strings become dates, and `{name, size, mime}`
//! objects become picked files.

use crate::values::FormValues;
use campus_core::{ConsoleError, ConsoleResult};
use serde_json::Value;
use std::path::Path;

// ============================================================================
// Load Functions
// ============================================================================

/// Load form values from a JSON file
pub fn load_form_values(path: impl AsRef<Path>) -> ConsoleResult<FormValues> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| ConsoleError::FileRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    form_values_from_str(&json).map_err(|e| match e {
        ConsoleError::Decode(message) => ConsoleError::FileRead {
            path: path.to_path_buf(),
            message: format!("Invalid form values: {message}"),
        },
        other => other,
    })
}

/// Parse form values from a JSON string
pub fn form_values_from_str(json: &str) -> ConsoleResult<FormValues> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(object) => Ok(FormValues::from_json_object(&object)),
        other => Err(ConsoleError::Decode(format!(
            "expected a JSON object of field values, found {}",
            kind_of(&other)
        ))),
    }
}

// ============================================================================
// Save Functions
// ============================================================================

/// Serialize form values as pretty JSON (the payload shape)
pub fn form_values_to_string(values: &FormValues) -> ConsoleResult<String> {
    Ok(serde_json::to_string_pretty(&values.to_payload())?)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::FormValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"school_year_id": 3, "start_date": "2024-09-01", "name": "T1"}}"#).unwrap();

        let values = load_form_values(file.path()).unwrap();
        assert_eq!(values.get("school_year_id"), &FormValue::Id(3));
        assert!(values.get("start_date").as_date().is_some());
        assert_eq!(values.get("name"), &FormValue::text("T1"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_form_values("/nonexistent/values.json").unwrap_err();
        assert!(matches!(err, ConsoleError::FileRead { .. }));
    }

    #[test]
    fn test_malformed_file_names_the_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        match load_form_values(file.path()).unwrap_err() {
            ConsoleError::FileRead { path, message } => {
                assert_eq!(path, file.path());
                assert!(message.starts_with("Invalid form values"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_object() {
        let err = form_values_from_str("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_to_string() {
        let values = FormValues::new().with("level_id", FormValue::Id(0));
        let json = form_values_to_string(&values).unwrap();
        assert!(json.contains("\"level_id\": 0"));
    }
}
