//! Form values
//!
//! A form's state is a map from field name to [`FormValue`]. Values arrive
//! from widgets (or JSON files on the command line) and leave as a JSON
//! payload for create/update requests.

use campus_core::{Entity, EntityId, Payload};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Date format used by the date pickers and the API
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// FileInfo
// ============================================================================

/// Metadata of a file picked in an upload field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub mime: Option<String>,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64, mime: Option<&str>) -> Self {
        Self {
            name: name.into(),
            size,
            mime: mime.map(str::to_string),
        }
    }

    /// Lower-cased file extension, if any
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

// ============================================================================
// FormValue
// ============================================================================

/// The value of one form field
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormValue {
    /// Nothing entered or selected
    #[default]
    Empty,
    Text(String),
    Number(f64),
    /// A selected record id; `Id(0)` is a legitimate selection
    Id(EntityId),
    Date(NaiveDate),
    Flag(bool),
    File(FileInfo),
}

impl FormValue {
    pub fn text(value: impl Into<String>) -> Self {
        FormValue::Text(value.into())
    }

    /// Parse a `YYYY-MM-DD` date, falling back to text when it is not one
    pub fn date(value: &str) -> Self {
        match NaiveDate::parse_from_str(value.trim(), DATE_FORMAT) {
            Ok(date) => FormValue::Date(date),
            Err(_) => FormValue::Text(value.to_string()),
        }
    }

    /// True when the user entered nothing (whitespace-only text counts)
    pub fn is_blank(&self) -> bool {
        match self {
            FormValue::Empty => true,
            FormValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric reading of the value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormValue::Number(n) => Some(*n),
            FormValue::Id(id) => Some(*id as f64),
            FormValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Selected id, if the value is a selection
    pub fn as_id(&self) -> Option<EntityId> {
        match self {
            FormValue::Id(id) => Some(*id),
            FormValue::Number(n) if n.fract() == 0.0 => Some(*n as EntityId),
            FormValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Date reading of the value
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FormValue::Date(d) => Some(*d),
            FormValue::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok(),
            _ => None,
        }
    }

    /// Convert a JSON value into a form value
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FormValue::Empty,
            Value::Bool(b) => FormValue::Flag(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FormValue::Id(i),
                None => FormValue::Number(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => FormValue::date(s),
            Value::Object(_) => serde_json::from_value::<FileInfo>(value.clone())
                .map(FormValue::File)
                .unwrap_or_else(|_| FormValue::Text(value.to_string())),
            Value::Array(_) => FormValue::Text(value.to_string()),
        }
    }

    /// Convert into the JSON sent to the API
    pub fn to_json(&self) -> Value {
        match self {
            FormValue::Empty => Value::Null,
            FormValue::Text(s) => Value::String(s.clone()),
            FormValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FormValue::Id(id) => Value::from(*id),
            FormValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            FormValue::Flag(b) => Value::Bool(*b),
            FormValue::File(file) => Value::String(file.name.clone()),
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<EntityId> for FormValue {
    fn from(id: EntityId) -> Self {
        FormValue::Id(id)
    }
}

impl From<NaiveDate> for FormValue {
    fn from(date: NaiveDate) -> Self {
        FormValue::Date(date)
    }
}

impl From<Option<EntityId>> for FormValue {
    fn from(id: Option<EntityId>) -> Self {
        id.map(FormValue::Id).unwrap_or(FormValue::Empty)
    }
}

// ============================================================================
// FormValues
// ============================================================================

/// All field values of one form
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormValues {
    values: BTreeMap<String, FormValue>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FormValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn clear(&mut self, field: &str) {
        self.values.insert(field.to_string(), FormValue::Empty);
    }

    /// Value of a field; missing fields read as [`FormValue::Empty`]
    pub fn get(&self, field: &str) -> &FormValue {
        static EMPTY: FormValue = FormValue::Empty;
        self.values.get(field).unwrap_or(&EMPTY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FormValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Seed from an existing record (edit mode)
    pub fn from_entity(entity: &Entity) -> Self {
        let mut values = Self::new();
        for (field, value) in &entity.fields {
            values.set(field.clone(), FormValue::from_json(value));
        }
        if let Some(status) = entity.status {
            values.set("status", FormValue::Id(i64::from(status.code())));
        }
        values
    }

    /// Read from a JSON object
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut values = Self::new();
        for (field, value) in object {
            values.set(field.clone(), FormValue::from_json(value));
        }
        values
    }

    /// Payload for create/update requests
    pub fn to_payload(&self) -> Payload {
        self.values
            .iter()
            .map(|(field, value)| (field.clone(), value.to_json()))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
