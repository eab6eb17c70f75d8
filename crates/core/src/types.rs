//! Core types used throughout Campus Console
//!
//! This module contains the record and pagination types shared by the
//! selection controller, the validation engine, and the list cache.

use crate::error::{ConsoleError, ConsoleResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Type alias for server-assigned record identifiers
pub type EntityId = i64;

/// Partial record body sent with create and update requests
pub type Payload = Map<String, Value>;

// ============================================================================
// Resources
// ============================================================================

/// The resources exposed by the school-management API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Administrator,
    SchoolYear,
    SchoolYearPeriod,
    Program,
    Specialization,
    Level,
    Class,
    Student,
    Payment,
    DocumentRequest,
}

impl Resource {
    /// All resources, in declaration order
    pub const ALL: [Resource; 10] = [
        Resource::Administrator,
        Resource::SchoolYear,
        Resource::SchoolYearPeriod,
        Resource::Program,
        Resource::Specialization,
        Resource::Level,
        Resource::Class,
        Resource::Student,
        Resource::Payment,
        Resource::DocumentRequest,
    ];

    /// URL path segment for this resource (e.g. `school-years`)
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Administrator => "administrators",
            Resource::SchoolYear => "school-years",
            Resource::SchoolYearPeriod => "school-year-periods",
            Resource::Program => "programs",
            Resource::Specialization => "specializations",
            Resource::Level => "levels",
            Resource::Class => "classes",
            Resource::Student => "students",
            Resource::Payment => "payments",
            Resource::DocumentRequest => "document-requests",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Resource::Administrator => "Administrator",
            Resource::SchoolYear => "School Year",
            Resource::SchoolYearPeriod => "School Year Period",
            Resource::Program => "Program",
            Resource::Specialization => "Specialization",
            Resource::Level => "Level",
            Resource::Class => "Class",
            Resource::Student => "Student",
            Resource::Payment => "Payment",
            Resource::DocumentRequest => "Document Request",
        }
    }

    /// Name of the foreign-key field that references this resource
    pub fn id_field(&self) -> &'static str {
        match self {
            Resource::Administrator => "administrator_id",
            Resource::SchoolYear => "school_year_id",
            Resource::SchoolYearPeriod => "school_year_period_id",
            Resource::Program => "program_id",
            Resource::Specialization => "specialization_id",
            Resource::Level => "level_id",
            Resource::Class => "class_id",
            Resource::Student => "student_id",
            Resource::Payment => "payment_id",
            Resource::DocumentRequest => "document_request_id",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

impl FromStr for Resource {
    type Err = ConsoleError;

    /// Accepts the path segment (`school-years`) or the singular kebab name
    /// (`school-year`)
    fn from_str(s: &str) -> ConsoleResult<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Resource::ALL
            .into_iter()
            .find(|r| {
                r.path() == wanted
                    || serde_json::to_value(r)
                        .ok()
                        .and_then(|v| v.as_str().map(|name| name == wanted))
                        .unwrap_or(false)
            })
            .ok_or_else(|| ConsoleError::UnknownResource(s.to_string()))
    }
}

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a record (numeric on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Status {
    Inactive,
    Active,
    Suspended,
    Other(i32),
}

impl Status {
    /// Numeric code used by the `status` filter
    pub fn code(&self) -> i32 {
        match self {
            Status::Inactive => 0,
            Status::Active => 1,
            Status::Suspended => 2,
            Status::Other(code) => *code,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> String {
        match self {
            Status::Inactive => "Inactive".to_string(),
            Status::Active => "Active".to_string(),
            Status::Suspended => "Suspended".to_string(),
            Status::Other(code) => format!("Status {code}"),
        }
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        match code {
            0 => Status::Inactive,
            1 => Status::Active,
            2 => Status::Suspended,
            other => Status::Other(other),
        }
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

// ============================================================================
// Entity
// ============================================================================

/// A record returned by the API
///
/// Only `id` and `status` are typed; every other column (display fields and
/// parent references such as `program_id`) lives in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entity {
    /// Create an entity with no fields
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            status: None,
            fields: Map::new(),
        }
    }

    /// Set a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Raw field value
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field value as text
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Field value as a record id (numbers and numeric strings are accepted)
    pub fn id_field(&self, name: &str) -> Option<EntityId> {
        match self.fields.get(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Best display label: `name`, then `title`, then first + last name
    pub fn label(&self) -> String {
        if let Some(name) = self.text("name").or_else(|| self.text("title")) {
            return name.to_string();
        }
        match (self.text("first_name"), self.text("last_name")) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            _ => format!("#{}", self.id),
        }
    }

    /// Case-insensitive substring match over every text field
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.fields.values().any(|v| match v {
            Value::String(s) => s.to_lowercase().contains(&needle),
            _ => false,
        })
    }

    /// Apply a partial update
    pub fn merge(&mut self, payload: &Payload) {
        for (key, value) in payload {
            match key.as_str() {
                "id" => {}
                "status" => self.status = value.as_i64().map(|code| Status::from(code as i32)),
                _ => {
                    self.fields.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_resource_paths() {
        assert_eq!(Resource::SchoolYearPeriod.path(), "school-year-periods");
        assert_eq!(Resource::Class.path(), "classes");
        assert_eq!(Resource::Program.id_field(), "program_id");
    }

    #[test]
    fn test_resource_parse() {
        assert_eq!("classes".parse::<Resource>().unwrap(), Resource::Class);
        assert_eq!("school-year".parse::<Resource>().unwrap(), Resource::SchoolYear);
        assert_eq!(
            "school_year_periods".parse::<Resource>().unwrap(),
            Resource::SchoolYearPeriod
        );
        let err = "courses".parse::<Resource>().unwrap_err();
        assert!(err.is_programmer_error());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::from(1), Status::Active);
        assert_eq!(Status::from(7), Status::Other(7));
        assert_eq!(Status::Suspended.code(), 2);
        assert_eq!(Status::Other(7).label(), "Status 7");
    }

    #[test]
    fn test_entity_deserialize_flattened() {
        let entity: Entity = serde_json::from_value(json!({
            "id": 12,
            "status": 1,
            "name": "Computer Science",
            "program_id": "3"
        }))
        .unwrap();
        assert_eq!(entity.id, 12);
        assert_eq!(entity.status, Some(Status::Active));
        assert_eq!(entity.text("name"), Some("Computer Science"));
        assert_eq!(entity.id_field("program_id"), Some(3));
        assert_eq!(entity.label(), "Computer Science");
    }

    #[test]
    fn test_entity_search_is_case_insensitive() {
        let entity = Entity::new(1)
            .with_field("first_name", "Alice")
            .with_field("last_name", "Martin");
        assert!(entity.matches_search("ali"));
        assert!(entity.matches_search("MART"));
        assert!(!entity.matches_search("bob"));
        assert_eq!(entity.label(), "Alice Martin");
    }

    #[test]
    fn test_entity_merge_keeps_id() {
        let mut entity = Entity::new(5).with_field("name", "Old");
        let mut payload = Payload::new();
        payload.insert("id".to_string(), json!(99));
        payload.insert("name".to_string(), json!("New"));
        payload.insert("status".to_string(), json!(0));
        entity.merge(&payload);
        assert_eq!(entity.id, 5);
        assert_eq!(entity.text("name"), Some("New"));
        assert_eq!(entity.status, Some(Status::Inactive));
    }
}
