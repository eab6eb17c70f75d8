//! Error types for Campus Console
//!
//! This module provides unified error handling across the console core.
//! Every error falls into one of four classes, each with its own
//! propagation policy:
//!
//! - **Validation**: local, field-scoped, never reaches the network
//! - **Rejection**: the server refused a request (4xx); the cache is untouched
//! - **Transient**: the request failed before a usable response arrived;
//!   cached data keeps being served
//! - **Programmer**: an invalid query key, form kind, or level; not recoverable
//!
//! `ConsoleError` is `Clone` so that one failed network call can be fanned out
//! to every caller that was waiting on it.

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Campus Console
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsoleError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// One or more form fields failed validation
    #[error("Validation failed: {}", summarize(.fields))]
    Validation { fields: BTreeMap<String, String> },

    // ========================================================================
    // Rejections
    // ========================================================================
    /// The server rejected the request (4xx)
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The requested record does not exist
    #[error("{resource} #{id} not found")]
    NotFound { resource: String, id: i64 },

    // ========================================================================
    // Transient Errors
    // ========================================================================
    /// The request failed before a usable response arrived
    #[error("Network error: {0}")]
    Transient(String),

    // ========================================================================
    // Programmer Errors
    // ========================================================================
    /// A query key was built with an invalid shape
    #[error("Invalid query key: {0}")]
    InvalidQueryKey(String),

    /// A form kind name that no hierarchy is declared for
    #[error("Unknown form kind: '{0}'")]
    UnknownFormKind(String),

    /// A level index or name outside the form's hierarchy
    #[error("Unknown level '{level}' in form '{form}'")]
    UnknownLevel { form: String, level: String },

    /// A resource name that the console does not know
    #[error("Unknown resource: '{0}'")]
    UnknownResource(String),

    /// A validation rule that cannot be evaluated
    #[error("Invalid rule for field '{field}': {message}")]
    InvalidRule { field: String, message: String },

    // ========================================================================
    // Ambient Errors
    // ========================================================================
    /// A response or file body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// File read error
    #[error("Failed to read file '{path}': {message}")]
    FileRead { path: PathBuf, message: String },

    /// The owning form or list was closed before the result arrived
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

fn summarize(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConsoleError {
    /// Create a validation error from a field → message map
    pub fn validation(fields: BTreeMap<String, String>) -> Self {
        ConsoleError::Validation { fields }
    }

    /// Create a rejection error
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        ConsoleError::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Create a transient network error
    pub fn transient(msg: impl Into<String>) -> Self {
        ConsoleError::Transient(msg.into())
    }

    /// Create an invalid query key error
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        ConsoleError::InvalidQueryKey(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        ConsoleError::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        ConsoleError::Internal(msg.into())
    }

    /// Create an error with context
    pub fn with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        ConsoleError::WithContext {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Check if this error is a local validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, ConsoleError::Validation { .. })
    }

    /// Check if the server rejected the request
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ConsoleError::Rejected { .. } | ConsoleError::NotFound { .. }
        )
    }

    /// Check if this error is a conflict (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, ConsoleError::Rejected { status: 409, .. })
    }

    /// Check if this error is a transient network failure
    pub fn is_transient(&self) -> bool {
        matches!(self, ConsoleError::Transient(_))
    }

    /// Check if this error is a programmer error (fail fast, never retry)
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            ConsoleError::InvalidQueryKey(_)
                | ConsoleError::UnknownFormKind(_)
                | ConsoleError::UnknownLevel { .. }
                | ConsoleError::UnknownResource(_)
                | ConsoleError::InvalidRule { .. }
        )
    }

    /// Field errors carried by a validation error
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ConsoleError::Validation { fields } => Some(fields),
            _ => None,
        }
    }

    /// Message suitable for inline display next to a form or list
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::Rejected { message, .. } => message.clone(),
            ConsoleError::Transient(_) => {
                "Unable to reach the server. Showing the last loaded data.".to_string()
            }
            ConsoleError::NotFound { .. } => "The record no longer exists.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::Decode(err.to_string())
    }
}

impl From<toml::de::Error> for ConsoleError {
    fn from(err: toml::de::Error) -> Self {
        ConsoleError::Config(err.to_string())
    }
}

/// Result type alias using ConsoleError
pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> ConsoleResult<T>;
}

impl<T, E: Into<ConsoleError>> ResultExt<T> for Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> ConsoleResult<T> {
        self.map_err(|e| {
            let err: ConsoleError = e.into();
            ConsoleError::WithContext {
                context: context.into(),
                message: err.to_string(),
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validation_error() {
        let mut fields = BTreeMap::new();
        fields.insert("end_date".to_string(), "end date must be greater than start date".to_string());
        let err = ConsoleError::validation(fields);
        assert!(err.is_validation());
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "Validation failed: end_date: end date must be greater than start date"
        );
        assert_eq!(err.field_errors().map(|f| f.len()), Some(1));
    }

    #[test]
    fn test_rejection_classification() {
        let err = ConsoleError::rejected(409, "Name already taken");
        assert!(err.is_rejection());
        assert!(err.is_conflict());
        assert!(!err.is_programmer_error());
        assert_eq!(err.user_message(), "Name already taken");

        let err = ConsoleError::NotFound {
            resource: "classes".to_string(),
            id: 4,
        };
        assert!(err.is_rejection());
        assert_eq!(err.to_string(), "classes #4 not found");
    }

    #[test]
    fn test_transient_error() {
        let err = ConsoleError::transient("connection refused");
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "Network error: connection refused");
        assert!(err.user_message().contains("last loaded data"));
    }

    #[test]
    fn test_programmer_errors() {
        assert!(ConsoleError::invalid_query("limit must be at least 1").is_programmer_error());
        assert!(ConsoleError::UnknownFormKind("course".to_string()).is_programmer_error());
        assert!(
            ConsoleError::UnknownLevel {
                form: "class".to_string(),
                level: "7".to_string(),
            }
            .is_programmer_error()
        );
        assert!(!ConsoleError::Cancelled.is_programmer_error());
    }

    #[test]
    fn test_error_with_context() {
        let err = ConsoleError::with_context("Loading fixtures", "Permission denied");
        assert_eq!(err.to_string(), "Loading fixtures: Permission denied");
    }

    #[test]
    fn test_result_ext_wraps_json_errors() {
        let parsed: Result<serde_json::Value, _> = serde_json::from_str("{ not json");
        let err = parsed.with_context("Parsing response").unwrap_err();
        match err {
            ConsoleError::WithContext { context, .. } => assert_eq!(context, "Parsing response"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
