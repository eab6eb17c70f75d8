//! Form validation engine
//!
//! A form declares a [`RuleSet`]; [`validate`] runs it over the form's
//! values and returns an [`ErrorMap`] from field name to message. An empty
//! map means the form may be submitted.
//!
//! The engine is pure: no network I/O, no clock, no shared state. Running the
//! same values through the same rule set always yields the same map. Errors
//! returned by the server after a submit are merged into the map by the
//! caller ([`ErrorMap::merge_server`]), never produced here.
//!
//! ## Rules
//!
//! | Rule | Fails when |
//! |------|-----------|
//! | `Required` | the field is blank |
//! | `SelectRequired` | no option is selected (`0` is a valid option) |
//! | `NumericRange` | the value is not a number or lies outside `[min, max]` |
//! | `DateOrder` | `end <= start` (equal dates are invalid) |
//! | `StringLength` | the trimmed length lies outside `[min, max]` |
//! | `FileConstraint` | the file is too large or of a disallowed type |
//! | `Pattern` | the text does not match the pattern |
//!
//! Optional fields: every rule except `Required` and `SelectRequired` passes
//! on a blank value, so "optional but well-formed" needs no extra variant.
//! The first failing rule of a field wins, in rule-set order.

use crate::values::{FormValue, FormValues};
use campus_core::{ConsoleError, ConsoleResult};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const SELECT_MESSAGE: &str = "Please select an option";
pub const DATE_ORDER_MESSAGE: &str = "end date must be greater than start date";
pub const NUMBER_MESSAGE: &str = "Must be a number";
pub const FILE_TYPE_MESSAGE: &str = "File type is not allowed";

// ============================================================================
// Rule
// ============================================================================

/// One validation rule
#[derive(Debug, Clone)]
pub enum Rule {
    Required {
        field: String,
    },
    SelectRequired {
        field: String,
    },
    NumericRange {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    DateOrder {
        start: String,
        end: String,
        message: Option<String>,
    },
    StringLength {
        field: String,
        min: Option<usize>,
        max: Option<usize>,
    },
    FileConstraint {
        field: String,
        max_bytes: Option<u64>,
        /// Allowed MIME types (`image/png`, `image/*`) or extensions (`pdf`)
        allowed: Vec<String>,
    },
    Pattern {
        field: String,
        regex: Regex,
        message: String,
    },
}

impl Rule {
    pub fn required(field: impl Into<String>) -> Self {
        Rule::Required {
            field: field.into(),
        }
    }

    pub fn select_required(field: impl Into<String>) -> Self {
        Rule::SelectRequired {
            field: field.into(),
        }
    }

    pub fn numeric_range(field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Rule::NumericRange {
            field: field.into(),
            min,
            max,
        }
    }

    pub fn date_order(start: impl Into<String>, end: impl Into<String>) -> Self {
        Rule::DateOrder {
            start: start.into(),
            end: end.into(),
            message: None,
        }
    }

    /// Date ordering with a form-specific message
    pub fn date_order_with_message(
        start: impl Into<String>,
        end: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Rule::DateOrder {
            start: start.into(),
            end: end.into(),
            message: Some(message.into()),
        }
    }

    pub fn length(field: impl Into<String>, min: Option<usize>, max: Option<usize>) -> Self {
        Rule::StringLength {
            field: field.into(),
            min,
            max,
        }
    }

    pub fn file(field: impl Into<String>, max_bytes: Option<u64>, allowed: &[&str]) -> Self {
        Rule::FileConstraint {
            field: field.into(),
            max_bytes,
            allowed: allowed.iter().map(|s| s.to_ascii_lowercase()).collect(),
        }
    }

    /// Pattern rule; an invalid pattern is a programmer error
    pub fn pattern(
        field: impl Into<String>,
        pattern: &str,
        message: impl Into<String>,
    ) -> ConsoleResult<Self> {
        let field = field.into();
        let regex = Regex::new(pattern).map_err(|e| ConsoleError::InvalidRule {
            field: field.clone(),
            message: e.to_string(),
        })?;
        Ok(Rule::Pattern {
            field,
            regex,
            message: message.into(),
        })
    }

    /// Field that receives this rule's error
    pub fn target(&self) -> &str {
        match self {
            Rule::Required { field }
            | Rule::SelectRequired { field }
            | Rule::NumericRange { field, .. }
            | Rule::StringLength { field, .. }
            | Rule::FileConstraint { field, .. }
            | Rule::Pattern { field, .. } => field,
            Rule::DateOrder { end, .. } => end,
        }
    }

    /// Every field this rule reads
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Rule::DateOrder { start, end, .. } => vec![start.as_str(), end.as_str()],
            other => vec![other.target()],
        }
    }

    /// Whether this rule reads `field`
    pub fn touches(&self, field: &str) -> bool {
        self.fields().contains(&field)
    }

    /// Evaluate against the form values; `Some(message)` on failure
    pub fn check(&self, values: &FormValues) -> Option<String> {
        match self {
            Rule::Required { field } => values
                .get(field)
                .is_blank()
                .then(|| REQUIRED_MESSAGE.to_string()),

            Rule::SelectRequired { field } => match values.get(field) {
                value if value.is_blank() => Some(SELECT_MESSAGE.to_string()),
                value if value.as_id().is_none() => Some(SELECT_MESSAGE.to_string()),
                _ => None,
            },

            Rule::NumericRange { field, min, max } => {
                let value = values.get(field);
                if value.is_blank() {
                    return None;
                }
                let Some(n) = value.as_number() else {
                    return Some(NUMBER_MESSAGE.to_string());
                };
                let below = min.is_some_and(|min| n < min);
                let above = max.is_some_and(|max| n > max);
                if !below && !above {
                    return None;
                }
                match (min, max) {
                    (Some(min), Some(max)) => Some(format!("Must be between {min} and {max}")),
                    (Some(min), None) => Some(format!("Minimum value is {min}")),
                    (None, Some(max)) => Some(format!("Maximum value is {max}")),
                    (None, None) => None,
                }
            }

            Rule::DateOrder {
                start,
                end,
                message,
            } => {
                let start = values.get(start).as_date()?;
                let end = values.get(end).as_date()?;
                (end <= start).then(|| {
                    message
                        .clone()
                        .unwrap_or_else(|| DATE_ORDER_MESSAGE.to_string())
                })
            }

            Rule::StringLength { field, min, max } => {
                let FormValue::Text(text) = values.get(field) else {
                    return None;
                };
                let len = text.trim().chars().count();
                if len == 0 {
                    return None;
                }
                if let Some(min) = min.filter(|min| len < *min) {
                    return Some(format!("Minimum length is {min} characters"));
                }
                if let Some(max) = max.filter(|max| len > *max) {
                    return Some(format!("Maximum length is {max} characters"));
                }
                None
            }

            Rule::FileConstraint {
                field,
                max_bytes,
                allowed,
            } => {
                let FormValue::File(file) = values.get(field) else {
                    return None;
                };
                if let Some(max) = max_bytes.filter(|max| file.size > *max) {
                    return Some(format!("File must not exceed {} KB", max / 1024));
                }
                if allowed.is_empty() {
                    return None;
                }
                let mime = file.mime.as_deref().map(str::to_ascii_lowercase);
                let extension = file.extension();
                let accepted = allowed.iter().any(|entry| {
                    if let Some(prefix) = entry.strip_suffix("/*") {
                        mime.as_deref()
                            .is_some_and(|m| m.split('/').next() == Some(prefix))
                    } else if entry.contains('/') {
                        mime.as_deref() == Some(entry.as_str())
                    } else {
                        extension.as_deref() == Some(entry.trim_start_matches('.'))
                    }
                });
                (!accepted).then(|| FILE_TYPE_MESSAGE.to_string())
            }

            Rule::Pattern {
                field,
                regex,
                message,
            } => match values.get(field) {
                FormValue::Text(text) if !text.trim().is_empty() => {
                    (!regex.is_match(text.trim())).then(|| message.clone())
                }
                _ => None,
            },
        }
    }
}

// ============================================================================
// RuleSet
// ============================================================================

/// Ordered rules of one form
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fields that depend on `field` through some rule (including itself)
    pub fn related_fields(&self, field: &str) -> BTreeSet<String> {
        let mut related = BTreeSet::from([field.to_string()]);
        for rule in self.rules.iter().filter(|r| r.touches(field)) {
            related.extend(rule.fields().into_iter().map(str::to_string));
        }
        related
    }
}

// ============================================================================
// ErrorMap
// ============================================================================

/// Field name → error message; empty means valid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMap {
    errors: BTreeMap<String, String>,
    server: Option<String>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.server.is_none()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.errors.iter()
    }

    /// Form-level message from the last failed submit
    pub fn server_message(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Record an error unless the field already has one
    fn add(&mut self, field: &str, message: String) {
        self.errors.entry(field.to_string()).or_insert(message);
    }

    /// Recompute the errors affected by an edit of `changed`
    ///
    /// Every rule reading `changed` is re-run, together with every other rule
    /// targeting a field those rules read. Editing `dateask` therefore raises
    /// or clears the ordering error shown on `datedelivery`.
    pub fn revalidate_field(&mut self, values: &FormValues, rules: &RuleSet, changed: &str) {
        let related = rules.related_fields(changed);
        let fresh = validate(values, rules);
        for field in &related {
            match fresh.errors.get(field) {
                Some(message) => {
                    self.errors.insert(field.clone(), message.clone());
                }
                None => {
                    self.errors.remove(field);
                }
            }
        }
        self.server = None;
    }

    /// Merge the outcome of a failed submit
    ///
    /// Field errors from a server validation response land next to their
    /// fields; any other failure becomes the form-level message.
    pub fn merge_server(&mut self, error: &ConsoleError) {
        match error {
            ConsoleError::Validation { fields } => {
                for (field, message) in fields {
                    self.errors.insert(field.clone(), message.clone());
                }
            }
            other => self.server = Some(other.user_message()),
        }
    }

    /// Convert into a validation error for callers that propagate with `?`
    pub fn into_result(self) -> ConsoleResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConsoleError::validation(self.errors))
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.errors
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Run every rule over the values
pub fn validate(values: &FormValues, rules: &RuleSet) -> ErrorMap {
    validate_ignoring(values, rules, &[])
}

/// Run every rule that reads none of the `ignored` fields
///
/// Disabled cascade levels are passed as `ignored`.
pub fn validate_ignoring(values: &FormValues, rules: &RuleSet, ignored: &[&str]) -> ErrorMap {
    let mut errors = ErrorMap::new();
    for rule in rules.rules() {
        if ignored.iter().any(|field| rule.touches(field)) {
            continue;
        }
        if let Some(message) = rule.check(values) {
            errors.add(rule.target(), message);
        }
    }
    errors
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::FileInfo;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> FormValue {
        FormValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_required() {
        let rules = RuleSet::new().rule(Rule::required("name"));
        let errors = validate(&FormValues::new().with("name", "  "), &rules);
        assert_eq!(errors.get("name"), Some(REQUIRED_MESSAGE));
        assert!(validate(&FormValues::new().with("name", "6e A"), &rules).is_valid());
    }

    #[test]
    fn test_select_required_accepts_zero() {
        let rules = RuleSet::new().rule(Rule::select_required("level_id"));
        assert!(validate(&FormValues::new().with("level_id", FormValue::Id(0)), &rules).is_valid());
        assert_eq!(
            validate(&FormValues::new(), &rules).get("level_id"),
            Some(SELECT_MESSAGE)
        );
        assert_eq!(
            validate(&FormValues::new().with("level_id", ""), &rules).get("level_id"),
            Some(SELECT_MESSAGE)
        );
    }

    #[test]
    fn test_numeric_range() {
        let rules = RuleSet::new().rule(Rule::numeric_range("capacity", Some(1.0), Some(60.0)));
        let check = |v: FormValue| validate(&FormValues::new().with("capacity", v), &rules);
        assert!(check(FormValue::Number(30.0)).is_valid());
        assert!(check(FormValue::Empty).is_valid());
        assert_eq!(check(FormValue::Number(61.0)).get("capacity"), Some("Must be between 1 and 60"));
        assert_eq!(check(FormValue::text("many")).get("capacity"), Some(NUMBER_MESSAGE));
    }

    #[test]
    fn test_date_order_equal_is_invalid() {
        let rules = RuleSet::new().rule(Rule::date_order("start_date", "end_date"));
        let values = FormValues::new()
            .with("start_date", date(2024, 9, 1))
            .with("end_date", date(2024, 9, 1));
        assert_eq!(validate(&values, &rules).get("end_date"), Some(DATE_ORDER_MESSAGE));

        let values = values.with("end_date", date(2024, 9, 2));
        assert!(validate(&values, &rules).is_valid());
    }

    #[test]
    fn test_date_order_skips_missing_dates() {
        let rules = RuleSet::new().rule(Rule::date_order("start_date", "end_date"));
        let values = FormValues::new().with("end_date", date(2024, 1, 1));
        assert!(validate(&values, &rules).is_valid());
    }

    #[test]
    fn test_string_length() {
        let rules = RuleSet::new().rule(Rule::length("password", Some(8), Some(64)));
        let errors = validate(&FormValues::new().with("password", "short"), &rules);
        assert_eq!(errors.get("password"), Some("Minimum length is 8 characters"));
    }

    #[test]
    fn test_file_constraint() {
        let rules = RuleSet::new().rule(Rule::file("avatar", Some(2 * 1024 * 1024), &["image/*", "pdf"]));
        let with_file = |file: FileInfo| FormValues::new().with("avatar", FormValue::File(file));

        let ok = with_file(FileInfo::new("me.png", 1024, Some("image/png")));
        assert!(validate(&ok, &rules).is_valid());

        let pdf = with_file(FileInfo::new("cv.PDF", 1024, None));
        assert!(validate(&pdf, &rules).is_valid());

        let big = with_file(FileInfo::new("me.png", 3 * 1024 * 1024, Some("image/png")));
        assert_eq!(validate(&big, &rules).get("avatar"), Some("File must not exceed 2048 KB"));

        let exe = with_file(FileInfo::new("run.exe", 10, Some("application/x-msdownload")));
        assert_eq!(validate(&exe, &rules).get("avatar"), Some(FILE_TYPE_MESSAGE));
    }

    #[test]
    fn test_pattern_rule() {
        let rules = RuleSet::new()
            .rule(Rule::pattern("email", r"^[^@\s]+@[^@\s]+\.[^@\s]+$", "Must be a valid email address").unwrap());
        let errors = validate(&FormValues::new().with("email", "nope"), &rules);
        assert_eq!(errors.get("email"), Some("Must be a valid email address"));
        assert!(validate(&FormValues::new().with("email", "a@b.org"), &rules).is_valid());
    }

    #[test]
    fn test_invalid_pattern_is_programmer_error() {
        let err = Rule::pattern("code", "([", "bad").unwrap_err();
        assert!(err.is_programmer_error());
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let rules = RuleSet::new()
            .rule(Rule::required("name"))
            .rule(Rule::length("name", Some(2), None));
        let errors = validate(&FormValues::new(), &rules);
        assert_eq!(errors.get("name"), Some(REQUIRED_MESSAGE));
    }

    #[test]
    fn test_validate_is_idempotent() {
        let rules = RuleSet::new()
            .rule(Rule::required("name"))
            .rule(Rule::date_order("start_date", "end_date"))
            .rule(Rule::select_required("school_year_id"));
        let values = FormValues::new()
            .with("start_date", date(2024, 9, 1))
            .with("end_date", date(2024, 8, 1));
        assert_eq!(validate(&values, &rules), validate(&values, &rules));
        assert_eq!(validate(&values, &rules).len(), 3);
    }

    #[test]
    fn test_validate_ignoring_disabled_fields() {
        let rules = RuleSet::new()
            .rule(Rule::select_required("program_id"))
            .rule(Rule::select_required("level_id"));
        let errors = validate_ignoring(&FormValues::new(), &rules, &["level_id"]);
        assert_eq!(errors.len(), 1);
        assert!(errors.get("level_id").is_none());
    }

    #[test]
    fn test_revalidate_counterpart_field() {
        let rules = RuleSet::new().rule(Rule::date_order_with_message(
            "dateask",
            "datedelivery",
            "delivery date must be after the request date",
        ));
        let mut values = FormValues::new()
            .with("dateask", date(2024, 3, 1))
            .with("datedelivery", date(2024, 3, 5));
        let mut errors = validate(&values, &rules);
        assert!(errors.is_valid());

        values.set("dateask", date(2024, 3, 10));
        errors.revalidate_field(&values, &rules, "dateask");
        assert_eq!(
            errors.get("datedelivery"),
            Some("delivery date must be after the request date")
        );

        values.set("datedelivery", date(2024, 3, 12));
        errors.revalidate_field(&values, &rules, "datedelivery");
        assert!(errors.is_valid());
    }

    #[test]
    fn test_revalidate_leaves_unrelated_errors() {
        let rules = RuleSet::new()
            .rule(Rule::required("name"))
            .rule(Rule::required("code"));
        let mut values = FormValues::new();
        let mut errors = validate(&values, &rules);
        values.set("name", "Grade 6");
        errors.revalidate_field(&values, &rules, "name");
        assert!(errors.get("name").is_none());
        assert_eq!(errors.get("code"), Some(REQUIRED_MESSAGE));
    }

    #[test]
    fn test_merge_server_errors() {
        let mut errors = ErrorMap::new();
        errors.merge_server(&ConsoleError::rejected(409, "Email already in use"));
        assert_eq!(errors.server_message(), Some("Email already in use"));
        assert!(!errors.is_valid());

        let mut fields = BTreeMap::new();
        fields.insert("email".to_string(), "taken".to_string());
        errors.merge_server(&ConsoleError::validation(fields));
        assert_eq!(errors.get("email"), Some("taken"));
    }
}
