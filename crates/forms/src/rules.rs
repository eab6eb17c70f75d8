//! Rule sets of the console forms

use crate::hierarchy::{FormContext, FormKind};
use crate::validation::{Rule, RuleSet};
use campus_core::ConsoleResult;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const PHONE_PATTERN: &str = r"^\+?[0-9][0-9 .-]{5,19}$";

const IMAGE_TYPES: &[&str] = &["image/*", "png", "jpg", "jpeg", "webp"];
const RECEIPT_TYPES: &[&str] = &["application/pdf", "pdf", "image/*", "png", "jpg", "jpeg"];

const KB: u64 = 1024;

fn email(field: &str) -> ConsoleResult<Rule> {
    Rule::pattern(field, EMAIL_PATTERN, "Must be a valid email address")
}

fn phone(field: &str) -> ConsoleResult<Rule> {
    Rule::pattern(field, PHONE_PATTERN, "Must be a valid phone number")
}

fn name(rules: RuleSet, field: &str, max: usize) -> RuleSet {
    rules
        .rule(Rule::required(field))
        .rule(Rule::length(field, Some(2), Some(max)))
}

fn period(rules: RuleSet, start: &str, end: &str) -> RuleSet {
    rules
        .rule(Rule::required(start))
        .rule(Rule::required(end))
        .rule(Rule::date_order(start, end))
}

fn selects(rules: RuleSet, fields: &[&str]) -> RuleSet {
    fields
        .iter()
        .fold(rules, |rules, field| rules.rule(Rule::select_required(*field)))
}

/// Fields the API accepts but never sends back
pub fn write_only_fields(kind: FormKind) -> &'static [&'static str] {
    match kind {
        FormKind::Administrator => &["password"],
        _ => &[],
    }
}

/// Rule set of a form opened in `context`
///
/// Cascade fields get a `SelectRequired` rule each; the caller skips the
/// ones whose level is disabled. When editing, write-only fields are
/// optional: a blank one keeps the stored value.
pub fn rules_for(kind: FormKind, context: &FormContext) -> ConsoleResult<RuleSet> {
    let rules = base_rules(kind)?;
    if *context != FormContext::Edit {
        return Ok(rules);
    }
    let write_only = write_only_fields(kind);
    Ok(rules
        .rules()
        .iter()
        .filter(|rule| match rule {
            Rule::Required { field } => !write_only.iter().any(|w| *w == field.as_str()),
            _ => true,
        })
        .cloned()
        .fold(RuleSet::new(), RuleSet::rule))
}

fn base_rules(kind: FormKind) -> ConsoleResult<RuleSet> {
    let rules = RuleSet::new();
    let rules = match kind {
        FormKind::Administrator => name(name(rules, "first_name", 50), "last_name", 50)
            .rule(Rule::required("email"))
            .rule(email("email")?)
            .rule(phone("phone")?)
            .rule(Rule::required("password"))
            .rule(Rule::length("password", Some(8), Some(64)))
            .rule(Rule::file("avatar", Some(2048 * KB), IMAGE_TYPES)),

        FormKind::SchoolYear => period(name(rules, "name", 50), "start_date", "end_date"),

        FormKind::SchoolYearPeriod => period(
            name(selects(rules, &["school_year_id"]), "name", 100),
            "start_date",
            "end_date",
        ),

        FormKind::Program => name(rules, "name", 100).rule(Rule::length("code", None, Some(20))),

        FormKind::Specialization => name(selects(rules, &["program_id"]), "name", 100),

        FormKind::Level => name(
            selects(rules, &["program_id", "specialization_id"]),
            "name",
            100,
        ),

        FormKind::Class => name(
            selects(rules, &["program_id", "specialization_id", "level_id"]),
            "name",
            100,
        )
        .rule(Rule::numeric_range("capacity", Some(1.0), Some(200.0))),

        FormKind::Student => name(
            name(
                selects(
                    rules,
                    &[
                        "school_year_id",
                        "program_id",
                        "specialization_id",
                        "level_id",
                        "class_id",
                    ],
                ),
                "first_name",
                50,
            ),
            "last_name",
            50,
        )
        .rule(Rule::required("birth_date"))
        .rule(email("email")?)
        .rule(phone("phone")?)
        .rule(Rule::file("photo", Some(2048 * KB), IMAGE_TYPES)),

        FormKind::Payment => {
            selects(rules, &["school_year_id", "school_year_period_id", "student_id"])
                .rule(Rule::required("amount"))
                .rule(Rule::numeric_range("amount", Some(1.0), None))
                .rule(Rule::required("payment_date"))
                .rule(Rule::file("receipt", Some(5120 * KB), RECEIPT_TYPES))
        }

        FormKind::DocumentRequest => selects(rules, &["student_id"])
            .rule(Rule::required("document_type"))
            .rule(Rule::required("dateask"))
            .rule(Rule::date_order_with_message(
                "dateask",
                "datedelivery",
                "delivery date must be after the request date",
            )),
    };
    Ok(rules)
}
