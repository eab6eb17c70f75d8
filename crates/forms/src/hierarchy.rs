//! Entity hierarchies of the cascading forms
//!
//! Each form kind declares the ordered chain of dependent selectors it shows,
//! e.g. the class form picks a Program, then a Specialization of that
//! program, then a Level of that specialization. The declaration is static:
//! [`levels_for`] is pure and allocates nothing.

use campus_core::{ConsoleError, ConsoleResult, Resource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FormKind
// ============================================================================

/// The forms of the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormKind {
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

impl FormKind {
    /// All form kinds
    pub const ALL: [FormKind; 10] = [
        FormKind::Administrator,
        FormKind::SchoolYear,
        FormKind::SchoolYearPeriod,
        FormKind::Program,
        FormKind::Specialization,
        FormKind::Level,
        FormKind::Class,
        FormKind::Student,
        FormKind::Payment,
        FormKind::DocumentRequest,
    ];

    /// Kebab-case name used on the command line
    pub fn name(&self) -> &'static str {
        match self {
            FormKind::Administrator => "administrator",
            FormKind::SchoolYear => "school-year",
            FormKind::SchoolYearPeriod => "school-year-period",
            FormKind::Program => "program",
            FormKind::Specialization => "specialization",
            FormKind::Level => "level",
            FormKind::Class => "class",
            FormKind::Student => "student",
            FormKind::Payment => "payment",
            FormKind::DocumentRequest => "document-request",
        }
    }

    /// The resource this form creates and edits
    pub fn resource(&self) -> Resource {
        match self {
            FormKind::Administrator => Resource::Administrator,
            FormKind::SchoolYear => Resource::SchoolYear,
            FormKind::SchoolYearPeriod => Resource::SchoolYearPeriod,
            FormKind::Program => Resource::Program,
            FormKind::Specialization => Resource::Specialization,
            FormKind::Level => Resource::Level,
            FormKind::Class => Resource::Class,
            FormKind::Student => Resource::Student,
            FormKind::Payment => Resource::Payment,
            FormKind::DocumentRequest => Resource::DocumentRequest,
        }
    }

    /// Ordered levels of this form's cascade (empty when it has none)
    pub fn levels(&self) -> &'static [LevelSpec] {
        levels_for(*self)
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormKind {
    type Err = ConsoleError;

    fn from_str(s: &str) -> ConsoleResult<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        FormKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| ConsoleError::UnknownFormKind(s.to_string()))
    }
}

// ============================================================================
// LevelSpec
// ============================================================================

/// One selector in a cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSpec {
    /// Level name (e.g. "specialization")
    pub name: &'static str,

    /// Form field holding the selected id (e.g. "specialization_id")
    pub field: &'static str,

    /// Resource that supplies this level's options
    pub resource: Resource,

    /// Index of the level whose value scopes the options query
    pub parent: Option<usize>,

    /// Query parameter carrying the parent's value (e.g. "program_id")
    pub scope_param: Option<&'static str>,
}

impl LevelSpec {
    const fn root(name: &'static str, resource: Resource, field: &'static str) -> Self {
        Self {
            name,
            field,
            resource,
            parent: None,
            scope_param: None,
        }
    }

    const fn scoped(
        name: &'static str,
        resource: Resource,
        field: &'static str,
        parent: usize,
        scope_param: &'static str,
    ) -> Self {
        Self {
            name,
            field,
            resource,
            parent: Some(parent),
            scope_param: Some(scope_param),
        }
    }

    /// Whether this level (at `index` in `levels`) is pre-selected and
    /// read-only in the given context
    pub fn is_locked_in(&self, index: usize, levels: &[LevelSpec], ctx: &FormContext) -> bool {
        match ctx {
            FormContext::Create | FormContext::Edit => false,
            FormContext::ScopedCreate { scope } => levels
                .iter()
                .position(|level| level.resource == *scope)
                .is_some_and(|scope_index| index <= scope_index),
        }
    }
}

// ============================================================================
// FormContext
// ============================================================================

/// How a form was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormContext {
    /// Blank create form
    #[default]
    Create,
    /// Editing an existing record
    Edit,
    /// Create form opened from a parent's page (e.g. "add class" on a
    /// level's page); the parent and its ancestors are locked
    ScopedCreate { scope: Resource },
}

/// Lock flag of every level of `kind`'s cascade in `ctx`
///
/// A scope resource that is not part of the hierarchy is a programmer error.
pub fn locked_levels(kind: FormKind, ctx: &FormContext) -> ConsoleResult<Vec<bool>> {
    let levels = levels_for(kind);
    if let FormContext::ScopedCreate { scope } = ctx {
        if !levels.iter().any(|level| level.resource == *scope) {
            return Err(ConsoleError::UnknownLevel {
                form: kind.name().to_string(),
                level: scope.path().to_string(),
            });
        }
    }
    Ok(levels
        .iter()
        .enumerate()
        .map(|(index, level)| level.is_locked_in(index, levels, ctx))
        .collect())
}

// ============================================================================
// Declarations
// ============================================================================

const PROGRAM: LevelSpec = LevelSpec::root("program", Resource::Program, "program_id");
const SPECIALIZATION: LevelSpec = LevelSpec::scoped(
    "specialization",
    Resource::Specialization,
    "specialization_id",
    0,
    "program_id",
);
const SCHOOL_YEAR: LevelSpec =
    LevelSpec::root("school_year", Resource::SchoolYear, "school_year_id");

static CLASS_LEVELS: [LevelSpec; 3] = [
    PROGRAM,
    SPECIALIZATION,
    LevelSpec::scoped("level", Resource::Level, "level_id", 1, "specialization_id"),
];

static LEVEL_LEVELS: [LevelSpec; 2] = [PROGRAM, SPECIALIZATION];

static SPECIALIZATION_LEVELS: [LevelSpec; 1] = [PROGRAM];

static PERIOD_LEVELS: [LevelSpec; 1] = [SCHOOL_YEAR];

static PAYMENT_LEVELS: [LevelSpec; 2] = [
    SCHOOL_YEAR,
    LevelSpec::scoped(
        "period",
        Resource::SchoolYearPeriod,
        "school_year_period_id",
        0,
        "school_year_id",
    ),
];

static STUDENT_LEVELS: [LevelSpec; 5] = [
    SCHOOL_YEAR,
    PROGRAM,
    LevelSpec::scoped(
        "specialization",
        Resource::Specialization,
        "specialization_id",
        1,
        "program_id",
    ),
    LevelSpec::scoped("level", Resource::Level, "level_id", 2, "specialization_id"),
    LevelSpec::scoped("class", Resource::Class, "class_id", 3, "level_id"),
];

/// Ordered levels of a form's cascade
pub fn levels_for(kind: FormKind) -> &'static [LevelSpec] {
    match kind {
        FormKind::Class => &CLASS_LEVELS,
        FormKind::Level => &LEVEL_LEVELS,
        FormKind::Specialization => &SPECIALIZATION_LEVELS,
        FormKind::SchoolYearPeriod => &PERIOD_LEVELS,
        FormKind::Payment => &PAYMENT_LEVELS,
        FormKind::Student => &STUDENT_LEVELS,
        FormKind::Administrator
        | FormKind::SchoolYear
        | FormKind::Program
        | FormKind::DocumentRequest => &[],
    }
}

// ============================================================================
// Tests
// ============================================================================
