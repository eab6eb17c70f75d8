//! # Campus Forms
//!
//! Form model of Campus Console. It holds everything a form needs that does
//! not touch the network.
//!
//! ## Core Concepts
//!
//! - **Hierarchy**: the static chain of dependent selectors of each form kind
//!   (Program → Specialization → Level for a class)
//! - **Selection**: the per-form selection state, written only through a pure
//!   reducer that clears every level below a changed one
//! - **Validation**: closed rule set evaluated into a field → message map
//! - **Values**: typed field values and their JSON payload form
//!

pub mod hierarchy;
pub mod rules;
pub mod selection;
pub mod serialization;
pub mod validation;
pub mod values;

pub use hierarchy::{FormContext, FormKind, LevelSpec, levels_for, locked_levels};
pub use rules::{rules_for, write_only_fields};
pub use selection::{
    CascadingSelectionController, LevelSlot, SelectionEvent, SelectionSeed, SelectionState,
    reduce,
};
pub use serialization::{form_values_from_str, form_values_to_string, load_form_values};
pub use validation::{ErrorMap, Rule, RuleSet, validate, validate_ignoring};
pub use values::{FileInfo, FormValue, FormValues};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient re-exports for common usage
pub mod prelude {
    pub use crate::{
        CascadingSelectionController,
        ErrorMap,
        FormContext,
        FormKind,
        FormValue,
        FormValues,
        Rule,
        RuleSet,
        SelectionSeed,
        rules_for,
        validate,
    };
    pub use campus_core::{ConsoleError, ConsoleResult};
}
