//! Terminal rendering
//!
//! Every renderer returns a `String`; the commands print it. Colors come from
//! `colored` and follow its `NO_COLOR` / `CLICOLOR` handling.

use campus_core::{ListPage, Resource};
use campus_forms::{CascadingSelectionController, ErrorMap, FormKind};
use colored::Colorize;
use std::fmt::Write;

/// The cascade of a form, one level per line
pub fn render_levels(kind: FormKind) -> String {
    let mut out = format!("{} {}\n", "Form".bold(), kind.name().cyan());
    if kind.levels().is_empty() {
        out.push_str("  (no dependent selectors)\n");
        return out;
    }
    for (index, level) in kind.levels().iter().enumerate() {
        let scope = match (level.parent, level.scope_param) {
            (Some(parent), Some(param)) => {
                format!(" scoped by {} via {param}", kind.levels()[parent].name)
            }
            _ => String::new(),
        };
        let _ = writeln!(
            out,
            "  {index}. {} ({}) from /{}{scope}",
            level.name.green(),
            level.field,
            level.resource.path()
        );
    }
    out
}

/// Current selection, with the options query of every enabled level
pub fn render_selection(controller: &CascadingSelectionController, options_limit: u32) -> String {
    let state = controller.state();
    let mut out = String::new();
    for (index, slot) in state.levels.iter().enumerate() {
        let value = match slot.value {
            Some(id) => id.to_string().bold().to_string(),
            None => "-".dimmed().to_string(),
        };
        let flag = if slot.locked {
            " [locked]".yellow().to_string()
        } else if !controller.is_level_enabled(index) {
            " [disabled]".dimmed().to_string()
        } else {
            match controller.options_query(index, options_limit) {
                Ok(Some(key)) => format!(" options {key}"),
                _ => String::new(),
            }
        };
        let _ = writeln!(out, "  {:<16} {value}{flag}", slot.spec.name);
    }
    out
}

/// Field errors, sorted by field
pub fn render_errors(errors: &ErrorMap) -> String {
    let mut out = String::new();
    if let Some(message) = errors.server_message() {
        let _ = writeln!(out, "  {}", message.red());
    }
    for (field, message) in errors.iter() {
        let _ = writeln!(out, "  {}: {}", field.bold(), message.red());
    }
    out
}

/// One page of records as a table
pub fn render_page(resource: Resource, page: &ListPage) -> String {
    let meta = page.meta;
    let mut out = format!(
        "{} page {}/{} ({} total)\n",
        resource.display_name().bold(),
        meta.page,
        meta.total_pages.max(1),
        meta.total
    );
    if page.is_empty() {
        let _ = writeln!(out, "  {}", "no records".dimmed());
    }
    for entity in &page.data {
        let status = entity
            .status
            .map(|status| format!(" [{}]", status.label()))
            .unwrap_or_default();
        let id = entity.id.to_string().cyan();
        let _ = writeln!(out, "  {id:>6}  {}{status}", entity.label());
    }
    let mut nav = Vec::new();
    if meta.has_previous {
        nav.push("previous");
    }
    if meta.has_next {
        nav.push("next");
    }
    if !nav.is_empty() {
        let _ = writeln!(out, "  {}", format!("more: {}", nav.join(", ")).dimmed());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::{Entity, PaginationMeta, Status};
    use campus_forms::{FormContext, FormValues};

    #[test]
    fn test_render_levels_names_scope() {
        let out = render_levels(FormKind::Class);
        assert!(out.contains("program_id"));
        assert!(out.contains("/levels"));
        assert!(out.contains("via specialization_id"));
    }

    #[test]
    fn test_render_levels_without_cascade() {
        let out = render_levels(FormKind::Administrator);
        assert!(out.contains("no dependent selectors"));
    }

    #[test]
    fn test_render_selection_lists_options_query() {
        let mut controller = CascadingSelectionController::new(FormKind::Class);
        let program = controller.level_index("program").unwrap();
        controller.set_level(program, Some(1)).unwrap();
        let out = render_selection(&controller, 100);
        assert!(out.contains("program_id=1"));
        assert!(out.contains("[disabled]"));
    }

    #[test]
    fn test_render_errors() {
        let errors = campus_forms::validate(
            &FormValues::new(),
            &campus_forms::rules_for(FormKind::Program, &FormContext::Create).unwrap(),
        );
        let out = render_errors(&errors);
        assert!(out.contains("name"));
        assert!(out.contains("This field is required"));
    }

    #[test]
    fn test_render_page() {
        let page = ListPage {
            data: vec![
                Entity::new(1)
                    .with_field("name", "Sciences")
                    .with_status(Status::Active),
            ],
            meta: PaginationMeta::derive(2, 1, 3),
        };
        let out = render_page(Resource::Program, &page);
        assert!(out.contains("page 2/3 (3 total)"));
        assert!(out.contains("Sciences [Active]"));
        assert!(out.contains("more: previous, next"));
    }
}
