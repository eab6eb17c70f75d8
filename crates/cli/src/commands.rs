//! Command implementations

use crate::args::{Cli, Command, ListArgs, SourceArgs};
use crate::output::{render_errors, render_levels, render_page, render_selection};
use anyhow::{Context, bail};
use campus_core::{
    ConsoleConfig, EntityId, Pagination, QueryFilters, QueryKey, Resource, ResourceApi,
};
use campus_forms::{
    CascadingSelectionController, FormContext, FormKind, SelectionSeed, load_form_values,
    rules_for, validate_ignoring,
};
use campus_sync::{HttpResourceApi, ListView, MemoryBackend, ResourceQueryCache};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

/// Run a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConsoleConfig::resolve(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Command::Levels { form } => {
            print!("{}", render_levels(form));
            Ok(())
        }
        Command::Cascade { form, set } => cascade(form, &set, &config),
        Command::Validate { form, values } => validate_file(form, &values),
        Command::List(args) => match backend(&args.source, &config)? {
            Backend::Memory(api) => list(api, args, &config).await,
            Backend::Http(api) => list(api, args, &config).await,
        },
        Command::Delete {
            resource,
            id,
            page,
            limit,
            source,
        } => {
            let limit = limit.unwrap_or(config.pagination.default_limit);
            match backend(&source, &config)? {
                Backend::Memory(api) => delete(api, resource, id, page, limit, &config).await,
                Backend::Http(api) => delete(api, resource, id, page, limit, &config).await,
            }
        }
    }
}

// ============================================================================
// Forms
// ============================================================================

fn cascade(
    form: FormKind,
    selections: &[(String, Option<EntityId>)],
    config: &ConsoleConfig,
) -> anyhow::Result<()> {
    let limit = config.pagination.options_limit;
    let mut controller = CascadingSelectionController::new(form);
    println!("{} {}", "Cascade".bold(), form.name().cyan());
    print!("{}", render_selection(&controller, limit));

    for (level, value) in selections {
        let index = controller.level_index(level)?;
        if !controller.is_level_enabled(index) {
            println!("{} {level} is disabled, selection ignored", "warning:".yellow());
        }
        controller.set_level(index, *value)?;
        let shown = value.map_or_else(|| "(cleared)".to_string(), |id| id.to_string());
        println!("\n{} {level} = {shown}", "set".bold());
        print!("{}", render_selection(&controller, limit));
    }
    Ok(())
}

fn validate_file(form: FormKind, path: &Path) -> anyhow::Result<()> {
    let values = load_form_values(path)?;
    let rules = rules_for(form, &FormContext::Create)?;

    // Levels under an empty parent accept no input and are not validated
    let mut controller = CascadingSelectionController::new(form);
    controller.initialize(SelectionSeed {
        values: form
            .levels()
            .iter()
            .map(|level| values.get(level.field).as_id())
            .collect(),
        locked: Vec::new(),
    });
    let disabled = controller.disabled_fields();

    let errors = validate_ignoring(&values, &rules, &disabled);
    if errors.is_valid() {
        println!("{} {} values are valid", "ok".green().bold(), form.name());
        return Ok(());
    }
    print!("{}", render_errors(&errors));
    bail!("{} field(s) of the {} form are invalid", errors.len(), form.name())
}

// ============================================================================
// Lists
// ============================================================================

enum Backend {
    Memory(MemoryBackend),
    Http(HttpResourceApi),
}

fn backend(source: &SourceArgs, config: &ConsoleConfig) -> anyhow::Result<Backend> {
    if let Some(dir) = &source.fixtures {
        let backend = MemoryBackend::from_fixture_dir(dir)
            .with_context(|| format!("failed to load fixtures from {}", dir.display()))?;
        return Ok(Backend::Memory(backend));
    }
    let mut api = config.api.clone();
    if let Some(url) = &source.base_url {
        api.base_url = url.clone();
    }
    tracing::debug!(base_url = %api.base_url, "using HTTP backend");
    Ok(Backend::Http(HttpResourceApi::new(&api)?))
}

async fn list<A: ResourceApi>(
    api: A,
    args: ListArgs,
    config: &ConsoleConfig,
) -> anyhow::Result<()> {
    let limit = args.limit.unwrap_or(config.pagination.default_limit);
    let mut filters = QueryFilters::none();
    if let Some(search) = &args.search {
        filters = filters.with_search(search);
    }
    if let Some(status) = args.status {
        filters = filters.with_status(status);
    }
    for (param, id) in args.scope {
        filters = filters.with_scope(param, id);
    }
    let key = QueryKey::new(args.resource, Pagination::new(args.page, limit)?, filters);

    let cache = Arc::new(ResourceQueryCache::new(api, config.cache.clone()));
    let view = ListView::with_key(cache, key);
    let snapshot = view
        .refresh()
        .await
        .with_context(|| format!("failed to list {}", args.resource.display_name()))?;

    if view.page() != args.page {
        let (asked, shown) = (args.page, view.page());
        println!("{} page {asked} is empty, showing page {shown}", "note:".yellow());
    }
    if let Some(err) = &snapshot.error {
        println!("{} showing cached rows: {}", "warning:".yellow(), err.user_message());
    }
    print!("{}", render_page(args.resource, &snapshot.page));
    Ok(())
}

async fn delete<A: ResourceApi>(
    api: A,
    resource: Resource,
    id: EntityId,
    page: u32,
    limit: u32,
    config: &ConsoleConfig,
) -> anyhow::Result<()> {
    let cache = Arc::new(ResourceQueryCache::new(api, config.cache.clone()));
    let view = ListView::with_key(cache, QueryKey::first_page(resource, limit)?.with_page(page)?);
    let snapshot = view
        .delete(id)
        .await
        .with_context(|| format!("failed to delete {} #{id}", resource.display_name()))?;

    println!("{} {} #{id}", "Deleted".green().bold(), resource.display_name());
    if view.page() != page {
        println!("{} page {page} is empty, showing page {}", "note:".yellow(), view.page());
    }
    print!("{}", render_page(resource, &snapshot.page));
    Ok(())
}
