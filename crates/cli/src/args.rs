//! Command-line argument definitions

use campus_core::{EntityId, Resource, Status};
use campus_forms::FormKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "campus-console",
    version,
    about = "Campus Console - cascading forms, validation and cached school records"
)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, short = 'c', global = true, env = "CAMPUS_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the cascade levels of a form
    Levels {
        /// Form kind (e.g. `class`, `school-year-period`)
        form: FormKind,
    },

    /// Apply selections in order and print the state after each step
    Cascade {
        form: FormKind,

        /// `<level>=<id>`; an empty id clears the level
        #[arg(long = "set", value_name = "LEVEL=ID", value_parser = parse_selection)]
        set: Vec<(String, Option<EntityId>)>,
    },

    /// Validate a JSON object of form values
    Validate {
        form: FormKind,

        /// JSON file holding the values
        #[arg(long, value_name = "FILE")]
        values: PathBuf,
    },

    /// Fetch one page of a resource through the cache
    List(ListArgs),

    /// Delete a record, then re-list its page
    Delete {
        resource: Resource,

        id: EntityId,

        /// Page the record was deleted from
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Rows per page (defaults to `pagination.default_limit`)
        #[arg(long)]
        limit: Option<u32>,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Resource (e.g. `levels`, `school-year-periods`)
    pub resource: Resource,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Rows per page (defaults to `pagination.default_limit`)
    #[arg(long)]
    pub limit: Option<u32>,

    #[arg(long)]
    pub search: Option<String>,

    /// Status code or name (`active`, `inactive`, `suspended`)
    #[arg(long, value_parser = parse_status)]
    pub status: Option<Status>,

    /// Parent scope filter, `<param>=<id>` (e.g. `program_id=1`)
    #[arg(long, value_name = "PARAM=ID", value_parser = parse_scope)]
    pub scope: Vec<(String, EntityId)>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Where records come from
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Directory of `<resource>.json` fixtures served from memory
    #[arg(long, value_name = "DIR", conflicts_with = "base_url")]
    pub fixtures: Option<PathBuf>,

    /// API base URL (overrides `api.base_url`)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,
}

fn split_pair(raw: &str) -> Result<(&str, &str), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in `{raw}`"));
    }
    Ok((key, value.trim()))
}

fn parse_id(raw: &str) -> Result<EntityId, String> {
    raw.parse()
        .map_err(|_| format!("`{raw}` is not a record id"))
}

fn parse_selection(raw: &str) -> Result<(String, Option<EntityId>), String> {
    let (level, id) = split_pair(raw)?;
    let id = match id {
        "" => None,
        id => Some(parse_id(id)?),
    };
    Ok((level.to_string(), id))
}

fn parse_scope(raw: &str) -> Result<(String, EntityId), String> {
    let (param, id) = split_pair(raw)?;
    Ok((param.to_string(), parse_id(id)?))
}

fn parse_status(raw: &str) -> Result<Status, String> {
    if let Ok(code) = raw.trim().parse::<i32>() {
        return Ok(Status::from(code));
    }
    match raw.trim().to_ascii_lowercase().as_str() {
        "inactive" => Ok(Status::Inactive),
        "active" => Ok(Status::Active),
        "suspended" => Ok(Status::Suspended),
        other => Err(format!("unknown status `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("campus-console").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_levels_parses_form_kind() {
        let cli = parse(&["levels", "school_year_period"]);
        assert!(matches!(
            cli.command,
            Command::Levels { form: FormKind::SchoolYearPeriod }
        ));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cascade_selections_in_order() {
        let cli = parse(&["-v", "cascade", "class", "--set", "program=1", "--set", "level="]);
        assert!(cli.verbose);
        let Command::Cascade { form, set } = cli.command else {
            panic!("expected cascade");
        };
        assert_eq!(form, FormKind::Class);
        assert_eq!(
            set,
            vec![("program".to_string(), Some(1)), ("level".to_string(), None)]
        );
    }

    #[test]
    fn test_list_filters() {
        let cli = parse(&[
            "list",
            "levels",
            "--page",
            "2",
            "--status",
            "active",
            "--scope",
            "specialization_id=4",
            "--fixtures",
            "fixtures",
        ]);
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.resource, Resource::Level);
        assert_eq!(args.page, 2);
        assert_eq!(args.status, Some(Status::Active));
        assert_eq!(args.scope, vec![("specialization_id".to_string(), 4)]);
        assert_eq!(args.source.fixtures, Some(PathBuf::from("fixtures")));
    }

    #[test]
    fn test_fixtures_and_base_url_conflict() {
        let result = Cli::try_parse_from([
            "campus-console",
            "list",
            "levels",
            "--fixtures",
            "dir",
            "--base-url",
            "http://school.test",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_form_and_bad_pairs() {
        assert!(Cli::try_parse_from(["campus-console", "levels", "timetable"]).is_err());
        assert!(Cli::try_parse_from(["campus-console", "cascade", "class", "--set", "program"]).is_err());
        assert!(parse_scope("program_id=abc").is_err());
        assert!(parse_selection("=3").is_err());
    }

    #[test]
    fn test_status_codes_and_names() {
        assert_eq!(parse_status("2"), Ok(Status::Suspended));
        assert_eq!(parse_status("Inactive"), Ok(Status::Inactive));
        assert_eq!(parse_status("7"), Ok(Status::Other(7)));
        assert!(parse_status("archived").is_err());
    }
}
