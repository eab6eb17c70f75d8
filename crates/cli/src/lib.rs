//! # Campus CLI
//!
//! Command-line interface for Campus Console.
//!
//! ## Commands
//!
//! - `levels` - Print the cascade levels of a form
//! - `cascade` - Apply selections and show how lower levels reset
//! - `validate` - Validate a JSON file of form values
//! - `list` - Fetch a page of records through the cache
//! - `delete` - Delete a record and re-list its page
//!
//! Records come from the HTTP API, or from a directory of JSON fixtures
//! served in memory (`--fixtures`).
//!

pub mod args;
pub mod commands;
pub mod output;

pub use args::{Cli, Command};
pub use commands::run;

/// CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI name
pub const NAME: &str = env!("CARGO_PKG_NAME");
