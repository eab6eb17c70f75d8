//! # Campus Core
//!
//! Core types, traits, and error handling for Campus Console.
//!
//! This crate provides the foundational building blocks shared by the form
//! and synchronization crates, including:
//!
//! - **Types**: records, resources, statuses
//! - **Queries**: `QueryKey`, pagination windows, normalized `PaginationMeta`
//! - **Traits**: the `ResourceApi` seam and `Validatable`
//! - **Mounts**: tokens that tell whether an async result may still be applied
//! - **Config**: TOML configuration with environment overrides
//! - **Errors**: unified error handling with `ConsoleError` and `ConsoleResult`
//!

pub mod config;
pub mod error;
pub mod mount;
pub mod query;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{ApiConfig, CacheConfig, ConsoleConfig, PaginationConfig};
pub use error::{ConsoleError, ConsoleResult, ResultExt};
pub use mount::{Mount, MountToken};
pub use query::{
    ListPage, Pagination, PaginationMeta, QueryFilters, QueryKey, WireListResponse, WireMeta,
};
pub use traits::{ResourceApi, Validatable};
pub use types::{Entity, EntityId, Payload, Resource, Status};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
