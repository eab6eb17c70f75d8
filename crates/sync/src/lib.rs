//! # Campus Sync
//!
//! Everything between the form model and the school-management API:
//!
//! - **Cache**: `ResourceQueryCache`, the single source of truth for list
//!   results, with request coalescing, per-resource generations, and
//!   stale-while-revalidate
//! - **List views**: paginated tables with debounced search and step-back
//!   after deletes
//! - **Form sessions**: cascade, values, validation, and submit for one open
//!   form, guarded by its mount
//! - **Backends**: `HttpResourceApi` over `reqwest` and the in-process
//!   `MemoryBackend` used by tests and fixture mode
//!

pub mod cache;
pub mod debounce;
pub mod http;
pub mod list_view;
pub mod memory;
pub mod session;

pub use cache::{
    EntryStatus, MutationIntent, MutationOp, QuerySnapshot, ResourceQueryCache,
};
pub use debounce::SearchDebouncer;
pub use http::HttpResourceApi;
pub use list_view::ListView;
pub use memory::{ApiOp, MemoryBackend};
pub use session::FormSession;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
