//! Core traits for Campus Console
//!
//! This module defines the seams between the console core and its
//! collaborators: the backing API that serves records, and self-checking
//! configuration values.

use crate::error::ConsoleResult;
use crate::query::{ListPage, QueryKey};
use crate::types::{Entity, EntityId, Payload, Resource};
use std::future::Future;

// ============================================================================
// Validatable Trait
// ============================================================================

/// Trait for types that can check their own consistency
///
/// # Example
///
/// ```rust,ignore
/// use campus_core::{ConsoleError, ConsoleResult, Validatable};
///
/// struct Window { limit: u32 }
///
/// impl Validatable for Window {
///     fn validate(&self) -> ConsoleResult<()> {
///         if self.limit == 0 {
///             return Err(ConsoleError::config("limit must be at least 1"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validatable {
    /// Validate the current state of the object
    fn validate(&self) -> ConsoleResult<()>;

    /// Check if the object is valid without returning error details
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

// ============================================================================
// ResourceApi Trait
// ============================================================================

/// The uniform per-resource contract of the school-management API
///
/// Implementations map transport failures onto the error taxonomy:
/// 4xx responses become [`ConsoleError::Rejected`](crate::ConsoleError::Rejected)
/// (or `NotFound`), failures before a usable response become
/// [`ConsoleError::Transient`](crate::ConsoleError::Transient).
///
/// Tenant scoping and authentication are the implementation's concern and are
/// invisible to callers.
pub trait ResourceApi {
    /// `GET /<resource>?page=&limit=&search=&status=&<scope>=`
    ///
    /// The returned meta is already normalized for the requested page.
    fn list(&self, key: &QueryKey) -> impl Future<Output = ConsoleResult<ListPage>>;

    /// `GET /<resource>/<id>`
    fn get(&self, resource: Resource, id: EntityId) -> impl Future<Output = ConsoleResult<Entity>>;

    /// `POST /<resource>`
    fn create(
        &self,
        resource: Resource,
        payload: &Payload,
    ) -> impl Future<Output = ConsoleResult<Entity>>;

    /// `PATCH /<resource>/<id>`
    fn update(
        &self,
        resource: Resource,
        id: EntityId,
        payload: &Payload,
    ) -> impl Future<Output = ConsoleResult<Entity>>;

    /// `DELETE /<resource>/<id>`
    fn delete(&self, resource: Resource, id: EntityId) -> impl Future<Output = ConsoleResult<()>>;
}
