//! Mount guards for forms and list views
//!
//! Every form or list instance owns a [`Mount`]. Async work started on its
//! behalf carries a [`MountToken`]; when the work resolves, the token tells
//! whether the result may still be applied. A token goes inactive when the
//! mount is disposed (the view closed) or retargeted (the view now edits a
//! different record).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Debug, Default)]
struct MountInner {
    epoch: AtomicU64,
    disposed: AtomicBool,
}

/// A live form or list instance
#[derive(Debug, Clone)]
pub struct Mount {
    id: Uuid,
    inner: Arc<MountInner>,
}

impl Mount {
    /// Create a new live mount
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: Arc::new(MountInner::default()),
        }
    }

    /// Unique id of this mount
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Issue a token for a request originating from this mount
    pub fn token(&self) -> MountToken {
        MountToken {
            mount_id: self.id,
            epoch: self.inner.epoch.load(Ordering::Acquire),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Invalidate every outstanding token (the view now targets another record)
    pub fn retarget(&self) {
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Close the view; no outstanding or future token is active afterwards
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Release);
    }

    /// Whether the view has been closed
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl Default for Mount {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of which mount (and which target) a request was issued for
#[derive(Debug, Clone)]
pub struct MountToken {
    mount_id: Uuid,
    epoch: u64,
    inner: Arc<MountInner>,
}

impl MountToken {
    /// Id of the originating mount
    pub fn mount_id(&self) -> Uuid {
        self.mount_id
    }

    /// Whether a result for this request may still be applied
    pub fn is_active(&self) -> bool {
        !self.inner.disposed.load(Ordering::Acquire)
            && self.inner.epoch.load(Ordering::Acquire) == self.epoch
    }
}
