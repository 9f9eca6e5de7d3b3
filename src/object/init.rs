/*!
 * Object Init Options
 * Builder for binding a native object to its host proxy and arena
 */

use super::host::{HostFinalizer, HostProxy};
use crate::core::types::ArenaId;
use crate::pool::CleanupMode;
use std::sync::{Arc, Weak};

/// What `Runtime::init` binds an object to
///
/// # Example
///
/// ```ignore
/// let arena = runtime.init(
///     id,
///     ObjectInit::new()
///         .host(&proxy)
///         .parent(scope)
///         .on_finalize(|mode| tracing::debug!(%mode, "proxy released")),
/// )?;
/// ```
#[derive(Default)]
pub struct ObjectInit {
    pub(crate) host: Option<Weak<dyn HostProxy>>,
    pub(crate) parent: Option<ArenaId>,
    pub(crate) exclusive: bool,
    pub(crate) finalizer: Option<HostFinalizer>,
}

impl ObjectInit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host proxy to publish the binding to; held weakly
    pub fn host<P: HostProxy + 'static>(mut self, proxy: &Arc<P>) -> Self {
        let proxy: Arc<dyn HostProxy> = proxy.clone();
        self.host = Some(Arc::downgrade(&proxy));
        self
    }

    /// Parent arena; the root when unset
    pub fn parent(mut self, arena: ArenaId) -> Self {
        self.parent = Some(arena);
        self
    }

    /// Give the object's arena its own ancestry mutex
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Host-side finalizer, run exactly once when the object is torn down
    pub fn on_finalize<F>(mut self, finalizer: F) -> Self
    where
        F: FnOnce(CleanupMode) + Send + 'static,
    {
        self.finalizer = Some(Box::new(finalizer));
        self
    }
}

impl std::fmt::Debug for ObjectInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectInit")
            .field("host", &self.host.is_some())
            .field("parent", &self.parent)
            .field("exclusive", &self.exclusive)
            .field("finalizer", &self.finalizer.is_some())
            .finish()
    }
}
