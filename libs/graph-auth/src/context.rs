use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;

/// Handle to the host environment a request is made on behalf of.
///
/// In practice this names the signed-in session (account, profile, window)
/// the authentication service keys its tokens by. The host owns it; the
/// credential machinery only keeps weak references.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HostContext {
    id: Arc<str>,
}

impl HostContext {
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self { id: id.into() }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostContext").field(&self.id).finish()
    }
}

/// Shared, re-bindable weak reference to the current [`HostContext`].
///
/// Binding is last-writer-wins; a concurrent [`current`](Self::current)
/// observes either the old or the new context, never a mix. Clones share
/// the same slot.
#[derive(Clone)]
pub struct ContextSlot {
    current: Arc<ArcSwap<Weak<HostContext>>>,
}

impl ContextSlot {
    /// Create an unbound slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(Weak::new())),
        }
    }

    /// Point the slot at `context`, replacing whatever was bound before.
    pub fn bind(&self, context: &Arc<HostContext>) {
        self.current.store(Arc::new(Arc::downgrade(context)));
    }

    /// The bound context, if one is bound and the host still holds it.
    #[must_use]
    pub fn current(&self) -> Option<Arc<HostContext>> {
        self.current.load().upgrade()
    }
}

impl Default for ContextSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextSlot")
            .field("current", &self.current())
            .finish()
    }
}
