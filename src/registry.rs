// glspace/src/registry.rs
//
//! Tracks the live contexts of a connection.
//!
//! The registry answers "which contexts exist", "which context is current on this thread" and
//! "what should a new context share objects with by default". It also owns the shadow contexts:
//! one hidden context per display, created on demand so that there is always something on that
//! display to share with.

use crate::attributes::Template;
use crate::context::{Context, ContextInner};
use crate::display::{Display, Screen};
use crate::error::Error;

use std::cell::RefCell;
use std::fmt::{self, Debug, Formatter};
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_CONTEXT: RefCell<Option<Weak<ContextInner>>> = const { RefCell::new(None) };
}

/// A unique identifier for a context registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegistryID(pub u64);

/// The set of live contexts belonging to one connection.
pub struct ContextRegistry {
    id: RegistryID,
    state: Mutex<RegistryState>,
}

struct RegistryState {
    // In creation order.
    live: Vec<Weak<ContextInner>>,
    default_share: Option<Weak<ContextInner>>,
    // At most one per display.
    shadows: Vec<Context>,
}

impl Default for ContextRegistry {
    fn default() -> ContextRegistry {
        ContextRegistry::new()
    }
}

impl ContextRegistry {
    /// Creates an empty registry.
    pub fn new() -> ContextRegistry {
        ContextRegistry {
            id: RegistryID(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed)),
            state: Mutex::new(RegistryState { live: vec![], default_share: None, shadows: vec![] }),
        }
    }

    #[inline]
    pub fn id(&self) -> RegistryID {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the most recently created context that is still alive.
    ///
    /// The shadow context is never returned.
    pub fn most_recent_context(&self) -> Option<Context> {
        let state = self.lock();
        state
            .live
            .iter()
            .rev()
            .filter_map(Weak::upgrade)
            .find(|inner| !inner.is_destroyed())
            .map(Context::from_inner)
    }

    /// Returns the number of live contexts, not counting the shadow context.
    pub fn live_context_count(&self) -> usize {
        self.lock().live.iter().filter(|context| context.strong_count() > 0).count()
    }

    /// Returns every live context in creation order, not counting the shadow context.
    pub fn live_contexts(&self) -> Vec<Context> {
        self.lock().live.iter().filter_map(Weak::upgrade).map(Context::from_inner).collect()
    }

    /// Overrides the context that new contexts share objects with by default.
    ///
    /// The override lapses when that context is destroyed. Pass `None` to clear it.
    pub fn set_default_share_source(&self, context: Option<&Context>) {
        self.lock().default_share = context.map(|context| Arc::downgrade(&context.inner));
    }

    /// Returns the explicit default share source, if one is set and still alive.
    pub fn default_share_override(&self) -> Option<Context> {
        let state = self.lock();
        state
            .default_share
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|inner| !inner.is_destroyed())
            .map(Context::from_inner)
    }

    /// Returns the shadow context of a display, if it has been created and not destroyed.
    pub fn shadow_context(&self, display: &Display) -> Option<Context> {
        self.lock()
            .shadows
            .iter()
            .find(|shadow| {
                !shadow.is_destroyed() && shadow.config().screen().display().ptr_eq(display)
            })
            .cloned()
    }

    /// Returns the context of this registry that is current on the calling thread.
    pub fn current_context(&self) -> Option<Context> {
        let inner = CURRENT_CONTEXT.with(|slot| slot.borrow().as_ref().and_then(Weak::upgrade))?;
        if inner.registry != self.id {
            return None;
        }
        let context = Context::from_inner(inner);
        if context.is_current() {
            Some(context)
        } else {
            None
        }
    }

    /// Makes no context of this registry current on the calling thread.
    pub fn make_no_context_current(&self) -> Result<(), Error> {
        match self.current_context() {
            Some(context) => context.release_current(),
            None => Ok(()),
        }
    }

    pub(crate) fn register(&self, context: &Context) {
        let mut state = self.lock();
        state.live.retain(|context| context.strong_count() > 0);
        state.live.push(Arc::downgrade(&context.inner));
    }

    pub(crate) fn unregister(&self, inner: &Arc<ContextInner>) {
        let mut state = self.lock();
        let target = Arc::as_ptr(inner);
        state.live.retain(|context| context.strong_count() > 0 && context.as_ptr() != target);
        if state.default_share.as_ref().is_some_and(|share| share.as_ptr() == target) {
            state.default_share = None;
        }
        state.shadows.retain(|shadow| Arc::as_ptr(&shadow.inner) != target);
    }

    /// Picks the context a new context on `screen` should share objects with.
    ///
    /// Only contexts on the screen's display are candidates, so the pick can always be shared
    /// with.
    pub(crate) fn default_share_source(&self, screen: &Screen) -> Result<Context, Error> {
        let display = screen.display();
        if let Some(context) = self.default_share_override() {
            if context.config().screen().display().ptr_eq(display) {
                log::trace!("Sharing with the default share override {:?}", context.id());
                return Ok(context);
            }
        }
        if let Some(context) = self.most_recent_context_on(display) {
            log::trace!("Sharing with the most recent context {:?}", context.id());
            return Ok(context);
        }
        self.ensure_shadow(screen)
    }

    fn most_recent_context_on(&self, display: &Display) -> Option<Context> {
        let state = self.lock();
        state
            .live
            .iter()
            .rev()
            .filter_map(Weak::upgrade)
            .map(Context::from_inner)
            .find(|context| {
                !context.is_destroyed() && context.config().screen().display().ptr_eq(display)
            })
    }

    /// Returns the shadow context of the screen's display, creating it on `screen` if there is
    /// none or the old one was destroyed.
    pub(crate) fn ensure_shadow(&self, screen: &Screen) -> Result<Context, Error> {
        let display = screen.display();
        if let Some(shadow) = self.shadow_context(display) {
            return Ok(shadow);
        }

        let config = match screen.best_config(&Template::window_default()) {
            Err(Error::NoSuchConfig) => screen.best_config(&Template::new())?,
            result => result?,
        };
        let connection = display.connection()?;
        let created = Context::new(&connection, &config, None, true)?;

        let mut state = self.lock();
        state.shadows.retain(|shadow| !shadow.is_destroyed());
        let winner = state
            .shadows
            .iter()
            .find(|shadow| shadow.config().screen().display().ptr_eq(display))
            .cloned();
        match winner {
            Some(winner) => {
                // Another thread got here first.
                drop(state);
                created.destroy()?;
                Ok(winner)
            }
            None => {
                log::debug!("Created shadow context {:?} on `{}`", created.id(), display.name());
                state.shadows.push(created.clone());
                Ok(created)
            }
        }
    }

    pub(crate) fn destroy_shadows(&self) {
        let shadows = mem::take(&mut self.lock().shadows);
        for shadow in shadows {
            if let Err(err) = shadow.destroy() {
                log::error!("Failed to destroy a shadow context: {:?}", err);
                mem::forget(shadow);
            }
        }
    }
}

impl Debug for ContextRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("id", &self.id)
            .field("live_contexts", &self.live_context_count())
            .finish()
    }
}

/// Records `context` as current on the calling thread and returns whatever was current before.
pub(crate) fn replace_current(context: Option<Weak<ContextInner>>) -> Option<Arc<ContextInner>> {
    CURRENT_CONTEXT.with(|slot| mem::replace(&mut *slot.borrow_mut(), context))
        .and_then(|previous| previous.upgrade())
}

/// Clears the calling thread's current context if it is `context`.
pub(crate) fn clear_current(context: &Arc<ContextInner>) {
    CURRENT_CONTEXT.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.as_ref().is_some_and(|current| current.as_ptr() == Arc::as_ptr(context)) {
            *slot = None;
        }
    })
}
