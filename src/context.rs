// glspace/src/context.rs
//
//! OpenGL contexts and their lifecycle.
//!
//! A context is created from a `Config`, is bound to one object space for its whole life, may be
//! made current on at most one thread at a time, and must be destroyed explicitly.

use crate::config::Config;
use crate::connection::ConnectionInner;
use crate::error::{Error, WindowingApiError};
use crate::object_space::ObjectSpace;
use crate::platform::{NativeContext, ObjectKind};
use crate::registry::{self, RegistryID};

use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::{self, ThreadId};

/// A unique identifier for a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextID(pub u64);

/// Serializes context creation and hands out context IDs.
pub(crate) static CREATE_CONTEXT_MUTEX: Mutex<ContextID> = Mutex::new(ContextID(0));

/// A handle to an OpenGL context.
///
/// Handles are cheap to clone; clones refer to the same context. Contexts must be destroyed
/// explicitly with `destroy`; dropping the last handle to a live context panics.
#[derive(Clone)]
pub struct Context {
    pub(crate) inner: Arc<ContextInner>,
}

pub(crate) struct ContextInner {
    id: ContextID,
    config: Config,
    space: ObjectSpace,
    native: NativeContext,
    pub(crate) registry: RegistryID,
    connection: Weak<ConnectionInner>,
    shadow: bool,
    state: Mutex<ContextState>,
}

struct ContextState {
    destroyed: bool,
    current_thread: Option<ThreadId>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        let destroyed = match self.state.get_mut() {
            Ok(state) => state.destroyed,
            Err(poisoned) => poisoned.into_inner().destroyed,
        };
        if !destroyed && !thread::panicking() {
            panic!("Contexts must be destroyed explicitly with `Context::destroy`!")
        }
    }
}

impl ContextInner {
    fn lock_state(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.lock_state().destroyed
    }
}

impl Context {
    pub(crate) fn new(
        connection: &Arc<ConnectionInner>,
        config: &Config,
        share_with: Option<&Context>,
        shadow: bool,
    ) -> Result<Context, Error> {
        let display = config.screen().display();

        let (space, native_share) = match share_with {
            None => (ObjectSpace::new(), None),
            Some(share) => {
                if share.is_destroyed() || !share.config().screen().display().ptr_eq(display) {
                    return Err(Error::IncompatibleSharedContext);
                }
                (share.object_space().clone(), Some(share.native_context()))
            }
        };
        // Fails only if the share context was destroyed after the check above.
        space.acquire().map_err(|_| Error::IncompatibleSharedContext)?;

        // Take a lock.
        let mut next_context_id =
            CREATE_CONTEXT_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let native = match display.platform().create_native_context(
            display.native_display(),
            config.native_config(),
            native_share,
            config.context_attributes(),
        ) {
            Ok(native) => native,
            Err(err) => {
                drop(next_context_id);
                space.release();
                return Err(err);
            }
        };
        let id = *next_context_id;
        next_context_id.0 += 1;
        drop(next_context_id);

        if share_with.is_none() {
            space.set_creator(id);
        }

        let context = Context {
            inner: Arc::new(ContextInner {
                id,
                config: config.clone(),
                space,
                native,
                registry: connection.registry.id(),
                connection: Arc::downgrade(connection),
                shadow,
                state: Mutex::new(ContextState { destroyed: false, current_thread: None }),
            }),
        };
        if !shadow {
            connection.registry.register(&context);
        }

        log::debug!(
            "Created {}context {:?} in object space {:?} ({} live context(s))",
            if shadow { "shadow " } else { "" },
            id,
            context.inner.space.id(),
            context.inner.space.live_contexts()
        );
        Ok(context)
    }

    #[inline]
    pub(crate) fn from_inner(inner: Arc<ContextInner>) -> Context {
        Context { inner }
    }

    /// Returns the unique ID of this context.
    #[inline]
    pub fn id(&self) -> ContextID {
        self.inner.id
    }

    /// Returns the config this context was created with.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the object space this context is bound to.
    #[inline]
    pub fn object_space(&self) -> &ObjectSpace {
        &self.inner.space
    }

    /// Returns the platform's handle to this context.
    #[inline]
    pub fn native_context(&self) -> NativeContext {
        self.inner.native
    }

    /// Returns true if this is the registry's hidden shadow context.
    #[inline]
    pub fn is_shadow(&self) -> bool {
        self.inner.shadow
    }

    /// Returns true once `destroy` has succeeded.
    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    /// Returns true if this context is current on the calling thread.
    pub fn is_current(&self) -> bool {
        let state = self.inner.lock_state();
        !state.destroyed && state.current_thread == Some(thread::current().id())
    }

    /// Returns true if both handles refer to the same context.
    #[inline]
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Makes this context current on the calling thread.
    ///
    /// Any other context current on this thread stops being current; nothing else happens to
    /// it. Objects whose deletion was deferred in this context's object space are deleted now.
    ///
    /// Fails with `MakeCurrentFailed(BadAccess)` if the context is current on another thread and
    /// with `MakeCurrentFailed(BadContext)` if it has been destroyed.
    pub fn make_current(&self) -> Result<(), Error> {
        let this_thread = thread::current().id();
        let display = self.inner.config.screen().display();
        {
            let mut state = self.inner.lock_state();
            if state.destroyed {
                return Err(Error::MakeCurrentFailed(WindowingApiError::BadContext));
            }
            match state.current_thread {
                Some(owner) if owner != this_thread => {
                    return Err(Error::MakeCurrentFailed(WindowingApiError::BadAccess));
                }
                _ => {}
            }
            display
                .platform()
                .make_native_context_current(display.native_display(), Some(self.inner.native))?;
            state.current_thread = Some(this_thread);
        }

        if let Some(previous) = registry::replace_current(Some(Arc::downgrade(&self.inner))) {
            if !Arc::ptr_eq(&previous, &self.inner) {
                let mut state = previous.lock_state();
                if state.current_thread == Some(this_thread) {
                    state.current_thread = None;
                }
            }
        }

        self.delete_doomed_objects()
    }

    /// Makes no context current on the calling thread, if this context is current on it.
    pub fn release_current(&self) -> Result<(), Error> {
        let this_thread = thread::current().id();
        let display = self.inner.config.screen().display();
        let mut state = self.inner.lock_state();
        if state.destroyed || state.current_thread != Some(this_thread) {
            return Ok(());
        }
        display.platform().make_native_context_current(display.native_display(), None)?;
        state.current_thread = None;
        registry::clear_current(&self.inner);
        Ok(())
    }

    /// Deletes objects from this context's object space.
    ///
    /// If this context is current on the calling thread the objects are deleted immediately.
    /// Otherwise deletion is deferred until a context bound to the same object space is next
    /// made current.
    pub fn delete_objects(&self, kind: ObjectKind, names: &[u32]) -> Result<(), Error> {
        if names.is_empty() {
            return Ok(());
        }
        if self.is_current() {
            let display = self.inner.config.screen().display();
            return display.platform().delete_objects(
                display.native_display(),
                self.inner.native,
                kind,
                names,
            );
        }

        log::trace!("Deferring deletion of {} {:?} object(s)", names.len(), kind);
        for &name in names {
            self.inner.space.doom_object(kind, name);
        }
        Ok(())
    }

    fn delete_doomed_objects(&self) -> Result<(), Error> {
        let display = self.inner.config.screen().display();
        for (kind, names) in self.inner.space.take_doomed_objects() {
            display.platform().delete_objects(
                display.native_display(),
                self.inner.native,
                kind,
                &names,
            )?;
        }
        Ok(())
    }

    /// Destroys this context and releases its object space.
    ///
    /// The object space is destroyed with it if this was the last context bound to the space.
    /// If the context is current on some thread, that thread is left with no current context.
    /// Destroying a destroyed context does nothing.
    pub fn destroy(&self) -> Result<(), Error> {
        let this_thread = thread::current().id();
        let display = self.inner.config.screen().display();
        {
            let mut state = self.inner.lock_state();
            if state.destroyed {
                return Ok(());
            }
            if state.current_thread == Some(this_thread) {
                display.platform().make_native_context_current(display.native_display(), None)?;
                registry::clear_current(&self.inner);
            }
            display
                .platform()
                .destroy_native_context(display.native_display(), self.inner.native)?;
            state.destroyed = true;
            state.current_thread = None;
        }

        if let Some(connection) = self.inner.connection.upgrade() {
            connection.registry.unregister(&self.inner);
        }
        log::debug!("Destroyed context {:?}", self.inner.id);
        self.inner.space.release();
        Ok(())
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Context) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("native", &self.inner.native)
            .field("object_space", &self.inner.space.id())
            .field("shadow", &self.inner.shadow)
            .finish()
    }
}
