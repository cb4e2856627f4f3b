// glspace/src/object_space.rs
//
//! Reference-counted sets of shareable GPU objects.
//!
//! Every context is bound to exactly one object space. Contexts created with a share context
//! join its space; the space (and every texture, buffer, shader, program and display list in it)
//! stays valid for as long as at least one of those contexts is alive, no matter which context
//! created the objects.

use crate::context::ContextID;
use crate::error::Error;
use crate::platform::ObjectKind;

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Debug, Formatter};
use std::mem;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Annotation keys beginning with this prefix belong to `glspace` and must not be written by
/// callers.
pub const RESERVED_KEY_PREFIX: &str = "glspace.";

const CREATOR_KEY: &str = "glspace.creator";

// Set in the live-context count once the space has been destroyed.
const DESTROYED: usize = 1 << (usize::BITS - 1);

static NEXT_OBJECT_SPACE_ID: AtomicU64 = AtomicU64::new(1);

type Annotation = Arc<dyn Any + Send + Sync>;
type DestroyListener = Box<dyn FnOnce(ObjectSpaceID) + Send>;

/// A unique identifier for an object space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectSpaceID(pub u64);

/// A handle to a reference-counted set of shareable GPU objects.
///
/// Handles are cheap to clone; clones refer to the same space. Holding a handle does not keep
/// the space alive. Only contexts (through `acquire` and `release`) do.
#[derive(Clone)]
pub struct ObjectSpace {
    inner: Arc<ObjectSpaceInner>,
}

struct ObjectSpaceInner {
    id: ObjectSpaceID,
    count: AtomicUsize,
    annotations: Mutex<HashMap<String, Annotation>>,
    doomed: Mutex<BTreeMap<ObjectKind, Vec<u32>>>,
    listeners: Mutex<Vec<DestroyListener>>,
}

impl Default for ObjectSpace {
    fn default() -> ObjectSpace {
        ObjectSpace::new()
    }
}

impl ObjectSpace {
    /// Creates a new space with no live contexts.
    pub fn new() -> ObjectSpace {
        let id = ObjectSpaceID(NEXT_OBJECT_SPACE_ID.fetch_add(1, Ordering::Relaxed));
        ObjectSpace {
            inner: Arc::new(ObjectSpaceInner {
                id,
                count: AtomicUsize::new(0),
                annotations: Mutex::new(HashMap::new()),
                doomed: Mutex::new(BTreeMap::new()),
                listeners: Mutex::new(vec![]),
            }),
        }
    }

    /// Returns the unique identifier of this space.
    #[inline]
    pub fn id(&self) -> ObjectSpaceID {
        self.inner.id
    }

    /// Returns the number of live contexts bound to this space.
    #[inline]
    pub fn live_contexts(&self) -> usize {
        self.inner.count.load(Ordering::Acquire) & !DESTROYED
    }

    /// Returns true once the last context bound to this space has been released.
    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.inner.count.load(Ordering::Acquire) & DESTROYED != 0
    }

    /// Returns true if both handles refer to the same space.
    #[inline]
    pub fn ptr_eq(&self, other: &ObjectSpace) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Records one more live context bound to this space.
    ///
    /// Contexts call this exactly once, when they are created. Fails with
    /// `Error::ObjectSpaceDestroyed` if the space has already been destroyed.
    pub fn acquire(&self) -> Result<(), Error> {
        let mut current = self.inner.count.load(Ordering::Acquire);
        loop {
            if current & DESTROYED != 0 {
                return Err(Error::ObjectSpaceDestroyed);
            }
            match self.inner.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Records that a context bound to this space has been destroyed.
    ///
    /// Contexts call this exactly once, when they are destroyed. When the last context is
    /// released the space is destroyed: annotations and pending deletions are discarded and the
    /// destruction listeners run.
    ///
    /// # Panics
    ///
    /// Panics if the space has no live contexts, since that means some context released it
    /// twice.
    pub fn release(&self) {
        let mut current = self.inner.count.load(Ordering::Acquire);
        loop {
            assert!(
                current & DESTROYED == 0,
                "Object space {:?} was released after it was destroyed!",
                self.inner.id
            );
            assert!(
                current != 0,
                "Object space {:?} was released more times than it was acquired!",
                self.inner.id
            );
            let next = if current == 1 { DESTROYED } else { current - 1 };
            match self.inner.count.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if current == 1 {
            self.destroy();
        }
    }

    fn destroy(&self) {
        log::debug!("Destroying object space {:?}", self.inner.id);
        lock(&self.inner.annotations).clear();
        let doomed = mem::take(&mut *lock(&self.inner.doomed));
        if !doomed.is_empty() {
            log::debug!(
                "Dropping {} pending deletions with object space {:?}",
                doomed.values().map(Vec::len).sum::<usize>(),
                self.inner.id
            );
        }
        let listeners = mem::take(&mut *lock(&self.inner.listeners));
        for listener in listeners {
            listener(self.inner.id);
        }
    }

    /// Registers a function to run when this space is destroyed.
    ///
    /// If the space has already been destroyed the function runs immediately.
    pub fn on_destroy<F>(&self, listener: F)
    where
        F: FnOnce(ObjectSpaceID) + Send + 'static,
    {
        let mut listeners = lock(&self.inner.listeners);
        if self.is_destroyed() {
            drop(listeners);
            listener(self.inner.id);
        } else {
            listeners.push(Box::new(listener));
        }
    }

    /// Stores an annotation on this space, replacing any previous value for the key.
    ///
    /// Annotations live exactly as long as the space, so they can record e.g. that a set of
    /// textures has already been uploaded and survives the re-creation of individual contexts.
    ///
    /// Keys beginning with `RESERVED_KEY_PREFIX` are reserved. Writing one is a programming
    /// error: debug builds panic, release builds log a warning and return
    /// `Error::ReservedAnnotationKey` without touching the reserved entry.
    pub fn set_annotation<T>(&self, key: &str, value: T) -> Result<(), Error>
    where
        T: Any + Send + Sync,
    {
        check_caller_key(key)?;
        self.insert_annotation(key, Arc::new(value))
    }

    /// Returns the annotation stored under the key, if there is one of type `T`.
    pub fn annotation<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let annotation = lock(&self.inner.annotations).get(key).cloned()?;
        annotation.downcast::<T>().ok()
    }

    /// Returns true if an annotation of any type is stored under the key.
    pub fn has_annotation(&self, key: &str) -> bool {
        lock(&self.inner.annotations).contains_key(key)
    }

    /// Removes the annotation stored under the key. Returns true if there was one.
    ///
    /// Reserved keys are treated as in `set_annotation`.
    pub fn remove_annotation(&self, key: &str) -> Result<bool, Error> {
        check_caller_key(key)?;
        Ok(lock(&self.inner.annotations).remove(key).is_some())
    }

    /// Returns the context that created this space, if it was created by a context.
    pub fn creator(&self) -> Option<ContextID> {
        self.annotation::<ContextID>(CREATOR_KEY).map(|id| *id)
    }

    pub(crate) fn set_creator(&self, id: ContextID) {
        if self.insert_annotation(CREATOR_KEY, Arc::new(id)).is_err() {
            log::warn!("Object space {:?} was destroyed before {:?} could own it", self.id(), id);
        }
    }

    fn insert_annotation(&self, key: &str, value: Annotation) -> Result<(), Error> {
        let mut annotations = lock(&self.inner.annotations);
        // Checked under the lock so that nothing is stored after destruction cleared the map.
        if self.is_destroyed() {
            return Err(Error::ObjectSpaceDestroyed);
        }
        annotations.insert(key.to_owned(), value);
        Ok(())
    }

    /// Queues an object for deletion the next time a context bound to this space is current.
    pub fn doom_object(&self, kind: ObjectKind, name: u32) {
        if self.is_destroyed() {
            return;
        }
        lock(&self.inner.doomed).entry(kind).or_default().push(name);
    }

    /// Returns the number of objects queued for deletion.
    pub fn doomed_object_count(&self) -> usize {
        lock(&self.inner.doomed).values().map(Vec::len).sum()
    }

    /// Removes and returns every object queued for deletion, grouped by kind.
    pub fn take_doomed_objects(&self) -> Vec<(ObjectKind, Vec<u32>)> {
        mem::take(&mut *lock(&self.inner.doomed)).into_iter().collect()
    }
}

impl Debug for ObjectSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSpace")
            .field("id", &self.inner.id)
            .field("live_contexts", &self.live_contexts())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

fn check_caller_key(key: &str) -> Result<(), Error> {
    if !key.starts_with(RESERVED_KEY_PREFIX) {
        return Ok(());
    }
    if cfg!(debug_assertions) {
        panic!("Annotation key `{}` is reserved for glspace!", key);
    }
    log::warn!("Ignoring write to reserved annotation key `{}`", key);
    Err(Error::ReservedAnnotationKey)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
