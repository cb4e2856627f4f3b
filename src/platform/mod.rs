// glspace/src/platform/mod.rs
//
//! The boundary between the portable model and platform backends.
//!
//! A backend is a data source: it opens displays, reports screens and the concrete
//! configurations available on each, and creates and destroys native contexts. Its results are
//! trusted as-is.

use crate::attributes::ConfigAttributes;
use crate::error::Error;
use crate::info::ContextAttributes;

use euclid::default::Rect;

pub mod generic;

#[cfg(linux)]
pub mod unix;

/// An opaque handle to an open native display connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeDisplay(pub usize);

/// An opaque handle to a native configuration (e.g. a `GLXFBConfig` or a pixel format number).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeConfig(pub usize);

/// An opaque handle to a native context (e.g. a `GLXContext` or an `HGLRC`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeContext(pub usize);

/// What a platform reports about one screen of a display.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenInfo {
    /// The screen's position and size in the display's coordinate space.
    pub rect: Rect<i32>,
    /// Platform-specific data, if the platform has any.
    pub extension: Option<ScreenExtension>,
}

/// Platform-specific data attached to a screen.
#[derive(Clone, Debug, PartialEq)]
pub enum ScreenExtension {
    /// An X11 screen.
    X11 {
        /// The Xlib screen number.
        screen_number: i32,
        /// The XID of the screen's root window.
        root_window: u64,
    },
}

/// One concrete configuration reported by a platform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NativeConfigInfo {
    /// The platform's handle to the configuration.
    pub native: NativeConfig,
    /// The attributes of the configuration.
    pub attributes: ConfigAttributes,
}

impl AsRef<ConfigAttributes> for NativeConfigInfo {
    #[inline]
    fn as_ref(&self) -> &ConfigAttributes {
        &self.attributes
    }
}

/// The kinds of shareable GL objects that can be queued for deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    /// Texture objects (`glDeleteTextures`).
    Texture,
    /// Buffer objects (`glDeleteBuffers`).
    Buffer,
    /// Shader objects (`glDeleteShader`).
    Shader,
    /// Program objects (`glDeleteProgram`).
    Program,
    /// Display lists (`glDeleteLists`).
    DisplayList,
}

/// A windowing system backend.
///
/// Implementations must be usable from any thread. Calls that take a context are made by the
/// thread that has it current, or is about to.
pub trait Platform: Send + Sync {
    /// The display name used when the caller doesn't supply one.
    fn default_display_name(&self) -> String;

    /// Opens a connection to the named display.
    fn open_display(&self, name: &str) -> Result<NativeDisplay, Error>;

    /// Closes a display connection opened with `open_display`.
    fn close_display(&self, display: NativeDisplay);

    /// Reports the screens attached to a display.
    fn enumerate_screens(&self, display: NativeDisplay) -> Result<Vec<ScreenInfo>, Error>;

    /// Reports the configurations available on a screen, in the platform's preference order.
    ///
    /// The result is finite and, on a functioning display, never empty. Repeated calls on the
    /// same screen state return an equivalent sequence.
    fn enumerate_configs(
        &self,
        display: NativeDisplay,
        screen_index: usize,
    ) -> Result<Vec<NativeConfigInfo>, Error>;

    /// Creates a native context for a configuration, sharing objects with `share` if given.
    fn create_native_context(
        &self,
        display: NativeDisplay,
        config: NativeConfig,
        share: Option<NativeContext>,
        attributes: &ContextAttributes,
    ) -> Result<NativeContext, Error>;

    /// Destroys a native context.
    fn destroy_native_context(
        &self,
        display: NativeDisplay,
        context: NativeContext,
    ) -> Result<(), Error>;

    /// Makes the native context current on the calling thread, or clears the current context.
    fn make_native_context_current(
        &self,
        display: NativeDisplay,
        context: Option<NativeContext>,
    ) -> Result<(), Error>;

    /// Deletes GL objects. The context is current on the calling thread.
    ///
    /// The default implementation only logs; backends without GL access rely on the objects
    /// being released together with their last context.
    fn delete_objects(
        &self,
        _display: NativeDisplay,
        context: NativeContext,
        kind: ObjectKind,
        names: &[u32],
    ) -> Result<(), Error> {
        log::debug!("Not deleting {} {:?} objects in {:?}", names.len(), kind, context);
        Ok(())
    }
}
