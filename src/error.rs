// glspace/src/error.rs
//
//! Various errors that methods can produce.

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

/// Various errors that methods can produce.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Error {
    /// The method failed for a miscellaneous reason.
    Failed,
    /// The platform doesn't support this method.
    UnsupportedOnThisPlatform,
    /// The system doesn't support the requested OpenGL API version.
    UnsupportedGLVersion,
    /// No configuration in the screen's catalog meets or exceeds every attribute requested by the
    /// template.
    ///
    /// Callers typically retry with a more relaxed template; see `Screen::best_config_from()`.
    NoSuchConfig,
    /// A context was requested from a config that the platform did not report (or no longer
    /// reports) for its screen.
    UnresolvedConfig,
    /// The platform couldn't enumerate the configurations of a screen.
    ConfigEnumerationFailed(WindowingApiError),
    /// The system couldn't create an OpenGL context.
    ContextCreationFailed(WindowingApiError),
    /// The system couldn't destroy the OpenGL context.
    ContextDestructionFailed(WindowingApiError),
    /// The system couldn't make the OpenGL context current or not current.
    MakeCurrentFailed(WindowingApiError),
    /// The system OpenGL library couldn't be located.
    NoGLLibraryFound,
    /// A connection to the display server could not be opened.
    ConnectionFailed,
    /// The connection that owned this display or context has been dropped.
    ConnectionClosed,
    /// The display has no screens.
    NoScreens,
    /// The shared context is not compatible for sharing: it was destroyed, or it lives on a
    /// different display.
    IncompatibleSharedContext,
    /// The object space was destroyed before it could be acquired.
    ObjectSpaceDestroyed,
    /// An annotation key beginning with `RESERVED_KEY_PREFIX` was written by a caller.
    ReservedAnnotationKey,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Failed => f.write_str("the operation failed"),
            Error::UnsupportedOnThisPlatform => f.write_str("unsupported on this platform"),
            Error::UnsupportedGLVersion => f.write_str("the requested GL version is unsupported"),
            Error::NoSuchConfig => f.write_str("no config satisfies the template"),
            Error::UnresolvedConfig => {
                f.write_str("the config was not reported by the platform for its screen")
            }
            Error::ConfigEnumerationFailed(err) => {
                write!(f, "config enumeration failed: {:?}", err)
            }
            Error::ContextCreationFailed(err) => write!(f, "context creation failed: {:?}", err),
            Error::ContextDestructionFailed(err) => {
                write!(f, "context destruction failed: {:?}", err)
            }
            Error::MakeCurrentFailed(err) => write!(f, "make current failed: {:?}", err),
            Error::NoGLLibraryFound => f.write_str("the system GL library couldn't be found"),
            Error::ConnectionFailed => f.write_str("couldn't connect to the display server"),
            Error::ConnectionClosed => f.write_str("the owning connection was dropped"),
            Error::NoScreens => f.write_str("the display has no screens"),
            Error::IncompatibleSharedContext => f.write_str("the share context is incompatible"),
            Error::ObjectSpaceDestroyed => f.write_str("the object space was destroyed"),
            Error::ReservedAnnotationKey => f.write_str("the annotation key is reserved"),
        }
    }
}

impl StdError for Error {}

/// Abstraction of the errors that GLX, WGL, CGL, etc. return.
///
/// They all tend to follow similar patterns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowingApiError {
    /// Miscellaneous error.
    Failed,
    /// CGL: Invalid pixel format attribute.
    /// X11: Attribute to get is bad.
    BadAttribute,
    /// CGL: Invalid pixel format object.
    /// X11: Invalid framebuffer configuration, including an unsupported OpenGL version.
    BadPixelFormat,
    /// CGL: Invalid context object.
    /// X11: The context is invalid.
    BadContext,
    /// CGL: Invalid display.
    BadDisplay,
    /// CGL: Invalid numerical value.
    /// X11: Invalid value.
    BadValue,
    /// CGL: Invalid share context.
    /// X11: The share context or drawable doesn't match the config.
    BadMatch,
    /// CGL: Invalid enumerant (constant).
    /// X11: Invalid enum value.
    BadEnumeration,
    /// CGL: Invalid memory allocation.
    BadAlloc,
    /// The context is already current on another thread.
    BadAccess,
    /// X11: Screen number is bad.
    BadScreen,
    /// X11: The GLX extension is unavailable on the server.
    NoExtension,
    /// X11: Visual number not known by GLX.
    BadVisual,
}
