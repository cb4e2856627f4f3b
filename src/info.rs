// glspace/src/info.rs
//
//! OpenGL version and context-creation information.

use bitflags::bitflags;
use std::fmt::{self, Display, Formatter};

/// Describes the OpenGL version that is requested when a context is created.
///
/// Versions compare by major number first, then minor number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GLVersion {
    /// The major OpenGL version (e.g. 4 in 4.2).
    pub major: u8,
    /// The minor OpenGL version (e.g. 2 in 4.2).
    pub minor: u8,
}

impl GLVersion {
    /// Creates a GL version structure with the given major and minor version numbers.
    #[inline]
    pub fn new(major: u8, minor: u8) -> GLVersion {
        GLVersion { major, minor }
    }
}

impl Display for GLVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

bitflags! {
    /// Flags that affect how the native context is created.
    ///
    /// These don't take part in config matching.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ContextAttributeFlags: u8 {
        /// Request a forward-compatible context (deprecated functionality removed).
        const FORWARD_COMPATIBLE = 0x01;
        /// Request a debug context.
        const DEBUG              = 0x02;
    }
}

/// Context-creation attributes that travel from a template to the configs resolved from it, and
/// from there to the platform when a native context is created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContextAttributes {
    /// The minimum GL version to request. `None` lets the platform pick.
    pub version: Option<GLVersion>,
    /// Additional creation flags.
    pub flags: ContextAttributeFlags,
}

impl ContextAttributes {
    /// Returns true if a legacy context (no version, no flags) satisfies these attributes.
    #[inline]
    pub fn is_legacy(&self) -> bool {
        self.version.is_none() && self.flags.is_empty()
    }
}
