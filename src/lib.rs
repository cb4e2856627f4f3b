// glspace/src/lib.rs
//
//! OpenGL configuration matching and context lifecycle management.
//!
//! Applications describe the framebuffer they want with a `Template`, ask a `Screen` for the
//! concrete `Config`s that satisfy it, and create `Context`s from those configs. Every context is
//! bound to an `ObjectSpace`, the set of textures, buffers, shaders, programs and display lists it
//! can see. Contexts created with a share context join its object space, and the space lives
//! until the last of its contexts is destroyed.
//!
//! Backends implement the `platform::Platform` trait. An in-memory backend is always available;
//! the GLX backend is enabled with the `sm-x11` feature.

pub mod error;
pub use crate::error::{Error, WindowingApiError};

mod attributes;
pub use crate::attributes::{Attribute, AttributeKind, AttributeMask, ColorMode};
pub use crate::attributes::{ConfigAttributes, Template, COLOR_MODE, LEVEL};

mod config;
pub use crate::config::Config;

mod connection;
pub use crate::connection::Connection;

mod context;
pub use crate::context::{Context, ContextID};

mod display;
pub use crate::display::{Display, Screen};

mod info;
pub use crate::info::{ContextAttributeFlags, ContextAttributes, GLVersion};

pub mod matcher;

mod object_space;
pub use crate::object_space::{ObjectSpace, ObjectSpaceID, RESERVED_KEY_PREFIX};

pub mod platform;
pub use crate::platform::ObjectKind;

mod registry;
pub use crate::registry::{ContextRegistry, RegistryID};

#[cfg(test)]
mod tests;
