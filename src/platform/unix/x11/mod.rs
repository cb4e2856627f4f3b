// glspace/src/platform/unix/x11/mod.rs
//
//! Bindings to GLX via Xlib, loaded at runtime with `x11-dl`.

pub mod platform;
pub use self::platform::X11Platform;

mod error;
mod ffi;
