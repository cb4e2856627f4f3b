// glspace/src/platform/unix/mod.rs
//
//! Backends specific to Unix-like systems, particularly Linux.

#[cfg(x11)]
pub mod x11;
