// glspace/src/platform/generic/mod.rs
//
//! Backends that work on every platform.

pub mod headless;
