// glspace/src/platform/unix/x11/ffi.rs
//
//! GLX tokens used for config enumeration and context creation.

use std::os::raw::c_int;

// Return codes of `glXGetConfig` and `glXGetFBConfigAttrib`.
pub(crate) const GLX_BAD_SCREEN:       c_int = 1;
pub(crate) const GLX_BAD_ATTRIBUTE:    c_int = 2;
pub(crate) const GLX_NO_EXTENSION:     c_int = 3;
pub(crate) const GLX_BAD_VISUAL:       c_int = 4;
pub(crate) const GLX_BAD_CONTEXT:      c_int = 5;
pub(crate) const GLX_BAD_VALUE:        c_int = 6;
pub(crate) const GLX_BAD_ENUM:         c_int = 7;

pub(crate) const GLX_BUFFER_SIZE:      c_int = 2;
pub(crate) const GLX_LEVEL:            c_int = 3;
pub(crate) const GLX_DOUBLEBUFFER:     c_int = 5;
pub(crate) const GLX_STEREO:           c_int = 6;
pub(crate) const GLX_AUX_BUFFERS:      c_int = 7;
pub(crate) const GLX_RED_SIZE:         c_int = 8;
pub(crate) const GLX_GREEN_SIZE:       c_int = 9;
pub(crate) const GLX_BLUE_SIZE:        c_int = 10;
pub(crate) const GLX_ALPHA_SIZE:       c_int = 11;
pub(crate) const GLX_DEPTH_SIZE:       c_int = 12;
pub(crate) const GLX_STENCIL_SIZE:     c_int = 13;
pub(crate) const GLX_ACCUM_RED_SIZE:   c_int = 14;
pub(crate) const GLX_ACCUM_GREEN_SIZE: c_int = 15;
pub(crate) const GLX_ACCUM_BLUE_SIZE:  c_int = 16;
pub(crate) const GLX_ACCUM_ALPHA_SIZE: c_int = 17;

pub(crate) const GLX_TRANSPARENT_TYPE: c_int = 0x23;
pub(crate) const GLX_NONE:             c_int = 0x8000;
pub(crate) const GLX_DRAWABLE_TYPE:    c_int = 0x8010;
pub(crate) const GLX_RENDER_TYPE:      c_int = 0x8011;
pub(crate) const GLX_FBCONFIG_ID:      c_int = 0x8013;
pub(crate) const GLX_RGBA_TYPE:        c_int = 0x8014;
pub(crate) const GLX_WINDOW_BIT:       c_int = 0x0001;
pub(crate) const GLX_RGBA_BIT:         c_int = 0x0001;

pub(crate) const GLX_SAMPLE_BUFFERS:   c_int = 100000;
pub(crate) const GLX_SAMPLES:          c_int = 100001;

pub(crate) const GLX_CONTEXT_MAJOR_VERSION_ARB: c_int = 0x2091;
pub(crate) const GLX_CONTEXT_MINOR_VERSION_ARB: c_int = 0x2092;
pub(crate) const GLX_CONTEXT_FLAGS_ARB:         c_int = 0x2094;
pub(crate) const GLX_CONTEXT_PROFILE_MASK_ARB:  c_int = 0x9126;

pub(crate) const GLX_CONTEXT_DEBUG_BIT_ARB:              c_int = 0x0001;
pub(crate) const GLX_CONTEXT_FORWARD_COMPATIBLE_BIT_ARB: c_int = 0x0002;

pub(crate) const GLX_CONTEXT_CORE_PROFILE_BIT_ARB:          c_int = 1;
pub(crate) const GLX_CONTEXT_COMPATIBILITY_PROFILE_BIT_ARB: c_int = 2;

