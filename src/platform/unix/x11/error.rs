// glspace/src/platform/unix/x11/error.rs
//
//! Translation of X11 errors to `glspace` errors.

use super::ffi::{GLX_BAD_ATTRIBUTE, GLX_BAD_CONTEXT, GLX_BAD_ENUM, GLX_BAD_SCREEN};
use super::ffi::{GLX_BAD_VALUE, GLX_BAD_VISUAL, GLX_NO_EXTENSION};
use crate::WindowingApiError;

use std::os::raw::{c_char, c_int};
use x11_dl::xlib::{Display, Xlib};

// Core protocol error codes from `X.h`.
const SUCCESS: u8 = 0;
const BAD_VALUE: u8 = 2;
const BAD_MATCH: u8 = 8;
const BAD_ACCESS: u8 = 10;
const BAD_ALLOC: u8 = 11;

pub(crate) fn glx_error_to_windowing_api_error(glx_error: c_int) -> WindowingApiError {
    match glx_error {
        GLX_BAD_SCREEN => WindowingApiError::BadScreen,
        GLX_BAD_ATTRIBUTE => WindowingApiError::BadAttribute,
        GLX_NO_EXTENSION => WindowingApiError::NoExtension,
        GLX_BAD_VISUAL => WindowingApiError::BadVisual,
        GLX_BAD_CONTEXT => WindowingApiError::BadContext,
        GLX_BAD_VALUE => WindowingApiError::BadValue,
        GLX_BAD_ENUM => WindowingApiError::BadEnumeration,
        _ => WindowingApiError::Failed,
    }
}

pub(crate) fn xlib_error_to_windowing_api_error(
    xlib: &Xlib,
    display: *mut Display,
    xlib_error: u8,
) -> WindowingApiError {
    match xlib_error {
        SUCCESS => return WindowingApiError::Failed,
        BAD_VALUE => return WindowingApiError::BadValue,
        BAD_MATCH => return WindowingApiError::BadMatch,
        BAD_ACCESS => return WindowingApiError::BadAccess,
        BAD_ALLOC => return WindowingApiError::BadAlloc,
        _ => {}
    }

    // Extension errors have dynamically assigned codes, so go by name.
    unsafe {
        let mut error_text: Vec<u8> = vec![0; 256];
        (xlib.XGetErrorText)(
            display,
            xlib_error as c_int,
            error_text.as_mut_ptr() as *mut c_char,
            error_text.len() as c_int - 1,
        );
        if error_text.starts_with(b"GLXBadFBConfig\0") {
            WindowingApiError::BadPixelFormat
        } else if error_text.starts_with(b"GLXBadContext\0") {
            WindowingApiError::BadContext
        } else {
            WindowingApiError::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::glx_error_to_windowing_api_error;
    use crate::WindowingApiError;

    #[test]
    fn test_glx_return_codes() {
        let expected = [
            WindowingApiError::BadScreen,
            WindowingApiError::BadAttribute,
            WindowingApiError::NoExtension,
            WindowingApiError::BadVisual,
            WindowingApiError::BadContext,
            WindowingApiError::BadValue,
            WindowingApiError::BadEnumeration,
        ];
        for (code, error) in (1..).zip(expected) {
            assert_eq!(glx_error_to_windowing_api_error(code), error);
        }
        assert_eq!(glx_error_to_windowing_api_error(8), WindowingApiError::Failed);
        assert_eq!(glx_error_to_windowing_api_error(-1), WindowingApiError::Failed);
    }
}
