// glspace/src/platform/unix/x11/platform.rs
//
//! A `Platform` backed by a live X server and its GLX implementation.

use super::error;
use super::ffi::*;
use crate::attributes::ConfigAttributes;
use crate::error::{Error, WindowingApiError};
use crate::info::{ContextAttributeFlags, ContextAttributes, GLVersion};
use crate::platform::{NativeConfig, NativeConfigInfo, NativeContext, NativeDisplay};
use crate::platform::{ObjectKind, Platform, ScreenExtension, ScreenInfo};

use euclid::default::{Point2D, Rect, Size2D};
use glow::HasContext;
use std::cell::{Cell, RefCell};
use std::env;
use std::ffi::{c_void, CString};
use std::mem;
use std::num::NonZeroU32;
use std::os::raw::{c_int, c_uint};
use std::ptr;
use std::slice;
use x11_dl::glx::{GLXContext, GLXFBConfig, Glx};
use x11_dl::xlib::{self, Display, XErrorEvent, Xlib};

const DEFAULT_DISPLAY_NAME: &str = ":0";

type GlXCreateContextAttribsARB = unsafe extern "C" fn(
    *mut Display,
    GLXFBConfig,
    GLXContext,
    xlib::Bool,
    *const c_int,
) -> GLXContext;
type GlDeleteLists = unsafe extern "C" fn(c_uint, c_int);

thread_local! {
    static LAST_X_ERROR_CODE: Cell<u8> = const { Cell::new(0) };
}

thread_local! {
    static GL_FUNCTIONS: RefCell<Option<glow::Context>> = const { RefCell::new(None) };
}

/// The X11 backend.
///
/// Configurations are GLX framebuffer configs; a config's native handle is its
/// `GLX_FBCONFIG_ID`. Only RGBA, window-renderable, non-transparent configs in the main plane are
/// reported. Contexts are made current without a drawable.
pub struct X11Platform {
    xlib: Xlib,
    glx: Glx,
}

// Xlib is initialized for threads in `new`.
unsafe impl Send for X11Platform {}
unsafe impl Sync for X11Platform {}

impl X11Platform {
    /// Loads Xlib and GLX.
    pub fn new() -> Result<X11Platform, Error> {
        let xlib = Xlib::open().map_err(|err| {
            log::debug!("Failed to load Xlib: {}", err);
            Error::NoGLLibraryFound
        })?;
        let glx = Glx::open().map_err(|err| {
            log::debug!("Failed to load GLX: {}", err);
            Error::NoGLLibraryFound
        })?;
        unsafe {
            (xlib.XInitThreads)();
        }
        Ok(X11Platform { xlib, glx })
    }

    #[inline]
    fn display_ptr(display: NativeDisplay) -> *mut Display {
        display.0 as *mut Display
    }

    // Runs `f` with an error handler that records the X error it raises, if any.
    unsafe fn trap_errors<T, F>(&self, display: *mut Display, f: F) -> (T, u8)
    where
        F: FnOnce() -> T,
    {
        LAST_X_ERROR_CODE.with(|error_code| error_code.set(0));
        let prev_error_handler = (self.xlib.XSetErrorHandler)(Some(xlib_error_handler));
        let result = f();
        (self.xlib.XSync)(display, xlib::False);
        (self.xlib.XSetErrorHandler)(prev_error_handler);
        (result, LAST_X_ERROR_CODE.with(Cell::get))
    }

    unsafe fn fb_configs(&self, display: *mut Display, screen: c_int) -> Vec<GLXFBConfig> {
        let mut count = 0;
        let configs = (self.glx.glXGetFBConfigs)(display, screen, &mut count);
        if configs.is_null() {
            return vec![];
        }
        let result = slice::from_raw_parts(configs, count.max(0) as usize).to_vec();
        (self.xlib.XFree)(configs as *mut c_void);
        result
    }

    unsafe fn fb_config_attrib(
        &self,
        display: *mut Display,
        config: GLXFBConfig,
        attribute: c_int,
    ) -> Result<c_int, WindowingApiError> {
        let mut value = 0;
        match (self.glx.glXGetFBConfigAttrib)(display, config, attribute, &mut value) {
            0 => Ok(value),
            glx_error => Err(error::glx_error_to_windowing_api_error(glx_error)),
        }
    }

    /// Describes `config`, or returns `None` if it is not an RGBA, level-0, opaque,
    /// window-capable config.
    unsafe fn config_info(
        &self,
        display: *mut Display,
        config: GLXFBConfig,
    ) -> Result<Option<NativeConfigInfo>, WindowingApiError> {
        let get = |attribute| self.fb_config_attrib(display, config, attribute);
        let size = |attribute| get(attribute).map(|value: c_int| value.max(0) as u32);

        if get(GLX_RENDER_TYPE)? & GLX_RGBA_BIT == 0
            || get(GLX_LEVEL)? != 0
            || get(GLX_TRANSPARENT_TYPE)? != GLX_NONE
            || get(GLX_DRAWABLE_TYPE)? & GLX_WINDOW_BIT == 0
        {
            return Ok(None);
        }

        let attributes = ConfigAttributes {
            buffer_size: size(GLX_BUFFER_SIZE)?,
            red_size: size(GLX_RED_SIZE)?,
            green_size: size(GLX_GREEN_SIZE)?,
            blue_size: size(GLX_BLUE_SIZE)?,
            alpha_size: size(GLX_ALPHA_SIZE)?,
            // Not every GLX implementation knows about multisampling.
            sample_buffers: size(GLX_SAMPLE_BUFFERS).unwrap_or(0),
            samples: size(GLX_SAMPLES).unwrap_or(0),
            stereo: get(GLX_STEREO)? != 0,
            double_buffer: get(GLX_DOUBLEBUFFER)? != 0,
            depth_size: size(GLX_DEPTH_SIZE)?,
            stencil_size: size(GLX_STENCIL_SIZE)?,
            accum_red_size: size(GLX_ACCUM_RED_SIZE)?,
            accum_green_size: size(GLX_ACCUM_GREEN_SIZE)?,
            accum_blue_size: size(GLX_ACCUM_BLUE_SIZE)?,
            accum_alpha_size: size(GLX_ACCUM_ALPHA_SIZE)?,
            aux_buffers: size(GLX_AUX_BUFFERS)?,
        };
        let id = get(GLX_FBCONFIG_ID)?;
        Ok(Some(NativeConfigInfo { native: NativeConfig(id as usize), attributes }))
    }

    unsafe fn find_fb_config(
        &self,
        display: *mut Display,
        config: NativeConfig,
    ) -> Option<GLXFBConfig> {
        for screen in 0..(self.xlib.XScreenCount)(display) {
            let found = self.fb_configs(display, screen).into_iter().find(|&fb_config| {
                self.fb_config_attrib(display, fb_config, GLX_FBCONFIG_ID)
                    == Ok(config.0 as c_int)
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn proc_address(&self, symbol: &str) -> *const c_void {
        let symbol = match CString::new(symbol) {
            Ok(symbol) => symbol,
            Err(_) => return ptr::null(),
        };
        unsafe {
            match (self.glx.glXGetProcAddress)(symbol.as_ptr() as *const u8) {
                Some(function) => function as *const c_void,
                None => ptr::null(),
            }
        }
    }
}

impl Platform for X11Platform {
    fn default_display_name(&self) -> String {
        env::var("DISPLAY").unwrap_or_else(|_| DEFAULT_DISPLAY_NAME.to_owned())
    }

    fn open_display(&self, name: &str) -> Result<NativeDisplay, Error> {
        let name = CString::new(name).map_err(|_| Error::ConnectionFailed)?;
        unsafe {
            let display = (self.xlib.XOpenDisplay)(name.as_ptr());
            if display.is_null() {
                return Err(Error::ConnectionFailed);
            }

            // Framebuffer configs need GLX 1.3.
            let (mut major, mut minor) = (0, 0);
            let supported = (self.glx.glXQueryVersion)(display, &mut major, &mut minor) != 0
                && (major, minor) >= (1, 3);
            if !supported {
                log::debug!("GLX {}.{} is too old", major, minor);
                (self.xlib.XCloseDisplay)(display);
                return Err(Error::UnsupportedOnThisPlatform);
            }
            Ok(NativeDisplay(display as usize))
        }
    }

    fn close_display(&self, display: NativeDisplay) {
        unsafe {
            (self.xlib.XCloseDisplay)(Self::display_ptr(display));
        }
    }

    fn enumerate_screens(&self, display: NativeDisplay) -> Result<Vec<ScreenInfo>, Error> {
        let display = Self::display_ptr(display);
        unsafe {
            let screen_count = (self.xlib.XScreenCount)(display);
            Ok((0..screen_count)
                .map(|screen_number| {
                    let size = Size2D::new(
                        (self.xlib.XDisplayWidth)(display, screen_number),
                        (self.xlib.XDisplayHeight)(display, screen_number),
                    );
                    let root_window = (self.xlib.XRootWindow)(display, screen_number);
                    ScreenInfo {
                        rect: Rect::new(Point2D::zero(), size),
                        extension: Some(ScreenExtension::X11 {
                            screen_number,
                            root_window: root_window as u64,
                        }),
                    }
                })
                .collect())
        }
    }

    fn enumerate_configs(
        &self,
        display: NativeDisplay,
        screen_index: usize,
    ) -> Result<Vec<NativeConfigInfo>, Error> {
        let display = Self::display_ptr(display);
        unsafe {
            if screen_index >= (self.xlib.XScreenCount)(display) as usize {
                return Err(Error::ConfigEnumerationFailed(WindowingApiError::BadScreen));
            }
            let mut configs = vec![];
            for fb_config in self.fb_configs(display, screen_index as c_int) {
                match self.config_info(display, fb_config) {
                    Ok(Some(info)) => configs.push(info),
                    Ok(None) => {}
                    Err(err) => return Err(Error::ConfigEnumerationFailed(err)),
                }
            }
            Ok(configs)
        }
    }

    fn create_native_context(
        &self,
        display: NativeDisplay,
        config: NativeConfig,
        share: Option<NativeContext>,
        attributes: &ContextAttributes,
    ) -> Result<NativeContext, Error> {
        let display = Self::display_ptr(display);
        let share = share.map_or(ptr::null_mut(), |share| share.0 as GLXContext);
        unsafe {
            let fb_config = self
                .find_fb_config(display, config)
                .ok_or(Error::ContextCreationFailed(WindowingApiError::BadPixelFormat))?;

            let (glx_context, x_error) = if attributes.is_legacy() {
                self.trap_errors(display, || {
                    (self.glx.glXCreateNewContext)(
                        display,
                        fb_config,
                        GLX_RGBA_TYPE,
                        share,
                        xlib::True,
                    )
                })
            } else {
                let create_context_attribs = self.proc_address("glXCreateContextAttribsARB");
                if create_context_attribs.is_null() {
                    return Err(Error::UnsupportedGLVersion);
                }
                let create_context_attribs: GlXCreateContextAttribsARB =
                    mem::transmute(create_context_attribs);
                let context_attributes = context_attribute_list(attributes);
                self.trap_errors(display, || {
                    create_context_attribs(
                        display,
                        fb_config,
                        share,
                        xlib::True,
                        context_attributes.as_ptr(),
                    )
                })
            };

            if glx_context.is_null() {
                let windowing_api_error =
                    error::xlib_error_to_windowing_api_error(&self.xlib, display, x_error);
                if !attributes.is_legacy() && windowing_api_error == WindowingApiError::BadMatch {
                    return Err(Error::UnsupportedGLVersion);
                }
                return Err(Error::ContextCreationFailed(windowing_api_error));
            }
            Ok(NativeContext(glx_context as usize))
        }
    }

    fn destroy_native_context(
        &self,
        display: NativeDisplay,
        context: NativeContext,
    ) -> Result<(), Error> {
        let display = Self::display_ptr(display);
        unsafe {
            let ((), x_error) = self.trap_errors(display, || {
                (self.glx.glXDestroyContext)(display, context.0 as GLXContext)
            });
            if x_error != 0 {
                return Err(Error::ContextDestructionFailed(
                    error::xlib_error_to_windowing_api_error(&self.xlib, display, x_error),
                ));
            }
        }
        Ok(())
    }

    fn make_native_context_current(
        &self,
        display: NativeDisplay,
        context: Option<NativeContext>,
    ) -> Result<(), Error> {
        let display = Self::display_ptr(display);
        let glx_context = context.map_or(ptr::null_mut(), |context| context.0 as GLXContext);
        unsafe {
            let (ok, x_error) = self.trap_errors(display, || {
                (self.glx.glXMakeContextCurrent)(display, 0, 0, glx_context)
            });
            if ok == xlib::False {
                return Err(Error::MakeCurrentFailed(error::xlib_error_to_windowing_api_error(
                    &self.xlib, display, x_error,
                )));
            }
        }
        Ok(())
    }

    fn delete_objects(
        &self,
        _: NativeDisplay,
        _: NativeContext,
        kind: ObjectKind,
        names: &[u32],
    ) -> Result<(), Error> {
        if kind == ObjectKind::DisplayList {
            // Display lists predate the core profile, so glow has no binding for them.
            let delete_lists = self.proc_address("glDeleteLists");
            if delete_lists.is_null() {
                return Err(Error::Failed);
            }
            unsafe {
                let delete_lists: GlDeleteLists = mem::transmute(delete_lists);
                for &name in names {
                    delete_lists(name, 1);
                }
            }
            return Ok(());
        }

        GL_FUNCTIONS.with(|gl| {
            let mut gl = gl.borrow_mut();
            let gl = gl.get_or_insert_with(|| unsafe {
                glow::Context::from_loader_function(|symbol| self.proc_address(symbol))
            });
            for name in names.iter().copied().filter_map(NonZeroU32::new) {
                unsafe {
                    match kind {
                        ObjectKind::Texture => gl.delete_texture(glow::NativeTexture(name)),
                        ObjectKind::Buffer => gl.delete_buffer(glow::NativeBuffer(name)),
                        ObjectKind::Shader => gl.delete_shader(glow::NativeShader(name)),
                        ObjectKind::Program => gl.delete_program(glow::NativeProgram(name)),
                        ObjectKind::DisplayList => unreachable!(),
                    }
                }
            }
        });
        Ok(())
    }
}

fn context_attribute_list(attributes: &ContextAttributes) -> Vec<c_int> {
    let version = attributes.version.unwrap_or(GLVersion::new(1, 0));
    let mut list = vec![
        GLX_CONTEXT_MAJOR_VERSION_ARB, version.major as c_int,
        GLX_CONTEXT_MINOR_VERSION_ARB, version.minor as c_int,
    ];

    let mut flags = 0;
    if attributes.flags.contains(ContextAttributeFlags::DEBUG) {
        flags |= GLX_CONTEXT_DEBUG_BIT_ARB;
    }
    if attributes.flags.contains(ContextAttributeFlags::FORWARD_COMPATIBLE) {
        flags |= GLX_CONTEXT_FORWARD_COMPATIBLE_BIT_ARB;
    }
    if flags != 0 {
        list.extend_from_slice(&[GLX_CONTEXT_FLAGS_ARB, flags]);
    }

    // Profiles exist from 3.2 on.
    if version >= GLVersion::new(3, 2) {
        let profile = if attributes.flags.contains(ContextAttributeFlags::FORWARD_COMPATIBLE) {
            GLX_CONTEXT_CORE_PROFILE_BIT_ARB
        } else {
            GLX_CONTEXT_COMPATIBILITY_PROFILE_BIT_ARB
        };
        list.extend_from_slice(&[GLX_CONTEXT_PROFILE_MASK_ARB, profile]);
    }

    list.push(0);
    list
}

unsafe extern "C" fn xlib_error_handler(_: *mut Display, event: *mut XErrorEvent) -> c_int {
    LAST_X_ERROR_CODE.with(|error_code| error_code.set((*event).error_code));
    0
}
