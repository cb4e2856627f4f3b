// glspace/src/platform/generic/headless.rs
//
//! An in-memory platform.
//!
//! Displays, screens and configuration catalogs are supplied up front; native contexts are
//! bookkeeping records. Every native call is recorded so that the behavior of the layers above
//! can be inspected. This is the backend to use when configurations come from somewhere other
//! than a live windowing system, and the backend the test suite runs against.

use crate::attributes::ConfigAttributes;
use crate::error::{Error, WindowingApiError};
use crate::info::{ContextAttributes, GLVersion};
use crate::platform::{NativeConfig, NativeConfigInfo, NativeContext, NativeDisplay};
use crate::platform::{ObjectKind, Platform, ScreenExtension, ScreenInfo};

use euclid::default::{Point2D, Rect, Size2D};
use std::collections::HashMap;
use std::mem;
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};

/// The name of the display in `HeadlessPlatform::default()`.
pub const DEFAULT_DISPLAY_NAME: &str = "headless:0";

const DEFAULT_MAX_VERSION: GLVersion = GLVersion { major: 4, minor: 6 };

/// An in-memory platform backend.
pub struct HeadlessPlatform {
    state: Mutex<HeadlessState>,
}

/// A screen description for `HeadlessPlatform::with_display`.
#[derive(Clone, Debug)]
pub struct HeadlessScreen {
    rect: Rect<i32>,
    extension: Option<ScreenExtension>,
    configs: Vec<ConfigAttributes>,
}

/// A record of one native call made against a `HeadlessPlatform`.
#[derive(Clone, Debug, PartialEq)]
pub enum HeadlessEvent {
    /// A native context was created.
    ContextCreated {
        context: NativeContext,
        config: NativeConfig,
        share: Option<NativeContext>,
    },
    /// A native context was destroyed.
    ContextDestroyed(NativeContext),
    /// A native context was made current, or the current context was cleared.
    MadeCurrent(Option<NativeContext>),
    /// Objects were deleted with the given context current.
    ObjectsDeleted {
        context: NativeContext,
        kind: ObjectKind,
        names: Vec<u32>,
    },
}

struct HeadlessState {
    displays: Vec<DisplayRecord>,
    open_displays: HashMap<NativeDisplay, usize>,
    contexts: HashMap<NativeContext, ContextRecord>,
    current: HashMap<ThreadId, NativeContext>,
    events: Vec<HeadlessEvent>,
    enumerations: usize,
    next_config: usize,
    next_handle: usize,
    max_version: GLVersion,
}

struct DisplayRecord {
    name: String,
    screens: Vec<ScreenRecord>,
}

struct ScreenRecord {
    info: ScreenInfo,
    configs: Vec<NativeConfigInfo>,
}

struct ContextRecord {
    display: usize,
    share_group: usize,
}

impl HeadlessScreen {
    /// Describes a screen with the given geometry and an empty catalog.
    pub fn new(rect: Rect<i32>) -> HeadlessScreen {
        HeadlessScreen { rect, extension: None, configs: vec![] }
    }

    /// Adds a configuration to the end of the catalog.
    pub fn with_config(mut self, attributes: ConfigAttributes) -> HeadlessScreen {
        self.configs.push(attributes);
        self
    }

    /// Adds configurations to the end of the catalog.
    pub fn with_configs<I>(mut self, configs: I) -> HeadlessScreen
    where
        I: IntoIterator<Item = ConfigAttributes>,
    {
        self.configs.extend(configs);
        self
    }

    /// Attaches platform-specific data to the screen.
    pub fn with_extension(mut self, extension: ScreenExtension) -> HeadlessScreen {
        self.extension = Some(extension);
        self
    }
}

impl Default for HeadlessPlatform {
    /// A platform with one display, `DEFAULT_DISPLAY_NAME`, with one 1920×1080 screen whose
    /// catalog is `standard_catalog()`.
    fn default() -> HeadlessPlatform {
        let rect = Rect::new(Point2D::zero(), Size2D::new(1920, 1080));
        HeadlessPlatform::new().with_display(
            DEFAULT_DISPLAY_NAME,
            vec![HeadlessScreen::new(rect).with_configs(standard_catalog())],
        )
    }
}

impl HeadlessPlatform {
    /// Creates a platform with no displays.
    pub fn new() -> HeadlessPlatform {
        HeadlessPlatform {
            state: Mutex::new(HeadlessState {
                displays: vec![],
                open_displays: HashMap::new(),
                contexts: HashMap::new(),
                current: HashMap::new(),
                events: vec![],
                enumerations: 0,
                next_config: 1,
                next_handle: 1,
                max_version: DEFAULT_MAX_VERSION,
            }),
        }
    }

    /// Adds a display. The first display added is the default display.
    pub fn with_display(self, name: &str, screens: Vec<HeadlessScreen>) -> HeadlessPlatform {
        {
            let mut state = self.lock();
            let mut records = Vec::with_capacity(screens.len());
            for screen in screens {
                let mut configs = Vec::with_capacity(screen.configs.len());
                for attributes in screen.configs {
                    configs.push(NativeConfigInfo {
                        native: NativeConfig(state.next_config),
                        attributes,
                    });
                    state.next_config += 1;
                }
                records.push(ScreenRecord {
                    info: ScreenInfo { rect: screen.rect, extension: screen.extension },
                    configs,
                });
            }
            state.displays.push(DisplayRecord { name: name.to_owned(), screens: records });
        }
        self
    }

    /// Caps the GL version contexts can be created with. The default is 4.6.
    pub fn with_max_version(self, version: GLVersion) -> HeadlessPlatform {
        self.lock().max_version = version;
        self
    }

    /// Removes a configuration from future enumerations, as a driver change would.
    ///
    /// Returns true if the configuration was found.
    pub fn retire_config(&self, config: NativeConfig) -> bool {
        let mut state = self.lock();
        for screen in state.displays.iter_mut().flat_map(|display| display.screens.iter_mut()) {
            if let Some(index) = screen.configs.iter().position(|info| info.native == config) {
                screen.configs.remove(index);
                return true;
            }
        }
        false
    }

    /// The native calls recorded since the last `take_events`, oldest first.
    pub fn events(&self) -> Vec<HeadlessEvent> {
        self.lock().events.clone()
    }

    /// Returns the recorded native calls and clears the log.
    ///
    /// Long-running users should call this periodically; the log is otherwise unbounded.
    pub fn take_events(&self) -> Vec<HeadlessEvent> {
        mem::take(&mut self.lock().events)
    }

    /// The number of native contexts that have been created and not destroyed.
    pub fn live_native_contexts(&self) -> usize {
        self.lock().contexts.len()
    }

    /// The number of times a screen's configurations have been enumerated.
    pub fn enumeration_count(&self) -> usize {
        self.lock().enumerations
    }

    /// The native context current on the calling thread.
    pub fn current_native_context(&self) -> Option<NativeContext> {
        self.lock().current.get(&thread::current().id()).copied()
    }

    /// The share group of a live native context. Contexts that share objects report the same
    /// group.
    pub fn share_group(&self, context: NativeContext) -> Option<usize> {
        self.lock().contexts.get(&context).map(|record| record.share_group)
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        // Every critical section leaves the state consistent, so a poisoned lock is usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HeadlessState {
    fn display(&self, display: NativeDisplay) -> Result<usize, WindowingApiError> {
        self.open_displays.get(&display).copied().ok_or(WindowingApiError::BadDisplay)
    }

    fn next_handle(&mut self) -> usize {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl Platform for HeadlessPlatform {
    fn default_display_name(&self) -> String {
        match self.lock().displays.first() {
            Some(display) => display.name.clone(),
            None => DEFAULT_DISPLAY_NAME.to_owned(),
        }
    }

    fn open_display(&self, name: &str) -> Result<NativeDisplay, Error> {
        let mut state = self.lock();
        let index = state
            .displays
            .iter()
            .position(|display| display.name == name)
            .ok_or(Error::ConnectionFailed)?;
        let display = NativeDisplay(state.next_handle());
        state.open_displays.insert(display, index);
        Ok(display)
    }

    fn close_display(&self, display: NativeDisplay) {
        self.lock().open_displays.remove(&display);
    }

    fn enumerate_screens(&self, display: NativeDisplay) -> Result<Vec<ScreenInfo>, Error> {
        let state = self.lock();
        let index = state.display(display).map_err(|_| Error::ConnectionClosed)?;
        Ok(state.displays[index].screens.iter().map(|screen| screen.info.clone()).collect())
    }

    fn enumerate_configs(
        &self,
        display: NativeDisplay,
        screen_index: usize,
    ) -> Result<Vec<NativeConfigInfo>, Error> {
        let mut state = self.lock();
        let index = state.display(display).map_err(Error::ConfigEnumerationFailed)?;
        state.enumerations += 1;
        match state.displays[index].screens.get(screen_index) {
            Some(screen) => Ok(screen.configs.clone()),
            None => Err(Error::ConfigEnumerationFailed(WindowingApiError::BadScreen)),
        }
    }

    fn create_native_context(
        &self,
        display: NativeDisplay,
        config: NativeConfig,
        share: Option<NativeContext>,
        attributes: &ContextAttributes,
    ) -> Result<NativeContext, Error> {
        let mut state = self.lock();
        let display_index = state.display(display).map_err(Error::ContextCreationFailed)?;

        let known_config = state.displays[display_index]
            .screens
            .iter()
            .any(|screen| screen.configs.iter().any(|info| info.native == config));
        if !known_config {
            return Err(Error::ContextCreationFailed(WindowingApiError::BadPixelFormat));
        }

        if let Some(version) = attributes.version {
            if version > state.max_version {
                return Err(Error::UnsupportedGLVersion);
            }
        }

        let share_group = match share {
            None => None,
            Some(share) => match state.contexts.get(&share) {
                Some(record) if record.display == display_index => Some(record.share_group),
                Some(_) => return Err(Error::ContextCreationFailed(WindowingApiError::BadMatch)),
                None => return Err(Error::ContextCreationFailed(WindowingApiError::BadContext)),
            },
        };

        let context = NativeContext(state.next_handle());
        let share_group = share_group.unwrap_or(context.0);
        state.contexts.insert(context, ContextRecord { display: display_index, share_group });
        state.events.push(HeadlessEvent::ContextCreated { context, config, share });
        Ok(context)
    }

    fn destroy_native_context(
        &self,
        display: NativeDisplay,
        context: NativeContext,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.display(display).map_err(Error::ContextDestructionFailed)?;
        if state.contexts.remove(&context).is_none() {
            return Err(Error::ContextDestructionFailed(WindowingApiError::BadContext));
        }
        state.current.retain(|_, current| *current != context);
        state.events.push(HeadlessEvent::ContextDestroyed(context));
        Ok(())
    }

    fn make_native_context_current(
        &self,
        display: NativeDisplay,
        context: Option<NativeContext>,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        state.display(display).map_err(Error::MakeCurrentFailed)?;
        let thread = thread::current().id();
        match context {
            None => {
                state.current.remove(&thread);
            }
            Some(context) => {
                if !state.contexts.contains_key(&context) {
                    return Err(Error::MakeCurrentFailed(WindowingApiError::BadContext));
                }
                let elsewhere = state
                    .current
                    .iter()
                    .any(|(&other, &current)| other != thread && current == context);
                if elsewhere {
                    return Err(Error::MakeCurrentFailed(WindowingApiError::BadAccess));
                }
                state.current.insert(thread, context);
            }
        }
        state.events.push(HeadlessEvent::MadeCurrent(context));
        Ok(())
    }

    fn delete_objects(
        &self,
        _: NativeDisplay,
        context: NativeContext,
        kind: ObjectKind,
        names: &[u32],
    ) -> Result<(), Error> {
        self.lock().events.push(HeadlessEvent::ObjectsDeleted {
            context,
            kind,
            names: names.to_vec(),
        });
        Ok(())
    }
}

/// A catalog resembling what a desktop driver reports, in typical preference order.
pub fn standard_catalog() -> Vec<ConfigAttributes> {
    let rgba8 = ConfigAttributes {
        buffer_size: 32,
        red_size: 8,
        green_size: 8,
        blue_size: 8,
        alpha_size: 8,
        double_buffer: true,
        depth_size: 24,
        stencil_size: 8,
        ..ConfigAttributes::default()
    };
    vec![
        rgba8,
        ConfigAttributes { sample_buffers: 1, samples: 4, ..rgba8 },
        ConfigAttributes { sample_buffers: 1, samples: 8, ..rgba8 },
        ConfigAttributes { depth_size: 16, stencil_size: 0, ..rgba8 },
        ConfigAttributes {
            buffer_size: 16,
            red_size: 5,
            green_size: 6,
            blue_size: 5,
            alpha_size: 0,
            depth_size: 16,
            stencil_size: 0,
            ..rgba8
        },
        ConfigAttributes { double_buffer: false, ..rgba8 },
        ConfigAttributes {
            accum_red_size: 16,
            accum_green_size: 16,
            accum_blue_size: 16,
            accum_alpha_size: 16,
            aux_buffers: 2,
            ..rgba8
        },
        ConfigAttributes { stereo: true, ..rgba8 },
    ]
}
