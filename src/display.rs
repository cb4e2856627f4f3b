// glspace/src/display.rs
//
//! Displays and the screens attached to them.

use crate::attributes::{ConfigAttributes, Template};
use crate::config::Config;
use crate::connection::ConnectionInner;
use crate::error::Error;
use crate::matcher;
use crate::platform::{NativeConfig, NativeConfigInfo, NativeDisplay, Platform, ScreenExtension};
use crate::platform::ScreenInfo;

use euclid::default::Rect;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, Weak};

/// A connection to one display device and the screens attached to it.
///
/// Displays are opened through `Connection::display`, which hands out one display per name.
#[derive(Clone)]
pub struct Display {
    pub(crate) inner: Arc<DisplayInner>,
}

pub(crate) struct DisplayInner {
    name: String,
    native: NativeDisplay,
    platform: Arc<dyn Platform>,
    connection: Weak<ConnectionInner>,
    screens: Vec<Arc<ScreenInner>>,
}

/// One screen of a display.
#[derive(Clone)]
pub struct Screen {
    display: Display,
    inner: Arc<ScreenInner>,
}

struct ScreenInner {
    index: usize,
    info: ScreenInfo,
    catalog: Mutex<Option<Arc<Vec<NativeConfigInfo>>>>,
}

impl Drop for DisplayInner {
    fn drop(&mut self) {
        log::debug!("Closing display `{}`", self.name);
        self.platform.close_display(self.native);
    }
}

impl Display {
    pub(crate) fn open(
        platform: Arc<dyn Platform>,
        name: &str,
        connection: Weak<ConnectionInner>,
    ) -> Result<Display, Error> {
        let native = platform.open_display(name)?;
        let screens = match platform.enumerate_screens(native) {
            Ok(screens) if !screens.is_empty() => screens,
            Ok(_) => {
                platform.close_display(native);
                return Err(Error::NoScreens);
            }
            Err(err) => {
                platform.close_display(native);
                return Err(err);
            }
        };
        log::debug!("Opened display `{}` with {} screen(s)", name, screens.len());

        let screens = screens
            .into_iter()
            .enumerate()
            .map(|(index, info)| {
                Arc::new(ScreenInner { index, info, catalog: Mutex::new(None) })
            })
            .collect();
        Ok(Display {
            inner: Arc::new(DisplayInner {
                name: name.to_owned(),
                native,
                platform,
                connection,
                screens,
            }),
        })
    }

    /// Returns the name this display was opened with, e.g. an X11 `DISPLAY` string.
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the platform's handle to this display.
    #[inline]
    pub fn native_display(&self) -> NativeDisplay {
        self.inner.native
    }

    /// Returns every screen of this display, in platform order.
    pub fn screens(&self) -> Vec<Screen> {
        self.inner
            .screens
            .iter()
            .map(|inner| Screen { display: self.clone(), inner: inner.clone() })
            .collect()
    }

    /// Returns the screen with the given index.
    pub fn screen(&self, index: usize) -> Option<Screen> {
        self.inner
            .screens
            .get(index)
            .map(|inner| Screen { display: self.clone(), inner: inner.clone() })
    }

    /// Returns the first screen of this display. Every display has at least one.
    pub fn default_screen(&self) -> Screen {
        Screen { display: self.clone(), inner: self.inner.screens[0].clone() }
    }

    /// Returns true if both handles refer to the same display.
    #[inline]
    pub fn ptr_eq(&self, other: &Display) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline]
    pub(crate) fn platform(&self) -> &Arc<dyn Platform> {
        &self.inner.platform
    }

    pub(crate) fn connection(&self) -> Result<Arc<ConnectionInner>, Error> {
        self.inner.connection.upgrade().ok_or(Error::ConnectionClosed)
    }
}

impl PartialEq for Display {
    fn eq(&self, other: &Display) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for Display {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("name", &self.inner.name)
            .field("native", &self.inner.native)
            .field("screens", &self.inner.screens.len())
            .finish()
    }
}

impl Screen {
    /// Returns the display this screen belongs to.
    #[inline]
    pub fn display(&self) -> &Display {
        &self.display
    }

    /// Returns the index of this screen within its display.
    #[inline]
    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// Returns the position and size of this screen.
    #[inline]
    pub fn rect(&self) -> Rect<i32> {
        self.inner.info.rect
    }

    /// Returns platform-specific data about this screen, if the platform reports any.
    #[inline]
    pub fn extension(&self) -> Option<&ScreenExtension> {
        self.inner.info.extension.as_ref()
    }

    /// Returns every configuration the platform reports for this screen, in platform order.
    ///
    /// The platform is queried on first use; later calls reuse the result until
    /// `refresh_configs` is called.
    pub fn configs(&self) -> Result<Vec<Config>, Error> {
        let catalog = self.catalog()?;
        Ok(catalog.iter().map(|info| Config::new(self.clone(), info, &Template::new())).collect())
    }

    /// Discards the cached configuration catalog so the next query asks the platform again.
    ///
    /// Configs resolved from the old catalog that the platform no longer reports can't be used
    /// to create contexts afterward.
    pub fn refresh_configs(&self) {
        *self.inner.catalog.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Returns the configurations that satisfy the template, in platform order.
    ///
    /// The result may be empty. An empty template matches every configuration.
    pub fn matching_configs(&self, template: &Template) -> Result<Vec<Config>, Error> {
        let catalog = self.catalog()?;
        Ok(matcher::filter(template, catalog.as_slice())
            .into_iter()
            .map(|info| Config::new(self.clone(), info, template))
            .collect())
    }

    /// Returns the best configuration for the template.
    ///
    /// Fails with `Error::NoSuchConfig` if no configuration satisfies it. See the `matcher`
    /// module for the ranking.
    pub fn best_config(&self, template: &Template) -> Result<Config, Error> {
        let catalog = self.catalog()?;
        let info = matcher::best(template, catalog.as_slice())?;
        Ok(Config::new(self.clone(), info, template))
    }

    /// Returns the best configuration for the first template that can be satisfied.
    ///
    /// This is the usual way to ask for a high-quality configuration with a fallback:
    ///
    /// ```
    /// # use glspace::{Attribute, Connection, Template};
    /// # let connection = Connection::headless();
    /// # let screen = connection.default_screen().unwrap();
    /// let preferred = Template::window_default().with(Attribute::Samples, 4);
    /// let config = screen.best_config_from(&[preferred, Template::new()]).unwrap();
    /// # assert!(config.get(Attribute::Samples) >= 4);
    /// ```
    pub fn best_config_from(&self, templates: &[Template]) -> Result<Config, Error> {
        for template in templates {
            match self.best_config(template) {
                Err(Error::NoSuchConfig) => {
                    log::debug!("No config satisfies {}, trying the next template", template);
                }
                result => return result,
            }
        }
        Err(Error::NoSuchConfig)
    }

    /// Returns true if both handles refer to the same screen.
    #[inline]
    pub fn ptr_eq(&self, other: &Screen) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn catalog(&self) -> Result<Arc<Vec<NativeConfigInfo>>, Error> {
        let mut catalog = self.inner.catalog.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(ref catalog) = *catalog {
            return Ok(catalog.clone());
        }

        let platform = self.display.platform();
        let configs = platform.enumerate_configs(self.display.native_display(), self.inner.index)?;
        log::debug!(
            "Enumerated {} config(s) on screen {} of `{}`",
            configs.len(),
            self.inner.index,
            self.display.name()
        );
        let configs = Arc::new(configs);
        *catalog = Some(configs.clone());
        Ok(configs)
    }

    /// Returns true if the current catalog still contains this configuration.
    pub(crate) fn reports(
        &self,
        native: NativeConfig,
        attributes: &ConfigAttributes,
    ) -> Result<bool, Error> {
        let catalog = self.catalog()?;
        Ok(catalog.iter().any(|info| info.native == native && info.attributes == *attributes))
    }
}

impl PartialEq for Screen {
    fn eq(&self, other: &Screen) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for Screen {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen")
            .field("display", &self.display.name())
            .field("index", &self.inner.index)
            .field("rect", &self.inner.info.rect)
            .finish()
    }
}
