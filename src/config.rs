// glspace/src/config.rs
//
//! Concrete, platform-verified configurations.

use crate::attributes::{Attribute, ConfigAttributes, Template};
use crate::context::Context;
use crate::display::Screen;
use crate::error::Error;
use crate::info::ContextAttributes;
use crate::matcher;
use crate::platform::{NativeConfig, NativeConfigInfo};

use std::fmt::{self, Debug, Display, Formatter};

/// A configuration reported by the platform for one screen.
///
/// Configs can only be obtained from a `Screen`, so every config describes a real
/// driver-supported configuration. Contexts are created from configs, never from templates.
#[derive(Clone)]
pub struct Config {
    attributes: ConfigAttributes,
    context_attributes: ContextAttributes,
    native: NativeConfig,
    screen: Screen,
}

impl Config {
    pub(crate) fn new(screen: Screen, info: &NativeConfigInfo, template: &Template) -> Config {
        Config {
            attributes: info.attributes,
            context_attributes: template.context,
            native: info.native,
            screen,
        }
    }

    /// Returns the framebuffer attributes of this configuration.
    #[inline]
    pub fn attributes(&self) -> &ConfigAttributes {
        &self.attributes
    }

    /// Returns the value of one attribute, with booleans as `0` or `1`.
    #[inline]
    pub fn get(&self, attribute: Attribute) -> u32 {
        self.attributes.get(attribute)
    }

    /// Returns the context-creation attributes carried over from the template this config was
    /// resolved from.
    #[inline]
    pub fn context_attributes(&self) -> &ContextAttributes {
        &self.context_attributes
    }

    /// Returns a copy of this config that creates contexts with different attributes.
    pub fn with_context_attributes(&self, context_attributes: ContextAttributes) -> Config {
        Config { context_attributes, ..self.clone() }
    }

    /// Returns the screen this config belongs to.
    #[inline]
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Returns the platform's handle to this config.
    #[inline]
    pub fn native_config(&self) -> NativeConfig {
        self.native
    }

    /// Returns true if this config meets or exceeds every request in the template.
    #[inline]
    pub fn satisfies(&self, template: &Template) -> bool {
        matcher::satisfies(template, &self.attributes)
    }

    /// Creates a context with this config.
    ///
    /// With `None`, the context gets a new object space of its own. Otherwise it joins the
    /// object space of `share_with`, which must be alive and on the same display.
    pub fn create_context(&self, share_with: Option<&Context>) -> Result<Context, Error> {
        self.verify()?;
        let connection = self.screen.display().connection()?;
        Context::new(&connection, self, share_with, false)
    }

    /// Creates a context that shares objects with the registry's default share source.
    ///
    /// Only contexts on this config's display are considered. The source is the registry's
    /// explicit override if one is set, else the most recently created live context, else the
    /// display's shadow context (created on this config's screen on first use, and again if it
    /// was destroyed).
    pub fn create_context_with_default_share(&self) -> Result<Context, Error> {
        self.verify()?;
        let connection = self.screen.display().connection()?;
        let share = connection.registry.default_share_source(&self.screen)?;
        Context::new(&connection, self, Some(&share), false)
    }

    pub(crate) fn verify(&self) -> Result<(), Error> {
        if self.screen.reports(self.native, &self.attributes)? {
            Ok(())
        } else {
            Err(Error::UnresolvedConfig)
        }
    }
}

impl AsRef<ConfigAttributes> for Config {
    #[inline]
    fn as_ref(&self) -> &ConfigAttributes {
        &self.attributes
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Config) -> bool {
        self.screen == other.screen
            && self.native == other.native
            && self.attributes == other.attributes
            && self.context_attributes == other.context_attributes
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("native", &self.native)
            .field("screen", &self.screen)
            .field("attributes", &self.attributes)
            .field("context_attributes", &self.context_attributes)
            .finish()
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Config({})", self.attributes)
    }
}
