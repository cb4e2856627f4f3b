// glspace/src/connection.rs
//
//! The entry point: a connection to the platform's windowing system.

use crate::context::Context;
use crate::display::{Display, Screen};
use crate::error::Error;
use crate::platform::generic::headless::HeadlessPlatform;
use crate::platform::Platform;
use crate::registry::ContextRegistry;

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex};

/// A connection to the windowing system.
///
/// The connection opens displays, hands out one `Display` per display name, and owns the
/// registry of every context created through it.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

pub(crate) struct ConnectionInner {
    pub(crate) platform: Arc<dyn Platform>,
    displays: Mutex<HashMap<String, Display>>,
    pub(crate) registry: ContextRegistry,
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        self.registry.destroy_shadows();
    }
}

impl Connection {
    /// Connects to the given platform.
    pub fn new(platform: Arc<dyn Platform>) -> Connection {
        Connection::with_registry(platform, ContextRegistry::new())
    }

    /// Connects to the given platform, tracking contexts in `registry`.
    pub fn with_registry(platform: Arc<dyn Platform>, registry: ContextRegistry) -> Connection {
        Connection {
            inner: Arc::new(ConnectionInner {
                platform,
                displays: Mutex::new(HashMap::new()),
                registry,
            }),
        }
    }

    /// Connects to an in-process headless platform with one screen and a typical set of
    /// configurations.
    pub fn headless() -> Connection {
        Connection::new(Arc::new(HeadlessPlatform::default()))
    }

    /// Connects to the X server named by the `DISPLAY` environment variable.
    #[cfg(x11)]
    pub fn x11() -> Result<Connection, Error> {
        let platform = crate::platform::unix::x11::X11Platform::new()?;
        Ok(Connection::new(Arc::new(platform)))
    }

    /// Returns the platform this connection talks to.
    #[inline]
    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.inner.platform
    }

    /// Returns the registry of contexts created through this connection.
    #[inline]
    pub fn registry(&self) -> &ContextRegistry {
        &self.inner.registry
    }

    /// Returns the display with the given name, opening it on first use.
    ///
    /// `None` means the platform's default display. Asking for the same name again returns the
    /// same display.
    pub fn display(&self, name: Option<&str>) -> Result<Display, Error> {
        let name = match name {
            Some(name) => name.to_owned(),
            None => self.inner.platform.default_display_name(),
        };

        let mut displays =
            self.inner.displays.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(display) = displays.get(&name) {
            return Ok(display.clone());
        }

        let display =
            Display::open(self.inner.platform.clone(), &name, Arc::downgrade(&self.inner))?;
        displays.insert(name, display.clone());
        Ok(display)
    }

    /// Returns the platform's default display.
    #[inline]
    pub fn default_display(&self) -> Result<Display, Error> {
        self.display(None)
    }

    /// Returns the first screen of the default display.
    #[inline]
    pub fn default_screen(&self) -> Result<Screen, Error> {
        Ok(self.default_display()?.default_screen())
    }

    /// Returns the shadow context of the default display, creating it on the default screen if
    /// necessary.
    pub fn shadow_context(&self) -> Result<Context, Error> {
        let screen = self.default_screen()?;
        self.inner.registry.ensure_shadow(&screen)
    }

    /// Returns the context of this connection that is current on the calling thread.
    #[inline]
    pub fn current_context(&self) -> Option<Context> {
        self.inner.registry.current_context()
    }
}

impl Debug for Connection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let displays = self.inner.displays.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f.debug_struct("Connection")
            .field("displays", &displays.keys().collect::<Vec<_>>())
            .field("registry", &self.inner.registry)
            .finish()
    }
}
