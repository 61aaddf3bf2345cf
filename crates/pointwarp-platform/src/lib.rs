//! Display-server input abstraction for pointwarp.
//!
//! The daemon talks to one [`Platform`] implementation chosen at startup by
//! [`connect`]. Every backend is built from the same parts:
//!
//! - [`keymap`]: keycode table, alias normalizer and name resolver
//! - [`screen`]: screen registry and virtual pointer space math
//! - [`pointer`]: pointer controller with button state and release-on-drop
//! - [`monitor`]: bounded modification-time file monitor
//!
//! Backends: `x11` (feature `x11`), `wayland` (feature `wayland`), and
//! [`mock`], which records native calls for tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use pointwarp_types::{Color, Hint, InputEvent, PointerPosition, Screen, ScreenId, ScrollDirection};
use serde::{Deserialize, Serialize};
use tracing::info;

pub mod config;
pub mod error;
pub mod keymap;
pub mod mock;
pub mod monitor;
pub mod pointer;
pub mod screen;

#[cfg(feature = "wayland")]
pub mod wayland;
#[cfg(feature = "x11")]
#[allow(unsafe_code)]
pub mod x11;

pub use config::Config;
pub use error::{ConfigError, PlatformError};
pub use keymap::{KeyTable, Resolver};
pub use monitor::FileMonitor;
pub use pointer::{PointerController, PointerDevice};
pub use screen::ScreenRegistry;

/// The capability surface every backend provides.
///
/// Calls are synchronous and single-threaded against one display-server
/// connection. Operations a backend cannot perform return
/// [`PlatformError::NotSupported`]; lookups that miss return `None`.
pub trait Platform {
    /// Short backend name for diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Start watching `path` for modification-time changes.
    fn monitor_file(&mut self, path: &Path) -> Result<(), PlatformError>;

    /// Paths whose modification time changed since the previous poll.
    /// Unreadable paths are skipped and retried on the next poll.
    fn poll_monitored_files(&mut self) -> Vec<PathBuf>;

    /// Flush buffered protocol state to the display server.
    fn commit(&mut self) -> Result<(), PlatformError>;

    /// Copy the primary selection into the clipboard.
    fn copy_selection(&mut self) -> Result<(), PlatformError>;

    fn input_grab_keyboard(&mut self) -> Result<(), PlatformError>;

    fn input_ungrab_keyboard(&mut self) -> Result<(), PlatformError>;

    /// Resolve a key name (aliases allowed) to `(code, shifted)`.
    fn input_lookup_code(&self, name: &str) -> Option<(u8, bool)>;

    /// Name of `code` in the given shift state, alias-rewritten.
    fn input_lookup_name(&self, code: u8, shifted: bool) -> Option<&str>;

    /// Block until the next key event or until `timeout` elapses
    /// (`Ok(None)`). `None` waits indefinitely.
    fn input_next_event(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Option<InputEvent>, PlatformError>;

    /// Discard events until one equal to an entry of `events` arrives, or
    /// `timeout` elapses.
    fn input_wait(
        &mut self,
        events: &[InputEvent],
        timeout: Option<Duration>,
    ) -> Result<Option<InputEvent>, PlatformError>;

    fn mouse_click(&mut self, button: u8) -> Result<(), PlatformError>;

    fn mouse_down(&mut self, button: u8) -> Result<(), PlatformError>;

    fn mouse_up(&mut self, button: u8) -> Result<(), PlatformError>;

    /// Last known pointer position, `None` when unknown.
    fn mouse_get_position(&mut self) -> Option<PointerPosition>;

    fn mouse_hide(&mut self) -> Result<(), PlatformError>;

    fn mouse_show(&mut self) -> Result<(), PlatformError>;

    fn mouse_move(&mut self, screen: ScreenId, x: i32, y: i32) -> Result<(), PlatformError>;

    fn scroll(&mut self, direction: ScrollDirection) -> Result<(), PlatformError>;

    fn screen_list(&self) -> &[Screen];

    fn screen_get_dimensions(&self, screen: ScreenId) -> Option<(u32, u32)>;

    fn screen_draw_box(
        &mut self,
        screen: ScreenId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    ) -> Result<(), PlatformError>;

    /// Remove everything drawn on `screen`.
    fn screen_clear(&mut self, screen: ScreenId) -> Result<(), PlatformError>;

    fn hint_draw(&mut self, screen: ScreenId, hints: &[Hint]) -> Result<(), PlatformError>;

    /// Report an error to the user, on screen when possible.
    fn show_error_modal(&mut self, title: &str, message: &str);
}

/// Which backend to connect to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Wayland when `WAYLAND_DISPLAY` is set and compiled in, else X11.
    #[default]
    Auto,
    X11,
    Wayland,
}

impl BackendKind {
    /// Resolve [`BackendKind::Auto`] against the environment.
    #[must_use]
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto => {
                let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some_and(|v| !v.is_empty());
                if wayland && cfg!(feature = "wayland") {
                    Self::Wayland
                } else {
                    Self::X11
                }
            }
            other => other,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::X11 => "x11",
            Self::Wayland => "wayland",
        })
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "x11" => Ok(Self::X11),
            "wayland" => Ok(Self::Wayland),
            _ => Err(format!("unknown backend {s:?} (expected auto, x11 or wayland)")),
        }
    }
}

/// Connect to the configured display server.
///
/// Failure here is fatal: there is no degraded mode without a display
/// connection.
pub fn connect(config: &Config) -> Result<Box<dyn Platform>, PlatformError> {
    let kind = config.platform.backend.resolve();
    info!(requested = %config.platform.backend, backend = %kind, "connecting to display server");
    match kind {
        #[cfg(feature = "x11")]
        BackendKind::X11 => Ok(Box::new(self::x11::X11Platform::connect(&config.style)?)),
        #[cfg(feature = "wayland")]
        BackendKind::Wayland => Ok(Box::new(self::wayland::WaylandPlatform::connect(
            &config.wayland,
        )?)),
        other => Err(PlatformError::Connect(format!(
            "backend {other} is not compiled in"
        ))),
    }
}
