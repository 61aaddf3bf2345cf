//! Owned Xlib display connection.

use std::ffi::CStr;
use std::io;
use std::os::raw::c_int;
use std::ptr::NonNull;
use std::time::Duration;

use tracing::{debug, info};
use x11::xlib;

use crate::error::PlatformError;

/// An open display. Closed on drop.
pub(crate) struct XConnection {
    display: NonNull<xlib::Display>,
    root: xlib::Window,
    screen: c_int,
}

impl XConnection {
    /// Connect to the display named by `DISPLAY`.
    pub(crate) fn open() -> Result<Self, PlatformError> {
        // SAFETY: a null name selects `DISPLAY`; the returned pointer is
        // owned by this struct and freed by XCloseDisplay in Drop.
        let raw = unsafe { xlib::XOpenDisplay(std::ptr::null()) };
        let display = NonNull::new(raw).ok_or_else(|| {
            let name = std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string());
            PlatformError::Connect(format!(
                "could not connect to X server (DISPLAY={name}); make sure X11 is running"
            ))
        })?;
        // SAFETY: `display` is a valid connection.
        let (root, screen) = unsafe {
            (
                xlib::XDefaultRootWindow(display.as_ptr()),
                xlib::XDefaultScreen(display.as_ptr()),
            )
        };
        // SAFETY: XDisplayString returns a pointer owned by the display.
        let name = unsafe { CStr::from_ptr(xlib::XDisplayString(display.as_ptr())) };
        info!(display = %name.to_string_lossy(), "connected to X server");
        Ok(Self {
            display,
            root,
            screen,
        })
    }

    pub(crate) fn raw(&self) -> *mut xlib::Display {
        self.display.as_ptr()
    }

    pub(crate) fn root(&self) -> xlib::Window {
        self.root
    }

    pub(crate) fn screen(&self) -> c_int {
        self.screen
    }

    /// Size of the default X screen, which spans every monitor.
    pub(crate) fn root_size(&self) -> (u32, u32) {
        // SAFETY: valid display and screen number.
        let (w, h) = unsafe {
            (
                xlib::XDisplayWidth(self.raw(), self.screen),
                xlib::XDisplayHeight(self.raw(), self.screen),
            )
        };
        (
            u32::try_from(w).unwrap_or_default(),
            u32::try_from(h).unwrap_or_default(),
        )
    }

    /// Send buffered requests without waiting for replies.
    pub(crate) fn flush(&self) {
        // SAFETY: valid display.
        unsafe { xlib::XFlush(self.raw()) };
    }

    /// Send buffered requests and wait until the server processed them.
    pub(crate) fn sync(&self) {
        // SAFETY: valid display.
        unsafe { xlib::XSync(self.raw(), xlib::False) };
    }

    /// Number of events already read from the socket.
    pub(crate) fn pending(&self) -> c_int {
        // SAFETY: valid display.
        unsafe { xlib::XPending(self.raw()) }
    }

    pub(crate) fn next_event(&self) -> xlib::XEvent {
        // SAFETY: XEvent is plain data; XNextEvent fills it in.
        let mut ev: xlib::XEvent = unsafe { std::mem::zeroed() };
        // SAFETY: valid display and event buffer.
        unsafe { xlib::XNextEvent(self.raw(), &mut ev) };
        ev
    }

    /// Block until the connection is readable or `timeout` elapses.
    /// Returns `false` on timeout.
    pub(crate) fn wait_readable(&self, timeout: Option<Duration>) -> Result<bool, PlatformError> {
        // SAFETY: valid display.
        let fd = unsafe { xlib::XConnectionNumber(self.raw()) };
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let ms = timeout.map_or(-1, |t| c_int::try_from(t.as_millis()).unwrap_or(c_int::MAX));
        // SAFETY: one valid pollfd.
        let rc = unsafe { libc::poll(&mut pfd, 1, ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                debug!("poll interrupted");
                return Ok(true);
            }
            return Err(err.into());
        }
        Ok(rc > 0)
    }
}

impl Drop for XConnection {
    fn drop(&mut self) {
        self.sync();
        // SAFETY: the display is open and nothing uses it after this.
        unsafe { xlib::XCloseDisplay(self.raw()) };
        debug!("closed X display");
    }
}
