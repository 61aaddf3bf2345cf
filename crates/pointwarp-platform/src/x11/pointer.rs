//! XTest pointer device.

use std::os::raw::{c_int, c_uint};
use std::rc::Rc;

use pointwarp_types::{MouseButton, ScrollDirection};
use tracing::trace;
use x11::{xfixes, xlib, xtest};

use super::connection::XConnection;
use crate::error::PlatformError;
use crate::pointer::PointerDevice;
use crate::screen::VirtualMotion;

/// Let XTest pick the screen containing the pointer.
const CURRENT_SCREEN: c_int = -1;

pub(crate) struct XPointer {
    conn: Rc<XConnection>,
}

impl XPointer {
    pub(crate) fn new(conn: Rc<XConnection>) -> Self {
        Self { conn }
    }

    fn fake_button(&self, button: c_uint, pressed: bool) {
        // SAFETY: valid display.
        unsafe {
            xtest::XTestFakeButtonEvent(
                self.conn.raw(),
                button,
                c_int::from(pressed),
                xlib::CurrentTime,
            );
        }
    }
}

fn scroll_button(direction: ScrollDirection) -> c_uint {
    match direction {
        ScrollDirection::Up => 4,
        ScrollDirection::Down => 5,
        ScrollDirection::Left => 6,
        ScrollDirection::Right => 7,
    }
}

impl PointerDevice for XPointer {
    fn motion_absolute(&mut self, motion: VirtualMotion) -> Result<(), PlatformError> {
        // The root window is the virtual space; its origin is always (0, 0).
        let (x, y) = motion.global();
        // SAFETY: valid display.
        unsafe {
            xtest::XTestFakeMotionEvent(self.conn.raw(), CURRENT_SCREEN, x, y, xlib::CurrentTime);
        }
        Ok(())
    }

    fn button(&mut self, button: MouseButton, pressed: bool) -> Result<(), PlatformError> {
        trace!(?button, pressed, "xtest button");
        self.fake_button(c_uint::from(button.index()), pressed);
        Ok(())
    }

    fn scroll(&mut self, direction: ScrollDirection) -> Result<(), PlatformError> {
        let button = scroll_button(direction);
        self.fake_button(button, true);
        self.fake_button(button, false);
        Ok(())
    }

    fn frame(&mut self) -> Result<(), PlatformError> {
        self.conn.flush();
        Ok(())
    }

    fn query_position(&mut self) -> Option<(i32, i32)> {
        let (mut root, mut child) = (0, 0);
        let (mut rx, mut ry, mut wx, mut wy) = (0, 0, 0, 0);
        let mut mask = 0;
        // SAFETY: valid display and out-pointers.
        let on_screen = unsafe {
            xlib::XQueryPointer(
                self.conn.raw(),
                self.conn.root(),
                &mut root,
                &mut child,
                &mut rx,
                &mut ry,
                &mut wx,
                &mut wy,
                &mut mask,
            )
        };
        (on_screen != 0).then_some((rx, ry))
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), PlatformError> {
        // SAFETY: valid display and root window.
        unsafe {
            if visible {
                xfixes::XFixesShowCursor(self.conn.raw(), self.conn.root());
            } else {
                xfixes::XFixesHideCursor(self.conn.raw(), self.conn.root());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_buttons_follow_core_protocol() {
        assert_eq!(scroll_button(ScrollDirection::Up), 4);
        assert_eq!(scroll_button(ScrollDirection::Down), 5);
        assert_eq!(scroll_button(ScrollDirection::Left), 6);
        assert_eq!(scroll_button(ScrollDirection::Right), 7);
    }
}
