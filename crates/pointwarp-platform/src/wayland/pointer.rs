//! wlr virtual pointer device.

use std::time::{SystemTime, UNIX_EPOCH};

use pointwarp_types::{MouseButton, ScrollDirection};
use tracing::{debug, trace};
use wayland_client::protocol::wl_pointer;
use wayland_client::Connection;
use wayland_protocols_wlr::virtual_pointer::v1::client::zwlr_virtual_pointer_v1;

use crate::error::PlatformError;
use crate::pointer::PointerDevice;
use crate::screen::VirtualMotion;

/// Scroll distance of one wheel step, in surface-local units.
const SCROLL_STEP: f64 = 15.0;

pub(crate) struct WaylandPointer {
    conn: Connection,
    pointer: zwlr_virtual_pointer_v1::ZwlrVirtualPointerV1,
}

impl WaylandPointer {
    pub(crate) fn new(
        conn: Connection,
        pointer: zwlr_virtual_pointer_v1::ZwlrVirtualPointerV1,
    ) -> Self {
        Self { conn, pointer }
    }
}

/// Evdev code of a mouse button.
pub(crate) fn evdev_button(button: MouseButton) -> u32 {
    let code = match button {
        MouseButton::Left => evdev::KeyCode::BTN_LEFT,
        MouseButton::Middle => evdev::KeyCode::BTN_MIDDLE,
        MouseButton::Right => evdev::KeyCode::BTN_RIGHT,
    };
    u32::from(code.0)
}

fn scroll_axis(direction: ScrollDirection) -> (wl_pointer::Axis, f64) {
    match direction {
        ScrollDirection::Up => (wl_pointer::Axis::VerticalScroll, -SCROLL_STEP),
        ScrollDirection::Down => (wl_pointer::Axis::VerticalScroll, SCROLL_STEP),
        ScrollDirection::Left => (wl_pointer::Axis::HorizontalScroll, -SCROLL_STEP),
        ScrollDirection::Right => (wl_pointer::Axis::HorizontalScroll, SCROLL_STEP),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn current_time_millis() -> u32 {
    // Protocol timestamps are 32-bit milliseconds and wrap.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u32)
}

impl PointerDevice for WaylandPointer {
    fn motion_absolute(&mut self, motion: VirtualMotion) -> Result<(), PlatformError> {
        trace!(
            x = motion.x,
            y = motion.y,
            x_extent = motion.x_extent,
            y_extent = motion.y_extent,
            "virtual pointer motion"
        );
        self.pointer.motion_absolute(
            current_time_millis(),
            motion.x,
            motion.y,
            motion.x_extent,
            motion.y_extent,
        );
        Ok(())
    }

    fn button(&mut self, button: MouseButton, pressed: bool) -> Result<(), PlatformError> {
        let state = if pressed {
            wl_pointer::ButtonState::Pressed
        } else {
            wl_pointer::ButtonState::Released
        };
        self.pointer
            .button(current_time_millis(), evdev_button(button), state);
        Ok(())
    }

    fn scroll(&mut self, direction: ScrollDirection) -> Result<(), PlatformError> {
        let (axis, value) = scroll_axis(direction);
        self.pointer.axis_source(wl_pointer::AxisSource::Wheel);
        self.pointer.axis(current_time_millis(), axis, value);
        Ok(())
    }

    fn frame(&mut self) -> Result<(), PlatformError> {
        self.pointer.frame();
        self.conn
            .flush()
            .map_err(|e| {
                PlatformError::Protocol(format!("failed to flush wayland connection: {e}"))
            })
    }
}

impl Drop for WaylandPointer {
    fn drop(&mut self) {
        self.pointer.destroy();
        let _ = self.conn.flush();
        debug!("virtual pointer destroyed");
    }
}
