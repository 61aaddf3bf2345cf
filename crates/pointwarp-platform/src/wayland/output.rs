//! Output enumeration through wl_output and xdg-output.

use pointwarp_types::Screen;
use tracing::debug;
use wayland_client::globals::GlobalListContents;
use wayland_client::protocol::wl_output::{self, WlOutput};
use wayland_client::protocol::wl_registry::WlRegistry;
use wayland_client::protocol::wl_seat::WlSeat;
use wayland_client::{delegate_noop, Connection, Dispatch, QueueHandle, WEnum};
use wayland_protocols::xdg::xdg_output::zv1::client::{
    zxdg_output_manager_v1::ZxdgOutputManagerV1,
    zxdg_output_v1::{self, ZxdgOutputV1},
};
use wayland_protocols_wlr::virtual_pointer::v1::client::{
    zwlr_virtual_pointer_manager_v1::ZwlrVirtualPointerManagerV1,
    zwlr_virtual_pointer_v1::ZwlrVirtualPointerV1,
};

/// What the compositor told us about one output.
#[derive(Debug, Default, Clone)]
pub(crate) struct Head {
    pub name: Option<String>,
    pub position: (i32, i32),
    pub mode: (i32, i32),
    pub scale: i32,
    pub logical_position: Option<(i32, i32)>,
    pub logical_size: Option<(i32, i32)>,
}

impl Head {
    /// Layout rectangle in compositor logical coordinates.
    ///
    /// xdg-output reports it directly; otherwise it is the output position
    /// and the current mode divided by the integer scale.
    pub(crate) fn to_screen(&self, index: u32) -> Option<Screen> {
        let (x, y) = self.logical_position.unwrap_or(self.position);
        let (w, h) = self.logical_size.unwrap_or_else(|| {
            let scale = self.scale.max(1);
            (self.mode.0 / scale, self.mode.1 / scale)
        });
        let (w, h) = (u32::try_from(w).ok()?, u32::try_from(h).ok()?);
        (w > 0 && h > 0).then(|| Screen::new(index, x, y, w, h))
    }
}

/// Event dispatch state for the backend's queue.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub heads: Vec<Head>,
}

impl State {
    /// Screens for every head with a usable size, in enumeration order.
    pub(crate) fn screens(&self) -> Vec<Screen> {
        let mut screens = Vec::new();
        for head in &self.heads {
            let index = u32::try_from(screens.len()).unwrap_or(u32::MAX);
            match head.to_screen(index) {
                Some(screen) => screens.push(screen),
                None => debug!(name = ?head.name, "skipping output without a mode"),
            }
        }
        screens
    }
}

impl Dispatch<WlRegistry, GlobalListContents> for State {
    fn event(
        _state: &mut Self,
        _proxy: &WlRegistry,
        _event: <WlRegistry as wayland_client::Proxy>::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // Hotplug is not tracked.
    }
}

impl Dispatch<WlOutput, usize> for State {
    fn event(
        state: &mut Self,
        _proxy: &WlOutput,
        event: wl_output::Event,
        idx: &usize,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let Some(head) = state.heads.get_mut(*idx) else {
            return;
        };
        match event {
            wl_output::Event::Geometry { x, y, .. } => head.position = (x, y),
            wl_output::Event::Mode {
                flags: WEnum::Value(flags),
                width,
                height,
                ..
            } if flags.contains(wl_output::Mode::Current) => head.mode = (width, height),
            wl_output::Event::Scale { factor } => head.scale = factor,
            wl_output::Event::Name { name } => head.name = Some(name),
            _ => {}
        }
    }
}

impl Dispatch<ZxdgOutputV1, usize> for State {
    fn event(
        state: &mut Self,
        _proxy: &ZxdgOutputV1,
        event: zxdg_output_v1::Event,
        idx: &usize,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let Some(head) = state.heads.get_mut(*idx) else {
            return;
        };
        match event {
            zxdg_output_v1::Event::LogicalPosition { x, y } => head.logical_position = Some((x, y)),
            zxdg_output_v1::Event::LogicalSize { width, height } => {
                head.logical_size = Some((width, height));
            }
            _ => {}
        }
    }
}

delegate_noop!(State: ignore WlSeat);
delegate_noop!(State: ZxdgOutputManagerV1);
delegate_noop!(State: ZwlrVirtualPointerManagerV1);
delegate_noop!(State: ZwlrVirtualPointerV1);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_geometry_wins() {
        let head = Head {
            position: (0, 0),
            mode: (3840, 2160),
            scale: 2,
            logical_position: Some((-1920, 0)),
            logical_size: Some((1920, 1080)),
            ..Head::default()
        };
        assert_eq!(head.to_screen(0), Some(Screen::new(0, -1920, 0, 1920, 1080)));
    }

    #[test]
    fn mode_is_divided_by_scale() {
        let head = Head {
            position: (2560, 0),
            mode: (3840, 2160),
            scale: 2,
            ..Head::default()
        };
        assert_eq!(head.to_screen(1), Some(Screen::new(1, 2560, 0, 1920, 1080)));
    }

    #[test]
    fn heads_without_mode_are_skipped() {
        let state = State {
            heads: vec![
                Head::default(),
                Head {
                    mode: (1920, 1080),
                    scale: 1,
                    ..Head::default()
                },
            ],
        };
        assert_eq!(state.screens(), vec![Screen::new(0, 0, 0, 1920, 1080)]);
    }
}
