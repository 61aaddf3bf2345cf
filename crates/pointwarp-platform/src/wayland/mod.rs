//! Wayland backend for wlroots-based compositors.
//!
//! Pointer injection goes through `zwlr_virtual_pointer_v1`; the screen
//! layout comes from `wl_output` refined by `zxdg_output_v1`. Keyboard
//! grabbing, key events and drawing need a layer-shell surface, which this
//! backend does not create, so those calls report
//! [`PlatformError::NotSupported`].

mod output;
mod pointer;

use std::path::{Path, PathBuf};
use std::time::Duration;

use pointwarp_types::{Color, Hint, InputEvent, PointerPosition, Screen, ScreenId, ScrollDirection};
use tracing::{debug, error, info};
use wayland_client::globals::registry_queue_init;
use wayland_client::protocol::wl_output::WlOutput;
use wayland_client::protocol::wl_seat::WlSeat;
use wayland_client::{Connection, EventQueue, Proxy};
use wayland_protocols::xdg::xdg_output::zv1::client::zxdg_output_manager_v1::ZxdgOutputManagerV1;
use wayland_protocols_wlr::virtual_pointer::v1::client::zwlr_virtual_pointer_manager_v1;
use xkbcommon::xkb;

use self::output::{Head, State};
use self::pointer::WaylandPointer;
use crate::config::WaylandConfig;
use crate::error::PlatformError;
use crate::keymap::{KeyTable, Resolver};
use crate::monitor::FileMonitor;
use crate::pointer::PointerController;
use crate::screen::ScreenRegistry;
use crate::Platform;

/// xkb keycodes are evdev codes offset by 8, the same space X11 uses.
const MIN_KEYCODE: u8 = 8;

pub struct WaylandPlatform {
    pointer: PointerController<WaylandPointer>,
    resolver: Resolver,
    monitor: FileMonitor,
    queue: EventQueue<State>,
    state: State,
    conn: Connection,
}

impl WaylandPlatform {
    /// Connect to `WAYLAND_DISPLAY`, enumerate outputs and create the
    /// virtual pointer.
    pub fn connect(config: &WaylandConfig) -> Result<Self, PlatformError> {
        let conn = Connection::connect_to_env().map_err(|e| {
            PlatformError::Connect(format!(
                "could not connect to wayland display: {e}; ensure WAYLAND_DISPLAY is set"
            ))
        })?;
        let (globals, mut queue) = registry_queue_init::<State>(&conn)
            .map_err(|e| PlatformError::Connect(format!("failed to read wayland registry: {e}")))?;
        let qh = queue.handle();

        let manager: zwlr_virtual_pointer_manager_v1::ZwlrVirtualPointerManagerV1 =
            globals.bind(&qh, 1..=2, ()).map_err(|e| {
                PlatformError::Connect(format!(
                    "compositor does not support zwlr_virtual_pointer_manager_v1: {e}"
                ))
            })?;
        let seat: WlSeat = globals
            .bind(&qh, 1..=7, ())
            .map_err(|e| PlatformError::Connect(format!("no wl_seat available: {e}")))?;
        let xdg_manager: Option<ZxdgOutputManagerV1> = globals.bind(&qh, 1..=3, ()).ok();
        if xdg_manager.is_none() {
            debug!("compositor lacks xdg_output, using wl_output geometry");
        }

        let mut state = State::default();
        let outputs: Vec<(u32, u32)> = globals.contents().with_list(|list| {
            list.iter()
                .filter(|g| g.interface == WlOutput::interface().name)
                .map(|g| (g.name, g.version))
                .collect()
        });
        let mut wl_outputs = Vec::with_capacity(outputs.len());
        for (idx, (name, version)) in outputs.into_iter().enumerate() {
            let output: WlOutput = globals.registry().bind(name, version.min(4), &qh, idx);
            state.heads.push(Head::default());
            wl_outputs.push(output);
        }
        if let Some(mgr) = &xdg_manager {
            for (idx, output) in wl_outputs.iter().enumerate() {
                mgr.get_xdg_output(output, &qh, idx);
            }
        }
        queue
            .roundtrip(&mut state)
            .map_err(|e| PlatformError::Connect(format!("wayland roundtrip failed: {e}")))?;

        let screens = ScreenRegistry::new(state.screens())?;
        for screen in screens.list() {
            info!(%screen, "found output");
        }

        let virtual_pointer = manager.create_virtual_pointer(Some(&seat), &qh, ());
        info!("created virtual pointer");
        let device = WaylandPointer::new(conn.clone(), virtual_pointer);

        Ok(Self {
            pointer: PointerController::new(device, screens),
            resolver: Resolver::new(build_key_table(config)?),
            monitor: FileMonitor::new(),
            queue,
            state,
            conn,
        })
    }
}

/// Name levels 0 and 1 of layout 0 from a keymap compiled from `config`.
fn build_key_table(config: &WaylandConfig) -> Result<KeyTable, PlatformError> {
    let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
    let keymap = xkb::Keymap::new_from_names(
        &context,
        "",
        config.model.as_str(),
        config.layout.as_str(),
        config.variant.as_str(),
        config.options.clone(),
        xkb::COMPILE_NO_FLAGS,
    )
    .ok_or_else(|| {
        PlatformError::Connect(format!(
            "failed to compile xkb keymap (model={:?}, layout={:?}, variant={:?}, options={:?})",
            config.model, config.layout, config.variant, config.options
        ))
    })?;

    let name = |code: u8, level: u32| -> String {
        keymap
            .key_get_syms_by_level(xkb::Keycode::new(u32::from(code)), 0, level)
            .first()
            .map(|sym| xkb::keysym_get_name(*sym))
            .unwrap_or_default()
    };
    let table = KeyTable::from_names(
        (MIN_KEYCODE..=u8::MAX).map(|code| (code, name(code, 0), name(code, 1))),
    );
    debug!(
        layout = if config.layout.is_empty() { "default" } else { config.layout.as_str() },
        named = table.named_count(),
        "built xkb keycode table"
    );
    Ok(table)
}

impl Platform for WaylandPlatform {
    fn backend_name(&self) -> &'static str {
        "wayland"
    }

    fn monitor_file(&mut self, path: &Path) -> Result<(), PlatformError> {
        self.monitor.watch(path)
    }

    fn poll_monitored_files(&mut self) -> Vec<PathBuf> {
        self.monitor.poll_changes()
    }

    fn commit(&mut self) -> Result<(), PlatformError> {
        self.queue
            .dispatch_pending(&mut self.state)
            .map_err(|e| PlatformError::Protocol(e.to_string()))?;
        self.conn
            .flush()
            .map_err(|e| PlatformError::Protocol(e.to_string()))
    }

    fn copy_selection(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported("clipboard copy"))
    }

    fn input_grab_keyboard(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported("keyboard grab"))
    }

    fn input_ungrab_keyboard(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported("keyboard grab"))
    }

    fn input_lookup_code(&self, name: &str) -> Option<(u8, bool)> {
        self.resolver.lookup_code(name)
    }

    fn input_lookup_name(&self, code: u8, shifted: bool) -> Option<&str> {
        self.resolver.lookup_name(code, shifted)
    }

    fn input_next_event(
        &mut self,
        _timeout: Option<Duration>,
    ) -> Result<Option<InputEvent>, PlatformError> {
        Err(PlatformError::NotSupported("keyboard events"))
    }

    fn input_wait(
        &mut self,
        _events: &[InputEvent],
        _timeout: Option<Duration>,
    ) -> Result<Option<InputEvent>, PlatformError> {
        Err(PlatformError::NotSupported("keyboard events"))
    }

    fn mouse_click(&mut self, button: u8) -> Result<(), PlatformError> {
        self.pointer.click(button)
    }

    fn mouse_down(&mut self, button: u8) -> Result<(), PlatformError> {
        self.pointer.down(button)
    }

    fn mouse_up(&mut self, button: u8) -> Result<(), PlatformError> {
        self.pointer.up(button)
    }

    fn mouse_get_position(&mut self) -> Option<PointerPosition> {
        self.pointer.position()
    }

    fn mouse_hide(&mut self) -> Result<(), PlatformError> {
        self.pointer.hide()
    }

    fn mouse_show(&mut self) -> Result<(), PlatformError> {
        self.pointer.show()
    }

    fn mouse_move(&mut self, screen: ScreenId, x: i32, y: i32) -> Result<(), PlatformError> {
        self.pointer.move_to(screen, x, y)
    }

    fn scroll(&mut self, direction: ScrollDirection) -> Result<(), PlatformError> {
        self.pointer.scroll(direction)
    }

    fn screen_list(&self) -> &[Screen] {
        self.pointer.screens()
    }

    fn screen_get_dimensions(&self, screen: ScreenId) -> Option<(u32, u32)> {
        self.pointer
            .registry()
            .get(screen)
            .map(|s| (s.width, s.height))
    }

    fn screen_draw_box(
        &mut self,
        _screen: ScreenId,
        _x: i32,
        _y: i32,
        _width: u32,
        _height: u32,
        _color: Color,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported("drawing"))
    }

    fn screen_clear(&mut self, _screen: ScreenId) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported("drawing"))
    }

    fn hint_draw(&mut self, _screen: ScreenId, _hints: &[Hint]) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported("drawing"))
    }

    fn show_error_modal(&mut self, title: &str, message: &str) {
        error!(title, message, "error");
        eprintln!("{title}: {message}");
    }
}
