//! X11 backend: Xlib connection, XTest injection, Xinerama screens, XFixes
//! cursor hiding.

mod connection;
mod draw;
mod keymap;
mod pointer;

use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;
use std::time::{Duration, Instant};

use pointwarp_types::{
    Color, Hint, InputEvent, Modifiers, PointerPosition, Screen, ScreenId, ScrollDirection,
};
use tracing::{debug, error, info};
use x11::{keysym, xinerama, xlib, xtest};

use self::connection::XConnection;
use self::draw::Surface;
use self::pointer::XPointer;
use crate::config::StyleConfig;
use crate::error::PlatformError;
use crate::keymap::Resolver;
use crate::monitor::FileMonitor;
use crate::pointer::PointerController;
use crate::screen::ScreenRegistry;
use crate::Platform;

/// How long to keep retrying a keyboard grab held by another client.
const GRAB_TIMEOUT: Duration = Duration::from_secs(1);
const GRAB_RETRY: Duration = Duration::from_millis(10);

pub struct X11Platform {
    conn: Rc<XConnection>,
    pointer: PointerController<XPointer>,
    resolver: Resolver,
    monitor: FileMonitor,
    surface: Surface,
}

impl X11Platform {
    /// Open the display, enumerate screens and build the keycode table.
    pub fn connect(style: &StyleConfig) -> Result<Self, PlatformError> {
        let conn = Rc::new(XConnection::open()?);
        let screens = ScreenRegistry::new(enumerate_screens(&conn))?;
        for screen in screens.list() {
            info!(%screen, "found screen");
        }
        let resolver = Resolver::new(keymap::build_key_table(&conn));
        let surface = Surface::new(Rc::clone(&conn), style.hint_bgcolor()?, style.hint_fgcolor()?);
        Ok(Self {
            pointer: PointerController::new(XPointer::new(Rc::clone(&conn)), screens),
            conn,
            resolver,
            monitor: FileMonitor::new(),
            surface,
        })
    }

    fn screen(&self, id: ScreenId) -> Result<Screen, PlatformError> {
        self.pointer
            .registry()
            .get(id)
            .cloned()
            .ok_or(PlatformError::UnknownScreen(id))
    }

    fn fake_key(&self, keysym: u32, pressed: bool) {
        let dpy = self.conn.raw();
        // SAFETY: valid display.
        unsafe {
            let code = xlib::XKeysymToKeycode(dpy, xlib::KeySym::from(keysym));
            xtest::XTestFakeKeyEvent(dpy, code.into(), c_int::from(pressed), xlib::CurrentTime);
        }
    }
}

/// Xinerama heads, or the whole root window when Xinerama is inactive.
fn enumerate_screens(conn: &XConnection) -> Vec<Screen> {
    let mut screens = Vec::new();
    // SAFETY: valid display; the returned array holds `count` entries and
    // is released with XFree.
    unsafe {
        if xinerama::XineramaIsActive(conn.raw()) != 0 {
            let mut count = 0;
            let info = xinerama::XineramaQueryScreens(conn.raw(), &mut count);
            if !info.is_null() {
                let heads = std::slice::from_raw_parts(info, usize::try_from(count).unwrap_or(0));
                for (index, head) in (0u32..).zip(heads) {
                    screens.push(Screen::new(
                        index,
                        i32::from(head.x_org),
                        i32::from(head.y_org),
                        u32::try_from(head.width).unwrap_or(0),
                        u32::try_from(head.height).unwrap_or(0),
                    ));
                }
                xlib::XFree(info.cast());
            }
        }
    }
    if screens.is_empty() {
        debug!("xinerama inactive, using root window");
        let (w, h) = conn.root_size();
        if w > 0 && h > 0 {
            screens.push(Screen::new(0, 0, 0, w, h));
        }
    }
    screens
}

fn modifiers(state: u32) -> Modifiers {
    let mut mods = Modifiers::empty();
    mods.set(Modifiers::SHIFT, state & xlib::ShiftMask != 0);
    mods.set(Modifiers::CONTROL, state & xlib::ControlMask != 0);
    mods.set(Modifiers::ALT, state & xlib::Mod1Mask != 0);
    mods.set(Modifiers::META, state & xlib::Mod4Mask != 0);
    mods
}

impl Platform for X11Platform {
    fn backend_name(&self) -> &'static str {
        "x11"
    }

    fn monitor_file(&mut self, path: &Path) -> Result<(), PlatformError> {
        self.monitor.watch(path)
    }

    fn poll_monitored_files(&mut self) -> Vec<PathBuf> {
        self.monitor.poll_changes()
    }

    fn commit(&mut self) -> Result<(), PlatformError> {
        self.conn.sync();
        Ok(())
    }

    fn copy_selection(&mut self) -> Result<(), PlatformError> {
        self.fake_key(keysym::XK_Control_L, true);
        self.fake_key(keysym::XK_Insert, true);
        self.fake_key(keysym::XK_Control_L, false);
        self.fake_key(keysym::XK_Insert, false);
        self.conn.sync();

        let status = Command::new("sh")
            .args(["-c", "xclip -o | xclip -selection CLIPBOARD"])
            .status()?;
        if !status.success() {
            return Err(PlatformError::Protocol(format!("xclip exited with {status}")));
        }
        Ok(())
    }

    fn input_grab_keyboard(&mut self) -> Result<(), PlatformError> {
        let deadline = Instant::now() + GRAB_TIMEOUT;
        loop {
            // SAFETY: valid display and root window.
            let rc = unsafe {
                xlib::XGrabKeyboard(
                    self.conn.raw(),
                    self.conn.root(),
                    xlib::False,
                    xlib::GrabModeAsync,
                    xlib::GrabModeAsync,
                    xlib::CurrentTime,
                )
            };
            if rc == xlib::GrabSuccess {
                debug!("keyboard grabbed");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(PlatformError::Protocol(format!(
                    "keyboard grab failed with status {rc}"
                )));
            }
            std::thread::sleep(GRAB_RETRY);
        }
    }

    fn input_ungrab_keyboard(&mut self) -> Result<(), PlatformError> {
        // SAFETY: valid display.
        unsafe { xlib::XUngrabKeyboard(self.conn.raw(), xlib::CurrentTime) };
        self.conn.flush();
        debug!("keyboard released");
        Ok(())
    }

    fn input_lookup_code(&self, name: &str) -> Option<(u8, bool)> {
        self.resolver.lookup_code(name)
    }

    fn input_lookup_name(&self, code: u8, shifted: bool) -> Option<&str> {
        self.resolver.lookup_name(code, shifted)
    }

    fn input_next_event(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Option<InputEvent>, PlatformError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            while self.conn.pending() > 0 {
                let ev = self.conn.next_event();
                let pressed = match ev.get_type() {
                    xlib::KeyPress => true,
                    xlib::KeyRelease => false,
                    _ => continue,
                };
                let key = xlib::XKeyEvent::from(ev);
                let Ok(code) = u8::try_from(key.keycode) else {
                    continue;
                };
                return Ok(Some(InputEvent {
                    code,
                    mods: modifiers(key.state),
                    pressed,
                }));
            }
            let remaining = match deadline {
                Some(d) => match d.checked_duration_since(Instant::now()) {
                    Some(r) if !r.is_zero() => Some(r),
                    _ => return Ok(None),
                },
                None => None,
            };
            self.conn.wait_readable(remaining)?;
        }
    }

    fn input_wait(
        &mut self,
        events: &[InputEvent],
        timeout: Option<Duration>,
    ) -> Result<Option<InputEvent>, PlatformError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let Some(ev) = self.input_next_event(remaining)? else {
                return Ok(None);
            };
            if events.contains(&ev) {
                return Ok(Some(ev));
            }
        }
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
        screen: ScreenId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    ) -> Result<(), PlatformError> {
        let screen = self.screen(screen)?;
        self.surface.draw_box(&screen, x, y, width, height, color);
        self.conn.flush();
        Ok(())
    }

    fn screen_clear(&mut self, screen: ScreenId) -> Result<(), PlatformError> {
        self.screen(screen)?;
        self.surface.clear(screen);
        Ok(())
    }

    fn hint_draw(&mut self, screen: ScreenId, hints: &[Hint]) -> Result<(), PlatformError> {
        let screen = self.screen(screen)?;
        self.surface.draw_hints(&screen, hints);
        Ok(())
    }

    fn show_error_modal(&mut self, title: &str, message: &str) {
        error!(title, message, "showing error modal");
        self.surface.error_modal(title, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_masks() {
        assert_eq!(modifiers(0), Modifiers::empty());
        assert_eq!(
            modifiers(xlib::ShiftMask | xlib::Mod4Mask),
            Modifiers::SHIFT | Modifiers::META
        );
        assert_eq!(
            modifiers(xlib::ControlMask | xlib::Mod1Mask | xlib::LockMask),
            Modifiers::CONTROL | Modifiers::ALT
        );
    }
}
