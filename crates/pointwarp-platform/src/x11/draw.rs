//! Override-redirect windows for boxes and hints, and the error dialog.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_ulong};
use std::rc::Rc;
use std::time::{Duration, Instant};

use pointwarp_types::{Color, Hint, Screen, ScreenId};
use tracing::{debug, warn};
use x11::xlib;

use super::connection::XConnection;

const MODAL_WIDTH: u32 = 400;
const MODAL_HEIGHT: u32 = 150;
const MODAL_TIMEOUT: Duration = Duration::from_secs(10);
const LINE_HEIGHT: c_int = 20;

/// Windows currently mapped, per screen.
pub(crate) struct Surface {
    conn: Rc<XConnection>,
    windows: HashMap<ScreenId, Vec<xlib::Window>>,
    /// Pixels allocated from the default colormap.
    pixels: RefCell<HashMap<Color, c_ulong>>,
    hint_bg: Color,
    hint_fg: Color,
}

impl Surface {
    pub(crate) fn new(conn: Rc<XConnection>, hint_bg: Color, hint_fg: Color) -> Self {
        Self {
            conn,
            windows: HashMap::new(),
            pixels: RefCell::default(),
            hint_bg,
            hint_fg,
        }
    }

    /// Map a filled rectangle at a screen-local position.
    pub(crate) fn draw_box(
        &mut self,
        screen: &Screen,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    ) -> xlib::Window {
        let win = self.create_window(screen.x + x, screen.y + y, width, height, color);
        // SAFETY: valid display and freshly created window.
        unsafe { xlib::XMapRaised(self.conn.raw(), win) };
        self.windows.entry(screen.id).or_default().push(win);
        win
    }

    /// One labelled box per hint.
    pub(crate) fn draw_hints(&mut self, screen: &Screen, hints: &[Hint]) {
        let (bg, fg) = (self.hint_bg, self.hint_fg);
        let drawn: Vec<_> = hints
            .iter()
            .map(|h| (self.draw_box(screen, h.x, h.y, h.width, h.height, bg), h))
            .collect();
        // Text only sticks once the windows are mapped.
        self.conn.sync();
        for (win, hint) in drawn {
            let baseline = c_int::try_from(hint.height / 2 + 5).unwrap_or(0);
            self.draw_text(win, self.pixel(fg), 4, baseline, &hint.label);
        }
        self.conn.flush();
        debug!(screen = %screen.id, count = hints.len(), "drew hints");
    }

    /// Destroy every window on `screen`.
    pub(crate) fn clear(&mut self, screen: ScreenId) {
        if let Some(wins) = self.windows.remove(&screen) {
            for win in wins {
                // SAFETY: valid display; `win` was created by this surface.
                unsafe { xlib::XDestroyWindow(self.conn.raw(), win) };
            }
            self.conn.flush();
        }
    }

    /// Centered dialog on the default screen. Returns after a key press,
    /// a click, or ten seconds.
    pub(crate) fn error_modal(&mut self, title: &str, message: &str) {
        let conn = Rc::clone(&self.conn);
        let dpy = conn.raw();
        let (scr_w, scr_h) = conn.root_size();
        let x = i32::try_from(scr_w.saturating_sub(MODAL_WIDTH) / 2).unwrap_or(0);
        let y = i32::try_from(scr_h.saturating_sub(MODAL_HEIGHT) / 2).unwrap_or(0);

        // SAFETY: valid display, root window and screen number.
        let (win, black) = unsafe {
            let black = xlib::XBlackPixel(dpy, conn.screen());
            let white = xlib::XWhitePixel(dpy, conn.screen());
            let win = xlib::XCreateSimpleWindow(
                dpy,
                conn.root(),
                x,
                y,
                MODAL_WIDTH,
                MODAL_HEIGHT,
                2,
                black,
                white,
            );
            (win, black)
        };
        if let Ok(title) = CString::new(title) {
            // SAFETY: valid window and NUL-terminated title.
            unsafe { xlib::XStoreName(dpy, win, title.as_ptr()) };
        }
        // SAFETY: valid display and window.
        unsafe {
            xlib::XSelectInput(
                dpy,
                win,
                xlib::ExposureMask | xlib::KeyPressMask | xlib::ButtonPressMask,
            );
            xlib::XMapRaised(dpy, win);
        }
        conn.sync();

        let draw = |surface: &Self| {
            let mut baseline = 30;
            for line in message.lines() {
                surface.draw_text(win, black, 10, baseline, line);
                baseline += LINE_HEIGHT;
            }
            let footer = c_int::try_from(MODAL_HEIGHT).unwrap_or(0) - LINE_HEIGHT;
            surface.draw_text(win, black, 10, footer, "Press any key or click to dismiss");
            conn.flush();
        };
        draw(&*self);

        let deadline = Instant::now() + MODAL_TIMEOUT;
        'wait: loop {
            while conn.pending() > 0 {
                let ev = conn.next_event();
                match ev.get_type() {
                    xlib::Expose => draw(&*self),
                    xlib::KeyPress | xlib::ButtonPress => break 'wait,
                    _ => {}
                }
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            match conn.wait_readable(Some(remaining)) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!(error = %e, "error modal wait failed");
                    break;
                }
            }
        }

        // SAFETY: valid display and window.
        unsafe { xlib::XDestroyWindow(dpy, win) };
        conn.flush();
    }

    fn create_window(&self, x: i32, y: i32, width: u32, height: u32, color: Color) -> xlib::Window {
        let dpy = self.conn.raw();
        let pixel = self.pixel(color);
        // SAFETY: valid display and root window; a zeroed attribute struct
        // is valid once the masked fields are set.
        unsafe {
            let win = xlib::XCreateSimpleWindow(
                dpy,
                self.conn.root(),
                x,
                y,
                width.max(1),
                height.max(1),
                0,
                pixel,
                pixel,
            );
            let mut attrs: xlib::XSetWindowAttributes = std::mem::zeroed();
            attrs.override_redirect = xlib::True;
            attrs.backing_store = xlib::Always;
            xlib::XChangeWindowAttributes(
                dpy,
                win,
                xlib::CWOverrideRedirect | xlib::CWBackingStore,
                &mut attrs,
            );
            win
        }
    }

    /// Pixel value for `color` on the default colormap. Falls back to the
    /// packed RGB value, which is only right on TrueColor visuals.
    fn pixel(&self, color: Color) -> c_ulong {
        if let Some(&pixel) = self.pixels.borrow().get(&color) {
            return pixel;
        }
        let dpy = self.conn.raw();
        let mut xcolor = x_color(color);
        // SAFETY: valid display and screen number; XAllocColor only writes
        // the pixel and channels of `xcolor`.
        let status = unsafe {
            let cmap = xlib::XDefaultColormap(dpy, self.conn.screen());
            xlib::XAllocColor(dpy, cmap, &mut xcolor)
        };
        let pixel = if status == 0 {
            warn!(?color, "cannot allocate color, using its rgb value");
            c_ulong::from(color.rgb24())
        } else {
            xcolor.pixel
        };
        self.pixels.borrow_mut().insert(color, pixel);
        pixel
    }

    fn draw_text(&self, win: xlib::Window, pixel: c_ulong, x: c_int, y: c_int, text: &str) {
        let Ok(len) = c_int::try_from(text.len()) else {
            return;
        };
        let dpy = self.conn.raw();
        // SAFETY: valid display and window; XDrawString reads `len` bytes
        // from `text` without requiring NUL termination.
        unsafe {
            let gc = xlib::XCreateGC(dpy, win, 0, std::ptr::null_mut());
            xlib::XSetForeground(dpy, gc, pixel);
            xlib::XDrawString(dpy, win, gc, x, y, text.as_ptr().cast(), len);
            xlib::XFreeGC(dpy, gc);
        }
    }
}

/// `color` with its channels scaled to the 16-bit range of `XColor`.
fn x_color(color: Color) -> xlib::XColor {
    xlib::XColor {
        pixel: 0,
        red: u16::from(color.r) * 257,
        green: u16::from(color.g) * 257,
        blue: u16::from(color.b) * 257,
        flags: (xlib::DoRed | xlib::DoGreen | xlib::DoBlue) as c_char,
        pad: 0,
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        let screens: Vec<_> = self.windows.keys().copied().collect();
        for screen in screens {
            self.clear(screen);
        }
    }
}
