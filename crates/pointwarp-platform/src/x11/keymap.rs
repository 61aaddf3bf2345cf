//! Keycode table from the server's core keymap.

use std::ffi::CStr;

use tracing::debug;
use x11::xlib;

use super::connection::XConnection;
use crate::keymap::KeyTable;

/// X keycodes start at 8.
const MIN_KEYCODE: u8 = 8;

/// Name levels 0 and 1 of group 0 for every keycode.
pub(crate) fn build_key_table(conn: &XConnection) -> KeyTable {
    let table = KeyTable::from_names((MIN_KEYCODE..=u8::MAX).map(|code| {
        (
            code,
            keysym_name(conn, code, 0).unwrap_or_default(),
            keysym_name(conn, code, 1).unwrap_or_default(),
        )
    }));
    debug!(named = table.named_count(), "built X11 keycode table");
    table
}

fn keysym_name(conn: &XConnection, code: u8, level: i32) -> Option<String> {
    // SAFETY: valid display; out-of-range codes yield NoSymbol.
    let sym = unsafe { xlib::XkbKeycodeToKeysym(conn.raw(), code, 0, level) };
    if sym == 0 {
        return None;
    }
    // SAFETY: the returned string is static inside Xlib, or null.
    let name = unsafe { xlib::XKeysymToString(sym) };
    if name.is_null() {
        return None;
    }
    // SAFETY: non-null, NUL-terminated.
    let name = unsafe { CStr::from_ptr(name) };
    Some(name.to_string_lossy().into_owned())
}
