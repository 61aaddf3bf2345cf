//! Mock backend for testing.
//!
//! [`MockPlatform`] runs the real keymap, screen registry, pointer controller
//! and file monitor over a recording device. Every native request lands in a
//! shared call log that tests read through a clonable [`MockHandle`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pointwarp_types::{
    Color, Hint, InputEvent, MouseButton, PointerPosition, Screen, ScreenId, ScrollDirection,
};
use tracing::{debug, error};

use crate::error::PlatformError;
use crate::keymap::{KeyTable, Resolver};
use crate::monitor::FileMonitor;
use crate::pointer::{PointerController, PointerDevice};
use crate::screen::{ScreenRegistry, VirtualMotion};
use crate::Platform;

/// A US layout in X keycode numbering (evdev code + 8).
pub const US_KEYMAP: &[(u8, &str, &str)] = &[
    (9, "Escape", ""),
    (10, "1", "exclam"),
    (11, "2", "at"),
    (12, "3", "numbersign"),
    (13, "4", "dollar"),
    (14, "5", "percent"),
    (15, "6", "asciicircum"),
    (16, "7", "ampersand"),
    (17, "8", "asterisk"),
    (18, "9", "parenleft"),
    (19, "0", "parenright"),
    (20, "minus", "underscore"),
    (21, "equal", "plus"),
    (22, "BackSpace", ""),
    (23, "Tab", "ISO_Left_Tab"),
    (24, "q", "Q"),
    (25, "w", "W"),
    (26, "e", "E"),
    (27, "r", "R"),
    (28, "t", "T"),
    (29, "y", "Y"),
    (30, "u", "U"),
    (31, "i", "I"),
    (32, "o", "O"),
    (33, "p", "P"),
    (34, "bracketleft", "braceleft"),
    (35, "bracketright", "braceright"),
    (36, "Return", ""),
    (37, "Control_L", ""),
    (38, "a", "A"),
    (39, "s", "S"),
    (40, "d", "D"),
    (41, "f", "F"),
    (42, "g", "G"),
    (43, "h", "H"),
    (44, "j", "J"),
    (45, "k", "K"),
    (46, "l", "L"),
    (47, "semicolon", "colon"),
    (48, "apostrophe", "quotedbl"),
    (49, "grave", "asciitilde"),
    (50, "Shift_L", ""),
    (51, "backslash", "bar"),
    (52, "z", "Z"),
    (53, "x", "X"),
    (54, "c", "C"),
    (55, "v", "V"),
    (56, "b", "B"),
    (57, "n", "N"),
    (58, "m", "M"),
    (59, "comma", "less"),
    (60, "period", "greater"),
    (61, "slash", "question"),
    (62, "Shift_R", ""),
    (64, "Alt_L", "Meta_L"),
    (65, "space", ""),
    (66, "Caps_Lock", ""),
    (67, "F1", ""),
    (68, "F2", ""),
    (69, "F3", ""),
    (70, "F4", ""),
    (71, "F5", ""),
    (72, "F6", ""),
    (73, "F7", ""),
    (74, "F8", ""),
    (75, "F9", ""),
    (76, "F10", ""),
    (111, "Up", ""),
    (113, "Left", ""),
    (114, "Right", ""),
    (116, "Down", ""),
    (119, "Delete", ""),
    (133, "Super_L", ""),
];

/// A native request as the display server would have received it.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Motion(VirtualMotion),
    Button { button: MouseButton, pressed: bool },
    Scroll(ScrollDirection),
    Frame,
    CursorVisible(bool),
    Commit,
    DrawBox {
        screen: ScreenId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    },
    Clear(ScreenId),
    Hints { screen: ScreenId, labels: Vec<String> },
    ErrorModal { title: String, message: String },
    Grab,
    Ungrab,
    CopySelection,
}

/// Which optional capabilities the mock advertises.
#[derive(Debug, Clone, Copy)]
pub struct MockOptions {
    pub horizontal_scroll: bool,
    pub cursor_hiding: bool,
    /// Global position answered before the first move; `None` if the
    /// backend cannot query.
    pub query_position: Option<(i32, i32)>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            horizontal_scroll: true,
            cursor_hiding: true,
            query_position: None,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<NativeCall>,
    events: VecDeque<InputEvent>,
    grabbed: bool,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Recording pointer device.
pub struct MockDevice {
    state: Shared,
    options: MockOptions,
}

impl MockDevice {
    fn record(&self, call: NativeCall) {
        lock(&self.state).calls.push(call);
    }
}

impl PointerDevice for MockDevice {
    fn motion_absolute(&mut self, motion: VirtualMotion) -> Result<(), PlatformError> {
        self.record(NativeCall::Motion(motion));
        Ok(())
    }

    fn button(&mut self, button: MouseButton, pressed: bool) -> Result<(), PlatformError> {
        self.record(NativeCall::Button { button, pressed });
        Ok(())
    }

    fn scroll(&mut self, direction: ScrollDirection) -> Result<(), PlatformError> {
        if direction.is_horizontal() && !self.options.horizontal_scroll {
            return Err(PlatformError::NotSupported("horizontal scrolling"));
        }
        self.record(NativeCall::Scroll(direction));
        Ok(())
    }

    fn frame(&mut self) -> Result<(), PlatformError> {
        self.record(NativeCall::Frame);
        Ok(())
    }

    fn query_position(&mut self) -> Option<(i32, i32)> {
        self.options.query_position
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<(), PlatformError> {
        if !self.options.cursor_hiding {
            return Err(PlatformError::NotSupported("cursor hiding"));
        }
        self.record(NativeCall::CursorVisible(visible));
        Ok(())
    }
}

/// In-memory platform backend.
pub struct MockPlatform {
    pointer: PointerController<MockDevice>,
    resolver: Resolver,
    monitor: FileMonitor,
    state: Shared,
}

impl MockPlatform {
    /// A mock with the given layout, the US keymap and every capability.
    pub fn new(screens: Vec<Screen>) -> Result<Self, PlatformError> {
        Self::with_options(screens, MockOptions::default())
    }

    pub fn with_options(screens: Vec<Screen>, options: MockOptions) -> Result<Self, PlatformError> {
        let registry = ScreenRegistry::new(screens)?;
        let state = Shared::default();
        let device = MockDevice {
            state: Arc::clone(&state),
            options,
        };
        Ok(Self {
            pointer: PointerController::new(device, registry),
            resolver: Resolver::new(KeyTable::from_names(US_KEYMAP.iter().copied())),
            monitor: FileMonitor::new(),
            state,
        })
    }

    /// Use `monitor` instead of the default-capacity one.
    #[must_use]
    pub fn with_monitor(mut self, monitor: FileMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    /// Get a clonable handle for observing the mock from tests.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn record(&self, call: NativeCall) {
        lock(&self.state).calls.push(call);
    }

    fn screen(&self, id: ScreenId) -> Result<&Screen, PlatformError> {
        self.pointer
            .registry()
            .get(id)
            .ok_or(PlatformError::UnknownScreen(id))
    }
}

/// Clonable observer handle for [`MockPlatform`].
#[derive(Clone)]
pub struct MockHandle {
    state: Shared,
}

impl MockHandle {
    /// Snapshot of every native call so far.
    pub fn calls(&self) -> Vec<NativeCall> {
        lock(&self.state).calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        lock(&self.state).calls.clear();
    }

    /// Number of native button presses (not releases) of `button`.
    pub fn presses(&self, button: MouseButton) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| {
                matches!(c, NativeCall::Button { button: b, pressed: true } if *b == button)
            })
            .count()
    }

    /// Queue a key event for `input_next_event`.
    pub fn push_event(&self, event: InputEvent) {
        lock(&self.state).events.push_back(event);
    }

    pub fn is_grabbed(&self) -> bool {
        lock(&self.state).grabbed
    }
}

impl Platform for MockPlatform {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    fn monitor_file(&mut self, path: &Path) -> Result<(), PlatformError> {
        self.monitor.watch(path)
    }

    fn poll_monitored_files(&mut self) -> Vec<PathBuf> {
        self.monitor.poll_changes()
    }

    fn commit(&mut self) -> Result<(), PlatformError> {
        self.record(NativeCall::Commit);
        Ok(())
    }

    fn copy_selection(&mut self) -> Result<(), PlatformError> {
        self.record(NativeCall::CopySelection);
        Ok(())
    }

    fn input_grab_keyboard(&mut self) -> Result<(), PlatformError> {
        let mut state = lock(&self.state);
        state.grabbed = true;
        state.calls.push(NativeCall::Grab);
        Ok(())
    }

    fn input_ungrab_keyboard(&mut self) -> Result<(), PlatformError> {
        let mut state = lock(&self.state);
        state.grabbed = false;
        state.calls.push(NativeCall::Ungrab);
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
        match lock(&self.state).events.pop_front() {
            Some(ev) => Ok(Some(ev)),
            None if timeout.is_some() => Ok(None),
            // Nothing will ever arrive; an unbounded wait would hang.
            None => Err(PlatformError::Protocol("mock event queue is empty".into())),
        }
    }

    fn input_wait(
        &mut self,
        events: &[InputEvent],
        timeout: Option<Duration>,
    ) -> Result<Option<InputEvent>, PlatformError> {
        while let Some(ev) = self.input_next_event(timeout)? {
            if events.contains(&ev) {
                return Ok(Some(ev));
            }
            debug!(code = ev.code, "discarding unmatched event");
        }
        Ok(None)
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
        self.screen(screen)?;
        self.record(NativeCall::DrawBox {
            screen,
            x,
            y,
            width,
            height,
            color,
        });
        Ok(())
    }

    fn screen_clear(&mut self, screen: ScreenId) -> Result<(), PlatformError> {
        self.screen(screen)?;
        self.record(NativeCall::Clear(screen));
        Ok(())
    }

    fn hint_draw(&mut self, screen: ScreenId, hints: &[Hint]) -> Result<(), PlatformError> {
        self.screen(screen)?;
        self.record(NativeCall::Hints {
            screen,
            labels: hints.iter().map(|h| h.label.clone()).collect(),
        });
        Ok(())
    }

    fn show_error_modal(&mut self, title: &str, message: &str) {
        error!(title, message, "error modal");
        self.record(NativeCall::ErrorModal {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
