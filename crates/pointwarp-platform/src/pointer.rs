//! Pointer controller: screen-relative motion, button state, scrolling.
//!
//! The controller owns the backend's [`PointerDevice`] and the only copy of
//! the button-down state. Dropping the controller releases every button
//! still held and flushes the device, so an early return or a panic never
//! leaves the user's pointer stuck in a pressed state.

use pointwarp_types::{MouseButton, PointerPosition, Screen, ScreenId, ScrollDirection};
use tracing::{debug, trace, warn};

use crate::error::PlatformError;
use crate::screen::{ScreenRegistry, VirtualMotion};

/// Native pointer primitives a backend provides.
///
/// Requests may be buffered until [`frame`](Self::frame), which ends a
/// logical group of events and flushes it to the display server.
pub trait PointerDevice {
    /// Absolute motion in the virtual pointer space.
    fn motion_absolute(&mut self, motion: VirtualMotion) -> Result<(), PlatformError>;

    /// Press or release a button.
    fn button(&mut self, button: MouseButton, pressed: bool) -> Result<(), PlatformError>;

    /// One scroll step. Backends without horizontal scrolling return
    /// [`PlatformError::NotSupported`] without emitting anything.
    fn scroll(&mut self, direction: ScrollDirection) -> Result<(), PlatformError>;

    /// End the current event group and flush it.
    fn frame(&mut self) -> Result<(), PlatformError>;

    /// Current pointer location in global coordinates, if the backend can
    /// query it without blocking.
    fn query_position(&mut self) -> Option<(i32, i32)> {
        None
    }

    fn set_cursor_visible(&mut self, _visible: bool) -> Result<(), PlatformError> {
        Err(PlatformError::NotSupported("cursor hiding"))
    }
}

/// Tracks pointer position and button state over a [`PointerDevice`].
pub struct PointerController<D: PointerDevice> {
    device: D,
    screens: ScreenRegistry,
    position: Option<PointerPosition>,
    buttons: [bool; MouseButton::ALL.len()],
}

impl<D: PointerDevice> PointerController<D> {
    pub fn new(device: D, screens: ScreenRegistry) -> Self {
        Self {
            device,
            screens,
            position: None,
            buttons: [false; MouseButton::ALL.len()],
        }
    }

    #[must_use]
    pub fn screens(&self) -> &[Screen] {
        self.screens.list()
    }

    #[must_use]
    pub fn registry(&self) -> &ScreenRegistry {
        &self.screens
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Move to `(x, y)` relative to `screen`.
    pub fn move_to(&mut self, screen: ScreenId, x: i32, y: i32) -> Result<(), PlatformError> {
        let motion = self.screens.to_virtual(screen, x, y)?;
        trace!(%screen, x, y, vx = motion.x, vy = motion.y, "pointer motion");
        self.device.motion_absolute(motion)?;
        self.device.frame()?;
        self.position = Some(PointerPosition { screen, x, y });
        Ok(())
    }

    /// Press a button. Pressing a held button emits nothing.
    pub fn down(&mut self, button: u8) -> Result<(), PlatformError> {
        let button = Self::button(button)?;
        if self.buttons[button.slot()] {
            debug!(?button, "button already down");
            return Ok(());
        }
        self.device.button(button, true)?;
        self.device.frame()?;
        self.buttons[button.slot()] = true;
        Ok(())
    }

    /// Release a button. The state is cleared even when the native release
    /// fails, and a release is always emitted.
    pub fn up(&mut self, button: u8) -> Result<(), PlatformError> {
        let button = Self::button(button)?;
        self.buttons[button.slot()] = false;
        self.device.button(button, false)?;
        self.device.frame()
    }

    /// Press and release in a single event group. A held button is only
    /// released.
    pub fn click(&mut self, button: u8) -> Result<(), PlatformError> {
        let button = Self::button(button)?;
        if std::mem::take(&mut self.buttons[button.slot()]) {
            debug!(?button, "click on held button, releasing only");
        } else {
            self.device.button(button, true)?;
        }
        self.device.button(button, false)?;
        self.device.frame()
    }

    pub fn scroll(&mut self, direction: ScrollDirection) -> Result<(), PlatformError> {
        self.device.scroll(direction)?;
        self.device.frame()
    }

    /// Whether a button is currently held; out-of-range buttons read as up.
    #[must_use]
    pub fn is_down(&self, button: u8) -> bool {
        MouseButton::from_index(button).is_some_and(|b| self.buttons[b.slot()])
    }

    /// Last position set by [`move_to`](Self::move_to), else the backend's
    /// query, else `None` for unknown.
    pub fn position(&mut self) -> Option<PointerPosition> {
        if let Some(pos) = self.position {
            return Some(pos);
        }
        let (gx, gy) = self.device.query_position()?;
        self.screens.locate(gx, gy)
    }

    pub fn hide(&mut self) -> Result<(), PlatformError> {
        self.device.set_cursor_visible(false)?;
        self.device.frame()
    }

    pub fn show(&mut self) -> Result<(), PlatformError> {
        self.device.set_cursor_visible(true)?;
        self.device.frame()
    }

    /// Release every held button and flush.
    ///
    /// Every release is attempted even after one fails; the first error is
    /// returned once the frame has been sent.
    pub fn release_all(&mut self) -> Result<(), PlatformError> {
        let mut first_err = None;
        for button in MouseButton::ALL {
            if std::mem::take(&mut self.buttons[button.slot()]) {
                debug!(?button, "releasing held button");
                if let Err(e) = self.device.button(button, false) {
                    warn!(?button, error = %e, "button release failed");
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        let framed = self.device.frame();
        match first_err {
            Some(e) => Err(e),
            None => framed,
        }
    }

    fn button(index: u8) -> Result<MouseButton, PlatformError> {
        MouseButton::from_index(index).ok_or(PlatformError::InvalidButton(index))
    }
}

impl<D: PointerDevice> Drop for PointerController<D> {
    fn drop(&mut self) {
        if let Err(e) = self.release_all() {
            warn!(error = %e, "failed to release buttons on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use pointwarp_types::Screen;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Motion(VirtualMotion),
        Button(MouseButton, bool),
        Scroll(ScrollDirection),
        Frame,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        horizontal: bool,
        query: Option<(i32, i32)>,
        /// Number of upcoming releases that fail.
        failing_releases: usize,
    }

    impl PointerDevice for &mut Recorder {
        fn motion_absolute(&mut self, motion: VirtualMotion) -> Result<(), PlatformError> {
            self.calls.push(Call::Motion(motion));
            Ok(())
        }

        fn button(&mut self, button: MouseButton, pressed: bool) -> Result<(), PlatformError> {
            if !pressed && self.failing_releases > 0 {
                self.failing_releases -= 1;
                return Err(PlatformError::Protocol("release rejected".into()));
            }
            self.calls.push(Call::Button(button, pressed));
            Ok(())
        }

        fn scroll(&mut self, direction: ScrollDirection) -> Result<(), PlatformError> {
            if direction.is_horizontal() && !self.horizontal {
                return Err(PlatformError::NotSupported("horizontal scrolling"));
            }
            self.calls.push(Call::Scroll(direction));
            Ok(())
        }

        fn frame(&mut self) -> Result<(), PlatformError> {
            self.calls.push(Call::Frame);
            Ok(())
        }

        fn query_position(&mut self) -> Option<(i32, i32)> {
            self.query
        }
    }

    fn registry() -> ScreenRegistry {
        ScreenRegistry::new(vec![
            Screen::new(0, -1920, 0, 1920, 1080),
            Screen::new(1, 0, 0, 1920, 1080),
        ])
        .unwrap()
    }

    fn presses(calls: &[Call]) -> usize {
        calls
            .iter()
            .filter(|c| matches!(c, Call::Button(_, true)))
            .count()
    }

    #[test]
    fn double_down_emits_once() {
        let mut rec = Recorder::default();
        {
            let mut ctl = PointerController::new(&mut rec, registry());
            ctl.down(1).unwrap();
            ctl.down(1).unwrap();
            assert!(ctl.is_down(1));
            ctl.up(1).unwrap();
            ctl.up(1).unwrap();
            assert!(!ctl.is_down(1));
        }
        assert_eq!(presses(&rec.calls), 1);
    }

    #[test]
    fn click_is_one_group_and_leaves_button_up() {
        let mut rec = Recorder::default();
        {
            let mut ctl = PointerController::new(&mut rec, registry());
            ctl.click(2).unwrap();
            assert!(!ctl.is_down(2));
        }
        assert_eq!(
            &rec.calls[..3],
            &[
                Call::Button(MouseButton::Middle, true),
                Call::Button(MouseButton::Middle, false),
                Call::Frame
            ]
        );
    }

    #[test]
    fn drop_releases_held_buttons() {
        let mut rec = Recorder::default();
        {
            let mut ctl = PointerController::new(&mut rec, registry());
            ctl.down(3).unwrap();
        }
        let tail = &rec.calls[rec.calls.len() - 2..];
        assert_eq!(tail, &[Call::Button(MouseButton::Right, false), Call::Frame]);
    }

    #[test]
    fn click_on_held_button_only_releases() {
        let mut rec = Recorder::default();
        {
            let mut ctl = PointerController::new(&mut rec, registry());
            ctl.down(1).unwrap();
            ctl.click(1).unwrap();
            assert!(!ctl.is_down(1));
        }
        assert_eq!(presses(&rec.calls), 1);
        assert_eq!(
            &rec.calls[..4],
            &[
                Call::Button(MouseButton::Left, true),
                Call::Frame,
                Call::Button(MouseButton::Left, false),
                Call::Frame
            ]
        );
    }

    #[test]
    fn failed_release_does_not_strand_other_buttons() {
        let mut rec = Recorder {
            failing_releases: 1,
            ..Recorder::default()
        };
        {
            let mut ctl = PointerController::new(&mut rec, registry());
            ctl.down(1).unwrap();
            ctl.down(3).unwrap();
            assert!(matches!(ctl.release_all(), Err(PlatformError::Protocol(_))));
            assert!(!ctl.is_down(1));
            assert!(!ctl.is_down(3));
        }
        let tail = &rec.calls[4..];
        assert_eq!(
            &tail[..2],
            &[Call::Button(MouseButton::Right, false), Call::Frame]
        );
    }

    #[test]
    fn drop_keeps_releasing_after_a_failure() {
        let mut rec = Recorder {
            failing_releases: 1,
            ..Recorder::default()
        };
        {
            let mut ctl = PointerController::new(&mut rec, registry());
            ctl.down(1).unwrap();
            ctl.down(3).unwrap();
        }
        let tail = &rec.calls[rec.calls.len() - 2..];
        assert_eq!(tail, &[Call::Button(MouseButton::Right, false), Call::Frame]);
    }

    #[test]
    fn invalid_button_is_rejected() {
        let mut rec = Recorder::default();
        let mut ctl = PointerController::new(&mut rec, registry());
        assert!(matches!(ctl.down(4), Err(PlatformError::InvalidButton(4))));
        assert!(matches!(ctl.click(0), Err(PlatformError::InvalidButton(0))));
        assert!(!ctl.is_down(4));
    }

    #[test]
    fn move_translates_and_records_position() {
        let mut rec = Recorder::default();
        {
            let mut ctl = PointerController::new(&mut rec, registry());
            assert_eq!(ctl.position(), None);
            ctl.move_to(ScreenId(1), 100, 50).unwrap();
            assert_eq!(
                ctl.position(),
                Some(PointerPosition {
                    screen: ScreenId(1),
                    x: 100,
                    y: 50
                })
            );
        }
        match &rec.calls[0] {
            Call::Motion(m) => assert_eq!((m.x, m.y, m.x_extent), (2020, 50, 3840)),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn move_to_unknown_screen_keeps_state() {
        let mut rec = Recorder::default();
        let mut ctl = PointerController::new(&mut rec, registry());
        assert!(ctl.move_to(ScreenId(9), 0, 0).is_err());
        assert_eq!(ctl.position(), None);
    }

    #[test]
    fn position_falls_back_to_query() {
        let mut rec = Recorder {
            query: Some((-1000, 20)),
            ..Recorder::default()
        };
        let mut ctl = PointerController::new(&mut rec, registry());
        assert_eq!(
            ctl.position(),
            Some(PointerPosition {
                screen: ScreenId(0),
                x: 920,
                y: 20
            })
        );
    }

    #[test]
    fn unsupported_horizontal_scroll_emits_nothing() {
        let mut rec = Recorder::default();
        {
            let mut ctl = PointerController::new(&mut rec, registry());
            assert!(matches!(
                ctl.scroll(ScrollDirection::Left),
                Err(PlatformError::NotSupported(_))
            ));
            ctl.scroll(ScrollDirection::Down).unwrap();
        }
        assert_eq!(&rec.calls[..2], &[Call::Scroll(ScrollDirection::Down), Call::Frame]);
    }

    #[test]
    fn hide_defaults_to_not_supported() {
        let mut rec = Recorder::default();
        let mut ctl = PointerController::new(&mut rec, registry());
        assert!(matches!(ctl.hide(), Err(PlatformError::NotSupported(_))));
    }
}
