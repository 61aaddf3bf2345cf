//! Mouse and keyboard types.
//!
//! Platform-agnostic representations of buttons, scroll directions and
//! keyboard events. Backends translate these to and from native codes.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A mouse button, numbered from 1 the way users and configs refer to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub const ALL: [Self; 3] = [Self::Left, Self::Middle, Self::Right];

    /// Map a 1-based button number; `None` outside the tracked range.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::Left),
            2 => Some(Self::Middle),
            3 => Some(Self::Right),
            _ => None,
        }
    }

    /// The 1-based button number.
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Self::Left => 1,
            Self::Middle => 2,
            Self::Right => 3,
        }
    }

    /// Zero-based slot in a button-state array.
    #[must_use]
    pub fn slot(self) -> usize {
        usize::from(self.index() - 1)
    }
}

/// Scroll direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    #[must_use]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

impl FromStr for ScrollDirection {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(ParseError::ScrollDirection(s.to_string())),
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown scroll direction: {0:?} (expected up, down, left or right)")]
    ScrollDirection(String),
}

bitflags! {
    /// Modifier keys held when a key event was produced.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        const META = 1 << 3;
    }
}

/// A keyboard event delivered while the keyboard is grabbed.
///
/// `code` is the backend's native key code, resolvable to a name through the
/// backend's keycode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEvent {
    pub code: u8,
    pub mods: Modifiers,
    pub pressed: bool,
}

impl InputEvent {
    #[must_use]
    pub fn press(code: u8, mods: Modifiers) -> Self {
        Self {
            code,
            mods,
            pressed: true,
        }
    }

    #[must_use]
    pub fn release(code: u8, mods: Modifiers) -> Self {
        Self {
            code,
            mods,
            pressed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_index_roundtrip() {
        for button in MouseButton::ALL {
            assert_eq!(MouseButton::from_index(button.index()), Some(button));
        }
        assert_eq!(MouseButton::Left.slot(), 0);
        assert_eq!(MouseButton::Right.slot(), 2);
    }

    #[test]
    fn button_out_of_range() {
        assert_eq!(MouseButton::from_index(0), None);
        assert_eq!(MouseButton::from_index(4), None);
    }

    #[test]
    fn scroll_direction_parse() {
        assert_eq!("up".parse::<ScrollDirection>(), Ok(ScrollDirection::Up));
        assert_eq!("Left".parse::<ScrollDirection>(), Ok(ScrollDirection::Left));
        assert!("sideways".parse::<ScrollDirection>().is_err());
        assert!(ScrollDirection::Right.is_horizontal());
        assert!(!ScrollDirection::Down.is_horizontal());
    }

    #[test]
    fn press_and_release_differ() {
        let mods = Modifiers::SHIFT | Modifiers::CONTROL;
        assert_ne!(InputEvent::press(38, mods), InputEvent::release(38, mods));
        assert_eq!(InputEvent::press(38, mods).mods, mods);
    }
}
