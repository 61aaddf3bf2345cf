//! Screen geometry in the shared virtual coordinate space.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a screen within the registry snapshot taken at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenId(pub u32);

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical display.
///
/// `x`/`y` are the screen's origin in the display server's global space,
/// which may be negative when a monitor sits left of or above the primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
    pub id: ScreenId,
    pub x: i32,
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Screen {
    #[must_use]
    pub fn new(index: u32, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            id: ScreenId(index),
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge in global coordinates.
    #[must_use]
    pub fn right(&self) -> i32 {
        self.x
            .saturating_add(i32::try_from(self.width).unwrap_or(i32::MAX))
    }

    /// Exclusive bottom edge in global coordinates.
    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.y
            .saturating_add(i32::try_from(self.height).unwrap_or(i32::MAX))
    }

    /// Whether a global coordinate lies on this screen.
    #[must_use]
    pub fn contains(&self, gx: i32, gy: i32) -> bool {
        gx >= self.x && gx < self.right() && gy >= self.y && gy < self.bottom()
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "screen {}: {}x{}{:+}{:+}",
            self.id, self.width, self.height, self.x, self.y
        )
    }
}

/// Extent of the union of all screens: `min` is inclusive, `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    /// Smallest box covering every screen, or `None` for an empty slice.
    #[must_use]
    pub fn of(screens: &[Screen]) -> Option<Self> {
        let first = screens.first()?;
        let init = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.right(),
            max_y: first.bottom(),
        };
        Some(screens.iter().skip(1).fold(init, |acc, s| Self {
            min_x: acc.min_x.min(s.x),
            min_y: acc.min_y.min(s.y),
            max_x: acc.max_x.max(s.right()),
            max_y: acc.max_y.max(s.bottom()),
        }))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.max_x.abs_diff(self.min_x)
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.max_y.abs_diff(self.min_y)
    }
}

/// Screen-relative pointer location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub screen: ScreenId,
    pub x: i32,
    pub y: i32,
}

/// A labelled box drawn over a screen, in screen-local coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub label: String,
}
