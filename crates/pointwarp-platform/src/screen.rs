//! Screen registry and virtual pointer space translation.
//!
//! Screens are enumerated once when a backend connects; hotplug is not
//! tracked. The registry caches the bounding box of the layout, which defines
//! the virtual pointer space: a space that always starts at `(0, 0)` even when
//! the display server's global layout has a negative origin.

use pointwarp_types::{BoundingBox, PointerPosition, Screen, ScreenId};

use crate::error::PlatformError;

/// Bounding box of a screen layout, or `None` when there are no screens.
#[must_use]
pub fn bounding_box(screens: &[Screen]) -> Option<BoundingBox> {
    BoundingBox::of(screens)
}

/// An absolute motion in the virtual pointer space.
///
/// `x`/`y` lie in `0..=x_extent` / `0..=y_extent`. `origin_x`/`origin_y` are
/// the global coordinates of the virtual origin, for backends whose native
/// absolute motion is expressed in global space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualMotion {
    pub x: u32,
    pub y: u32,
    pub x_extent: u32,
    pub y_extent: u32,
    pub origin_x: i32,
    pub origin_y: i32,
}

impl VirtualMotion {
    /// The motion target in global display-server coordinates.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn global(&self) -> (i32, i32) {
        (
            (i64::from(self.origin_x) + i64::from(self.x)) as i32,
            (i64::from(self.origin_y) + i64::from(self.y)) as i32,
        )
    }
}

/// Immutable snapshot of the screen layout.
#[derive(Debug, Clone)]
pub struct ScreenRegistry {
    screens: Vec<Screen>,
    bounds: BoundingBox,
}

impl ScreenRegistry {
    /// Take ownership of an enumerated layout. An empty layout is fatal.
    pub fn new(screens: Vec<Screen>) -> Result<Self, PlatformError> {
        let bounds = bounding_box(&screens).ok_or(PlatformError::NoScreens)?;
        Ok(Self { screens, bounds })
    }

    #[must_use]
    pub fn list(&self) -> &[Screen] {
        &self.screens
    }

    #[must_use]
    pub fn get(&self, id: ScreenId) -> Option<&Screen> {
        self.screens.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Translate a screen-local point into the virtual pointer space.
    ///
    /// Points beyond the layout are clamped to its edges.
    pub fn to_virtual(&self, id: ScreenId, x: i32, y: i32) -> Result<VirtualMotion, PlatformError> {
        let screen = self.get(id).ok_or(PlatformError::UnknownScreen(id))?;
        let b = self.bounds;
        let x_extent = b.width();
        let y_extent = b.height();
        let vx = i64::from(x) + i64::from(screen.x) - i64::from(b.min_x);
        let vy = i64::from(y) + i64::from(screen.y) - i64::from(b.min_y);
        Ok(VirtualMotion {
            x: clamp_to_extent(vx, x_extent),
            y: clamp_to_extent(vy, y_extent),
            x_extent,
            y_extent,
            origin_x: b.min_x,
            origin_y: b.min_y,
        })
    }

    /// Find the screen under a global point and express it screen-locally.
    #[must_use]
    pub fn locate(&self, gx: i32, gy: i32) -> Option<PointerPosition> {
        self.screens
            .iter()
            .find(|s| s.contains(gx, gy))
            .map(|s| PointerPosition {
                screen: s.id,
                x: gx - s.x,
                y: gy - s.y,
            })
    }
}

fn clamp_to_extent(v: i64, extent: u32) -> u32 {
    u32::try_from(v.clamp(0, i64::from(extent))).unwrap_or(extent)
}
