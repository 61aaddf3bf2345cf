//! Shared types for pointwarp.
//!
//! This crate contains the backend-neutral vocabulary used across the
//! pointwarp workspace: screen geometry, mouse buttons, scroll directions,
//! keyboard input events, hint boxes and colors.

pub mod color;
pub mod event;
pub mod screen;

pub use color::{Color, ColorError};
pub use event::{InputEvent, Modifiers, MouseButton, ParseError, ScrollDirection};
pub use screen::{BoundingBox, Hint, PointerPosition, Screen, ScreenId};
