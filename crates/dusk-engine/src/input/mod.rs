//! Input event types delivered to game callbacks.
//!
//! The backend translates platform events into these before the run loop
//! dispatches them. Device enumeration (joysticks, gamepads) is out of scope
//! for this layer.

mod types;

pub use types::{Event, Key, MouseButton};
