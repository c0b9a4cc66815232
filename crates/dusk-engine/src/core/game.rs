use anyhow::Result;

use crate::input::{Key, MouseButton};

/// An RGBA color with 8-bit channels.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Drawing surface handed to [`Game::draw`] for the current frame.
///
/// Backend failures inside these operations are soft: they are logged and the
/// operation becomes a no-op. They never abort the run.
pub trait Canvas {
    /// Clears the whole surface to `color`.
    fn clear(&mut self, color: Color);

    /// Current drawable size in physical pixels.
    fn size(&self) -> (u32, u32);
}

/// Game contract implemented by user code.
///
/// The runtime invokes `load` at most once per run, then `update` and `draw`
/// once per frame, and the input callbacks once per delivered event. Any
/// callback returning `Err` (or panicking) puts the run into its error state:
/// remaining `update`/`draw` calls are skipped and the registered fault
/// handler takes over. See [`crate::runtime::Runtime`].
pub trait Game {
    /// Called once after the window and renderer are ready.
    fn load(&mut self) -> Result<()>;

    /// Called every frame with the elapsed time in seconds.
    fn update(&mut self, dt: f32) -> Result<()>;

    /// Called every frame after `update`; the frame is presented when this
    /// returns successfully.
    fn draw(&mut self, canvas: &mut dyn Canvas) -> Result<()>;

    /// Called for every key press. `repeat` is true for held-key repeats.
    fn key_pressed(&mut self, key: Key, scancode: u32, repeat: bool) -> Result<()> {
        let _ = (key, scancode, repeat);
        Ok(())
    }

    /// Called for every key release.
    fn key_released(&mut self, key: Key, scancode: u32) -> Result<()> {
        let _ = (key, scancode);
        Ok(())
    }

    /// Called for every mouse button press, with window-local coordinates.
    fn mouse_pressed(&mut self, x: f32, y: f32, button: MouseButton, clicks: u8) -> Result<()> {
        let _ = (x, y, button, clicks);
        Ok(())
    }

    /// Called for every mouse button release.
    fn mouse_released(&mut self, x: f32, y: f32, button: MouseButton, clicks: u8) -> Result<()> {
        let _ = (x, y, button, clicks);
        Ok(())
    }
}
