//! Video backend seam.
//!
//! The runtime's managers are generic over [`VideoBackend`], which covers
//! process-wide subsystem init/quit, window and renderer acquisition, display
//! queries and the event queue. Two implementations exist:
//! - [`DesktopBackend`]: winit + wgpu
//! - [`HeadlessBackend`]: in-process offscreen backend, also the fault
//!   injection double used by the runtime tests

mod types;

pub mod desktop;
pub mod headless;

use std::path::Path;

use anyhow::Result;

use crate::core::Color;
use crate::input::Event;

pub use desktop::DesktopBackend;
pub use headless::HeadlessBackend;
pub use types::{
    DisplayId, DisplayMode, RendererKind, SubsystemFlags, WindowModeInfo, WindowPlacement,
    WindowStyle,
};

/// Platform services the runtime depends on.
///
/// Handle ownership rules: `Window` and `Renderer` values are created and
/// destroyed only through this trait, and a renderer never outlives the
/// window it was created for (the surface manager enforces the pairing).
pub trait VideoBackend {
    type Window;
    type Renderer;

    /// Natively initializes `flags`. Called under the subsystem lock with
    /// only the flags that are not already active.
    fn init_subsystems(&mut self, flags: SubsystemFlags) -> Result<()>;

    /// Natively quits `flags`. Called only with flags this process turned on.
    fn quit_subsystems(&mut self, flags: SubsystemFlags);

    fn create_window(&mut self, width: i32, height: i32, style: WindowStyle)
        -> Result<Self::Window>;

    fn destroy_window(&mut self, window: Self::Window);

    /// Creates a renderer for `window` using one acquisition strategy.
    /// The fallback chain across strategies lives in the surface manager.
    fn create_renderer(
        &mut self,
        window: &Self::Window,
        kind: RendererKind,
    ) -> Result<Self::Renderer>;

    fn destroy_renderer(&mut self, renderer: Self::Renderer);

    /// Snapshot of the window's current mode. Fullscreen fields are filled in
    /// by the surface manager from its own record.
    fn window_mode(&self, window: &Self::Window, renderer: Option<&Self::Renderer>)
        -> WindowModeInfo;

    fn set_title(&mut self, window: &mut Self::Window, title: &str) -> Result<()>;

    fn set_size(&mut self, window: &mut Self::Window, width: i32, height: i32) -> Result<()>;

    fn set_placement(&mut self, window: &mut Self::Window, placement: WindowPlacement);

    fn set_bordered(&mut self, window: &mut Self::Window, bordered: bool) -> Result<()>;

    fn raise(&mut self, window: &Self::Window);

    /// Loads an image file and installs it as the window icon.
    fn set_icon(&mut self, window: &mut Self::Window, path: &Path) -> Result<()>;

    /// Index of the display the window currently sits on.
    fn display_for_window(&self, window: &Self::Window) -> Result<DisplayId>;

    /// Current desktop video mode of the display the window sits on.
    fn desktop_mode_for(&self, window: &Self::Window) -> Result<DisplayMode>;

    /// Applies `mode` as the window's exclusive fullscreen mode.
    fn enter_exclusive(&mut self, window: &mut Self::Window, mode: DisplayMode) -> Result<()>;

    /// Clears any exclusive fullscreen mode; no-op when not exclusive.
    fn leave_exclusive(&mut self, window: &mut Self::Window) -> Result<()>;

    fn set_vsync(&mut self, renderer: &mut Self::Renderer, enabled: bool) -> Result<()>;

    /// Resets transient input modes (cursor visibility, grab, relative mode)
    /// to safe defaults.
    fn reset_input_modes(&mut self, window: &Self::Window);

    /// Pops the next pending event, pumping the platform queue as needed.
    fn poll_event(&mut self) -> Option<Event>;

    fn clear(&mut self, renderer: &mut Self::Renderer, color: Color) -> Result<()>;

    /// Presents everything recorded since the last present.
    fn present(&mut self, renderer: &mut Self::Renderer) -> Result<()>;
}
