use bitflags::bitflags;

use crate::core::FullscreenStyle;

bitflags! {
    /// Process-wide backend subsystems.
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct SubsystemFlags: u32 {
        const VIDEO = 1 << 0;
        const EVENTS = 1 << 1;
    }
}

bitflags! {
    /// Style flags applied at window creation.
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct WindowStyle: u32 {
        const RESIZABLE = 1 << 0;
        const BORDERLESS = 1 << 1;
        const HIGH_DPI = 1 << 2;
    }
}

/// Renderer acquisition strategy.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RendererKind {
    /// Hardware-accelerated renderer.
    Accelerated,
    /// Software renderer bound to the window's pixel surface.
    Software,
}

/// Display index among the connected displays.
pub type DisplayId = usize;

/// A display video mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh_millihertz: u32,
}

/// Window placement request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WindowPlacement {
    At(i32, i32),
    /// Centered on the display the window currently sits on.
    Centered,
}

/// Snapshot of a window's mode, as returned by
/// [`crate::runtime::WindowSurfaceManager::mode`].
///
/// A defaulted (zeroed) value stands for "no window".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowModeInfo {
    pub width: i32,
    pub height: i32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub fullscreen: bool,
    pub fullscreen_style: FullscreenStyle,
    pub borderless: bool,
    pub resizable: bool,
    pub high_dpi: bool,
    pub x: i32,
    pub y: i32,
    pub title: String,
    pub vsync: bool,
    pub display: DisplayId,
    pub refresh_millihertz: u32,
}
