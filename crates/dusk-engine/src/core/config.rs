use std::path::PathBuf;

/// Fullscreen flavor.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum FullscreenStyle {
    /// Takes over the display with an exclusive video mode.
    Exclusive,
    /// Borderless window resized to cover the desktop.
    #[default]
    Desktop,
}

/// Window configuration, read once while a run is being set up.
///
/// Width and height are signed on purpose: non-positive values are rejected
/// by the surface manager rather than silently clamped.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub width: i32,
    pub height: i32,
    pub title: String,
    pub resizable: bool,
    pub borderless: bool,
    pub high_dpi: bool,
    pub fullscreen: bool,
    pub fullscreen_style: FullscreenStyle,
    pub vsync: bool,
    /// Initial position; `None` leaves placement to the platform.
    pub position: Option<(i32, i32)>,
    /// Window icon image path; best effort, failures are logged only.
    pub icon_path: Option<PathBuf>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "dusk".to_string(),
            resizable: true,
            borderless: false,
            high_dpi: false,
            fullscreen: false,
            fullscreen_style: FullscreenStyle::default(),
            vsync: true,
            position: None,
            icon_path: None,
        }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub window: WindowConfig,

    /// Selects the offscreen backend instead of the desktop one.
    ///
    /// Set this explicitly, or pre-populate it from [`headless_from_env`].
    pub headless: bool,
}

/// Returns true when the environment asks for a headless run
/// (`DUSK_VIDEODRIVER=dummy` or `=offscreen`).
///
/// This is deliberately the only place environment sniffing happens; the
/// runtime itself acts solely on [`RunConfig::headless`].
pub fn headless_from_env() -> bool {
    match std::env::var("DUSK_VIDEODRIVER") {
        Ok(v) => {
            let v = v.to_ascii_lowercase();
            v == "dummy" || v == "offscreen"
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_windowed_800x600() {
        let w = WindowConfig::default();
        assert_eq!((w.width, w.height), (800, 600));
        assert!(!w.fullscreen);
        assert!(w.vsync);
    }
}
