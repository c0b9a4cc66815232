//! Window and renderer acquisition, and the fullscreen state machine.

use std::path::Path;

use anyhow::{Context, Result, ensure};

use crate::backend::{
    RendererKind, VideoBackend, WindowModeInfo, WindowPlacement, WindowStyle,
};
use crate::core::{Color, FullscreenStyle};

/// Windowed geometry restored when no explicit geometry was recorded.
const DEFAULT_WINDOWED_SIZE: (i32, i32) = (800, 600);

/// The last fullscreen request plus the windowed geometry to restore on exit.
#[derive(Debug, Default)]
struct FullscreenRecord {
    /// Requested style; recorded before the transition is attempted so
    /// queries reflect intent even when a lookup step fails.
    style: Option<FullscreenStyle>,
    windowed_size: Option<(i32, i32)>,
    windowed_position: Option<(i32, i32)>,
}

/// Owns the window/renderer pair for one run.
///
/// A renderer is only ever held together with the window it was created for,
/// and both are destroyed renderer-first on every path.
pub struct WindowSurfaceManager<B: VideoBackend> {
    window: Option<B::Window>,
    renderer: Option<B::Renderer>,
    fullscreen: FullscreenRecord,
    close_requested: bool,
}

impl<B: VideoBackend> WindowSurfaceManager<B> {
    pub fn new() -> Self {
        Self {
            window: None,
            renderer: None,
            fullscreen: FullscreenRecord::default(),
            close_requested: false,
        }
    }

    /// (Re)creates the window/renderer pair.
    ///
    /// Any pair from a prior call is destroyed first, so re-moding is safe.
    /// Renderer acquisition tries the accelerated strategy, then falls back
    /// to the software one; if both fail the fresh window is destroyed again
    /// and no handle is left behind.
    pub fn set_mode(
        &mut self,
        backend: &mut B,
        width: i32,
        height: i32,
        style: WindowStyle,
    ) -> Result<()> {
        self.shutdown(backend);

        ensure!(
            width > 0 && height > 0,
            "invalid window size {width}x{height}"
        );

        let window = backend.create_window(width, height, style)?;

        let renderer = match backend.create_renderer(&window, RendererKind::Accelerated) {
            Ok(renderer) => renderer,
            Err(accel_err) => {
                log::warn!("accelerated renderer unavailable, trying software: {accel_err:#}");
                match backend.create_renderer(&window, RendererKind::Software) {
                    Ok(renderer) => renderer,
                    Err(soft_err) => {
                        backend.destroy_window(window);
                        return Err(soft_err).context("renderer fallback chain exhausted");
                    }
                }
            }
        };

        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Snapshot of the current window mode; defaulted when no window exists.
    pub fn mode(&self, backend: &B) -> WindowModeInfo {
        let Some(window) = self.window.as_ref() else {
            return WindowModeInfo::default();
        };

        let mut info = backend.window_mode(window, self.renderer.as_ref());
        if let Some(style) = self.fullscreen.style {
            info.fullscreen = true;
            info.fullscreen_style = style;
        }
        info
    }

    /// Enters or leaves fullscreen.
    ///
    /// Leaving restores the geometry recorded when fullscreen was entered,
    /// falling back to [`DEFAULT_WINDOWED_SIZE`] centered on the display.
    pub fn set_fullscreen(
        &mut self,
        backend: &mut B,
        enable: bool,
        style: FullscreenStyle,
    ) -> Result<()> {
        let window = self.window.as_mut().context("no window to set fullscreen on")?;

        if enable {
            // Remember the windowed geometry only on the windowed->fullscreen
            // edge, not when switching between fullscreen styles.
            if self.fullscreen.style.is_none() {
                let info = backend.window_mode(window, self.renderer.as_ref());
                self.fullscreen.windowed_size = Some((info.width, info.height));
                self.fullscreen.windowed_position = Some((info.x, info.y));
            }
            self.fullscreen.style = Some(style);

            match style {
                FullscreenStyle::Exclusive => {
                    let mode = backend
                        .desktop_mode_for(window)
                        .context("could not resolve the display's desktop mode")?;
                    backend.enter_exclusive(window, mode)?;
                }
                FullscreenStyle::Desktop => {
                    backend.leave_exclusive(window)?;
                    backend.set_bordered(window, false)?;
                    let mode = backend
                        .desktop_mode_for(window)
                        .context("could not resolve the display's desktop mode")?;
                    backend.set_placement(window, WindowPlacement::At(0, 0));
                    backend.set_size(window, mode.width as i32, mode.height as i32)?;
                }
            }
        } else {
            self.fullscreen.style = None;
            backend.leave_exclusive(window)?;
            backend.set_bordered(window, true)?;

            let (w, h) = self
                .fullscreen
                .windowed_size
                .take()
                .unwrap_or(DEFAULT_WINDOWED_SIZE);
            backend.set_size(window, w, h)?;

            match self.fullscreen.windowed_position.take() {
                Some((x, y)) => backend.set_placement(window, WindowPlacement::At(x, y)),
                None => backend.set_placement(window, WindowPlacement::Centered),
            }
            backend.raise(window);
        }

        Ok(())
    }

    pub fn set_title(&mut self, backend: &mut B, title: &str) -> Result<()> {
        let window = self.window.as_mut().context("no window to title")?;
        backend.set_title(window, title)
    }

    pub fn set_position(&mut self, backend: &mut B, placement: WindowPlacement) -> Result<()> {
        let window = self.window.as_mut().context("no window to position")?;
        backend.set_placement(window, placement);
        Ok(())
    }

    pub fn set_icon(&mut self, backend: &mut B, path: &Path) -> Result<()> {
        let window = self.window.as_mut().context("no window for an icon")?;
        backend.set_icon(window, path)
    }

    pub fn set_vsync(&mut self, backend: &mut B, enabled: bool) -> Result<()> {
        let renderer = self.renderer.as_mut().context("no renderer for vsync")?;
        backend.set_vsync(renderer, enabled)
    }

    pub fn reset_input_modes(&self, backend: &mut B) {
        if let Some(window) = self.window.as_ref() {
            backend.reset_input_modes(window);
        }
    }

    /// Clears the surface; backend failures are soft (logged, skipped).
    pub fn clear(&mut self, backend: &mut B, color: Color) {
        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = backend.clear(renderer, color) {
                log::error!("clear failed: {e:#}");
            }
        }
    }

    /// Presents the frame; backend failures are soft (logged, skipped).
    pub fn present(&mut self, backend: &mut B) {
        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = backend.present(renderer) {
                log::error!("present failed: {e:#}");
            }
        }
    }

    /// Borrows the live window/renderer pair for one draw pass.
    pub fn canvas_parts(&mut self) -> Option<(&B::Window, &mut B::Renderer)> {
        match (self.window.as_ref(), self.renderer.as_mut()) {
            (Some(window), Some(renderer)) => Some((window, renderer)),
            _ => None,
        }
    }

    /// True while a window exists and no close was requested.
    pub fn is_open(&self) -> bool {
        self.window.is_some() && !self.close_requested
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Marks the window for closing; the run loop observes this at its next
    /// pass boundary.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Destroys the renderer, then the window. Safe to call twice and safe
    /// without a prior [`set_mode`].
    ///
    /// [`set_mode`]: WindowSurfaceManager::set_mode
    pub fn shutdown(&mut self, backend: &mut B) {
        if let Some(renderer) = self.renderer.take() {
            backend.destroy_renderer(renderer);
        }
        if let Some(window) = self.window.take() {
            backend.destroy_window(window);
        }
        self.fullscreen = FullscreenRecord::default();
        self.close_requested = false;
    }
}

impl<B: VideoBackend> Default for WindowSurfaceManager<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    fn open(backend: &mut HeadlessBackend) -> WindowSurfaceManager<HeadlessBackend> {
        let mut surface = WindowSurfaceManager::new();
        surface
            .set_mode(backend, 640, 480, WindowStyle::RESIZABLE)
            .unwrap();
        surface
    }

    // ── set_mode ──

    #[test]
    fn falls_back_to_software_renderer() {
        let mut backend = HeadlessBackend::new();
        backend.fail.accelerated_renderer = true;

        let mut surface = open(&mut backend);

        assert!(surface.has_renderer());
        let (_, renderer) = surface.canvas_parts().unwrap();
        assert_eq!(renderer.kind(), RendererKind::Software);
    }

    #[test]
    fn exhausted_fallback_leaves_no_window_behind() {
        let mut backend = HeadlessBackend::new();
        backend.fail.accelerated_renderer = true;
        backend.fail.software_renderer = true;

        let mut surface = WindowSurfaceManager::new();
        let result = surface.set_mode(&mut backend, 640, 480, WindowStyle::empty());

        assert!(result.is_err());
        assert!(!surface.is_open());
        assert_eq!(backend.counters().windows_created, 1);
        assert_eq!(backend.counters().windows_destroyed, 1);
    }

    #[test]
    fn rejects_non_positive_size() {
        let mut backend = HeadlessBackend::new();
        let mut surface = WindowSurfaceManager::new();

        assert!(surface.set_mode(&mut backend, 0, 480, WindowStyle::empty()).is_err());
        assert!(surface.set_mode(&mut backend, 640, -1, WindowStyle::empty()).is_err());
        assert_eq!(backend.counters().windows_created, 0);
        assert!(!surface.is_open());
    }

    #[test]
    fn re_mode_destroys_the_previous_pair_first() {
        let mut backend = HeadlessBackend::new();
        let mut surface = open(&mut backend);

        surface
            .set_mode(&mut backend, 1024, 768, WindowStyle::RESIZABLE)
            .unwrap();

        let counters = backend.counters();
        assert_eq!(counters.windows_created, 2);
        assert_eq!(counters.windows_destroyed, 1);
        assert_eq!(counters.renderers_created, 2);
        assert_eq!(counters.renderers_destroyed, 1);
        assert_eq!(surface.mode(&backend).width, 1024);
    }

    // ── queries ──

    #[test]
    fn mode_defaults_when_no_window() {
        let backend = HeadlessBackend::new();
        let surface: WindowSurfaceManager<HeadlessBackend> = WindowSurfaceManager::new();

        assert_eq!(surface.mode(&backend), WindowModeInfo::default());
    }

    #[test]
    fn title_round_trips_through_mode() {
        let mut backend = HeadlessBackend::new();
        let mut surface = open(&mut backend);

        surface.set_title(&mut backend, "hello").unwrap();
        assert_eq!(surface.mode(&backend).title, "hello");
    }

    // ── fullscreen ──

    #[test]
    fn fullscreen_style_recorded_even_when_transition_fails() {
        let mut backend = HeadlessBackend::new();
        let mut surface = open(&mut backend);
        backend.fail.display_lookup = true;

        let result = surface.set_fullscreen(&mut backend, true, FullscreenStyle::Exclusive);

        assert!(result.is_err());
        let info = surface.mode(&backend);
        assert!(info.fullscreen);
        assert_eq!(info.fullscreen_style, FullscreenStyle::Exclusive);
    }

    #[test]
    fn leaving_fullscreen_restores_windowed_geometry() {
        let mut backend = HeadlessBackend::new();
        let mut surface = open(&mut backend);
        surface
            .set_position(&mut backend, WindowPlacement::At(10, 20))
            .unwrap();

        surface
            .set_fullscreen(&mut backend, true, FullscreenStyle::Desktop)
            .unwrap();
        let info = surface.mode(&backend);
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!(info.fullscreen);

        surface.set_fullscreen(&mut backend, false, FullscreenStyle::Desktop).unwrap();
        let info = surface.mode(&backend);
        assert!(!info.fullscreen);
        assert_eq!((info.width, info.height), (640, 480));
        assert_eq!((info.x, info.y), (10, 20));
    }

    #[test]
    fn disabling_without_a_record_falls_back_to_defaults() {
        let mut backend = HeadlessBackend::new();
        let mut surface = WindowSurfaceManager::new();
        surface
            .set_mode(&mut backend, 320, 200, WindowStyle::empty())
            .unwrap();

        surface.set_fullscreen(&mut backend, false, FullscreenStyle::Desktop).unwrap();

        let info = surface.mode(&backend);
        assert_eq!((info.width, info.height), DEFAULT_WINDOWED_SIZE);
        // Centered on the 1920x1080 virtual display.
        assert_eq!((info.x, info.y), ((1920 - 800) / 2, (1080 - 600) / 2));
    }

    #[test]
    fn present_failure_is_soft() {
        let mut backend = HeadlessBackend::new();
        let mut surface = open(&mut backend);
        backend.fail.present = true;

        surface.clear(&mut backend, Color::BLACK);
        surface.present(&mut backend);

        // Logged and skipped; the surface stays usable.
        assert!(surface.is_open());
        assert_eq!(backend.counters().presents, 0);
        assert_eq!(backend.counters().clears, 1);
    }

    // ── teardown ──

    #[test]
    fn shutdown_twice_is_safe() {
        let mut backend = HeadlessBackend::new();
        let mut surface = open(&mut backend);

        surface.shutdown(&mut backend);
        surface.shutdown(&mut backend);

        let counters = backend.counters();
        assert_eq!(counters.windows_destroyed, 1);
        assert_eq!(counters.renderers_destroyed, 1);
        assert!(!surface.is_open());
    }
}
