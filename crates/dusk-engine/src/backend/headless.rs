//! In-process offscreen backend.
//!
//! Stands in for the desktop backend when [`crate::core::RunConfig::headless`]
//! is set (CI, test automation) and doubles as the fault-injection seam for
//! the runtime tests: every acquisition step can be forced to fail and every
//! native call is counted.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{bail, Result};

use crate::core::Color;
use crate::input::Event;

use super::{
    DisplayId, DisplayMode, RendererKind, SubsystemFlags, VideoBackend, WindowModeInfo,
    WindowPlacement, WindowStyle,
};

/// The single virtual display exposed by the offscreen backend.
const VIRTUAL_DISPLAY_MODE: DisplayMode = DisplayMode {
    width: 1920,
    height: 1080,
    refresh_millihertz: 60_000,
};

/// Switches forcing individual native operations to fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureInjection {
    pub subsystem_init: bool,
    pub window_create: bool,
    pub accelerated_renderer: bool,
    pub software_renderer: bool,
    pub display_lookup: bool,
    pub present: bool,
}

/// Native call counters, readable by tests.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct BackendCounters {
    pub native_inits: u32,
    pub native_quits: u32,
    pub windows_created: u32,
    pub windows_destroyed: u32,
    pub renderers_created: u32,
    pub renderers_destroyed: u32,
    pub clears: u32,
    pub presents: u32,
    pub input_mode_resets: u32,
}

#[derive(Debug)]
pub struct HeadlessWindow {
    width: i32,
    height: i32,
    style: WindowStyle,
    title: String,
    position: (i32, i32),
    bordered: bool,
    exclusive: Option<DisplayMode>,
}

#[derive(Debug)]
pub struct HeadlessRenderer {
    kind: RendererKind,
    vsync: bool,
    last_clear: Option<Color>,
}

impl HeadlessRenderer {
    pub fn kind(&self) -> RendererKind {
        self.kind
    }

    pub fn last_clear(&self) -> Option<Color> {
        self.last_clear
    }
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    pub fail: FailureInjection,
    counters: BackendCounters,
    events: VecDeque<Event>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event for the next `poll_event` pass.
    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn counters(&self) -> BackendCounters {
        self.counters
    }
}

impl VideoBackend for HeadlessBackend {
    type Window = HeadlessWindow;
    type Renderer = HeadlessRenderer;

    fn init_subsystems(&mut self, flags: SubsystemFlags) -> Result<()> {
        if self.fail.subsystem_init {
            bail!("offscreen subsystem init forced to fail");
        }
        self.counters.native_inits += 1;
        log::debug!("offscreen subsystems initialized: {flags:?}");
        Ok(())
    }

    fn quit_subsystems(&mut self, flags: SubsystemFlags) {
        self.counters.native_quits += 1;
        log::debug!("offscreen subsystems quit: {flags:?}");
    }

    fn create_window(
        &mut self,
        width: i32,
        height: i32,
        style: WindowStyle,
    ) -> Result<HeadlessWindow> {
        if self.fail.window_create {
            bail!("offscreen window creation forced to fail");
        }
        self.counters.windows_created += 1;
        Ok(HeadlessWindow {
            width,
            height,
            style,
            title: String::new(),
            position: (0, 0),
            bordered: !style.contains(WindowStyle::BORDERLESS),
            exclusive: None,
        })
    }

    fn destroy_window(&mut self, _window: HeadlessWindow) {
        self.counters.windows_destroyed += 1;
    }

    fn create_renderer(
        &mut self,
        _window: &HeadlessWindow,
        kind: RendererKind,
    ) -> Result<HeadlessRenderer> {
        let forced = match kind {
            RendererKind::Accelerated => self.fail.accelerated_renderer,
            RendererKind::Software => self.fail.software_renderer,
        };
        if forced {
            bail!("offscreen {kind:?} renderer creation forced to fail");
        }
        self.counters.renderers_created += 1;
        Ok(HeadlessRenderer {
            kind,
            vsync: false,
            last_clear: None,
        })
    }

    fn destroy_renderer(&mut self, _renderer: HeadlessRenderer) {
        self.counters.renderers_destroyed += 1;
    }

    fn window_mode(
        &self,
        window: &HeadlessWindow,
        renderer: Option<&HeadlessRenderer>,
    ) -> WindowModeInfo {
        WindowModeInfo {
            width: window.width,
            height: window.height,
            pixel_width: window.width.max(0) as u32,
            pixel_height: window.height.max(0) as u32,
            fullscreen: false,
            fullscreen_style: Default::default(),
            borderless: !window.bordered,
            resizable: window.style.contains(WindowStyle::RESIZABLE),
            high_dpi: window.style.contains(WindowStyle::HIGH_DPI),
            x: window.position.0,
            y: window.position.1,
            title: window.title.clone(),
            vsync: renderer.is_some_and(|r| r.vsync),
            display: 0,
            refresh_millihertz: VIRTUAL_DISPLAY_MODE.refresh_millihertz,
        }
    }

    fn set_title(&mut self, window: &mut HeadlessWindow, title: &str) -> Result<()> {
        window.title = title.to_string();
        Ok(())
    }

    fn set_size(&mut self, window: &mut HeadlessWindow, width: i32, height: i32) -> Result<()> {
        window.width = width;
        window.height = height;
        Ok(())
    }

    fn set_placement(&mut self, window: &mut HeadlessWindow, placement: WindowPlacement) {
        window.position = match placement {
            WindowPlacement::At(x, y) => (x, y),
            WindowPlacement::Centered => (
                (VIRTUAL_DISPLAY_MODE.width as i32 - window.width) / 2,
                (VIRTUAL_DISPLAY_MODE.height as i32 - window.height) / 2,
            ),
        };
    }

    fn set_bordered(&mut self, window: &mut HeadlessWindow, bordered: bool) -> Result<()> {
        window.bordered = bordered;
        Ok(())
    }

    fn raise(&mut self, _window: &HeadlessWindow) {}

    fn set_icon(&mut self, _window: &mut HeadlessWindow, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn display_for_window(&self, _window: &HeadlessWindow) -> Result<DisplayId> {
        if self.fail.display_lookup {
            bail!("offscreen display lookup forced to fail");
        }
        Ok(0)
    }

    fn desktop_mode_for(&self, _window: &HeadlessWindow) -> Result<DisplayMode> {
        if self.fail.display_lookup {
            bail!("offscreen display lookup forced to fail");
        }
        Ok(VIRTUAL_DISPLAY_MODE)
    }

    fn enter_exclusive(&mut self, window: &mut HeadlessWindow, mode: DisplayMode) -> Result<()> {
        window.exclusive = Some(mode);
        Ok(())
    }

    fn leave_exclusive(&mut self, window: &mut HeadlessWindow) -> Result<()> {
        window.exclusive = None;
        Ok(())
    }

    fn set_vsync(&mut self, renderer: &mut HeadlessRenderer, enabled: bool) -> Result<()> {
        renderer.vsync = enabled;
        Ok(())
    }

    fn reset_input_modes(&mut self, _window: &HeadlessWindow) {
        self.counters.input_mode_resets += 1;
    }

    fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    fn clear(&mut self, renderer: &mut HeadlessRenderer, color: Color) -> Result<()> {
        self.counters.clears += 1;
        renderer.last_clear = Some(color);
        Ok(())
    }

    fn present(&mut self, _renderer: &mut HeadlessRenderer) -> Result<()> {
        if self.fail.present {
            bail!("offscreen present forced to fail");
        }
        self.counters.presents += 1;
        Ok(())
    }
}
