//! Desktop backend: winit windowing + wgpu rendering.
//!
//! The run loop polls rather than parking, so events are pumped with a zero
//! timeout and buffered into a queue the runtime drains once per pass.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::window::{CursorGrabMode, Fullscreen, Window, WindowId};

use crate::core::Color;
use crate::input::{Event, Key, MouseButton};

use super::{
    DisplayId, DisplayMode, RendererKind, SubsystemFlags, VideoBackend, WindowModeInfo,
    WindowPlacement, WindowStyle,
};

pub struct DesktopBackend {
    /// Created on subsystem init; retained afterwards because winit event
    /// loops cannot be re-created once dropped on several platforms. The
    /// subsystem registry alone decides whether video counts as active.
    event_loop: Option<EventLoop<()>>,
    sink: EventSink,
}

impl DesktopBackend {
    pub fn new() -> Self {
        Self {
            event_loop: None,
            sink: EventSink::default(),
        }
    }
}

impl Default for DesktopBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DesktopWindow {
    window: Arc<Window>,
    style: WindowStyle,
    title: String,
}

/// One wgpu device + surface pair bound to a window.
pub struct DesktopRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    kind: RendererKind,
    pending: Option<FrameInFlight>,
}

/// Commands recorded for the current frame, finalized by `present`.
struct FrameInFlight {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

impl DesktopRenderer {
    async fn new(window: Arc<Window>, kind: RendererKind) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Arc keeps the window alive for the surface, so no borrowed lifetime.
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create wgpu surface")?;

        let (power_preference, force_fallback_adapter) = match kind {
            RendererKind::Accelerated => (wgpu::PowerPreference::HighPerformance, false),
            RendererKind::Software => (wgpu::PowerPreference::LowPower, true),
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("dusk-engine device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps).context("no supported surface formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        log::info!(
            "created {:?} renderer on adapter \"{}\"",
            kind,
            adapter.get_info().name
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            kind,
            pending: None,
        })
    }

    /// Acquires a surface texture and encoder if the frame has none yet.
    fn ensure_frame(&mut self, window_size: PhysicalSize<u32>) -> Result<()> {
        if self.pending.is_some() {
            return Ok(());
        }

        let texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                // Surface went stale (resize, mode change); reconfigure once.
                self.config.width = window_size.width.max(1);
                self.config.height = window_size.height.max(1);
                self.surface.configure(&self.device, &self.config);
                self.surface
                    .get_current_texture()
                    .map_err(|e| anyhow!("surface texture reacquisition failed: {e}"))?
            }
            Err(e) => return Err(anyhow!("failed to acquire surface texture: {e}")),
        };

        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("dusk frame encoder"),
            });

        self.pending = Some(FrameInFlight {
            texture,
            view,
            encoder,
        });
        Ok(())
    }

    pub fn kind(&self) -> RendererKind {
        self.kind
    }
}

fn choose_surface_format(caps: &wgpu::SurfaceCapabilities) -> Option<wgpu::TextureFormat> {
    let preferred = [
        wgpu::TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ];
    for f in preferred {
        if caps.formats.contains(&f) {
            return Some(f);
        }
    }
    caps.formats.first().copied()
}

impl VideoBackend for DesktopBackend {
    type Window = DesktopWindow;
    type Renderer = DesktopRenderer;

    fn init_subsystems(&mut self, flags: SubsystemFlags) -> Result<()> {
        if flags.intersects(SubsystemFlags::VIDEO | SubsystemFlags::EVENTS)
            && self.event_loop.is_none()
        {
            let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
            self.event_loop = Some(event_loop);
        }
        Ok(())
    }

    fn quit_subsystems(&mut self, flags: SubsystemFlags) {
        // The event loop is retained (see field doc); pending events from the
        // finished run must not leak into the next one.
        self.sink.events.clear();
        log::debug!("desktop subsystems quit: {flags:?}");
    }

    fn create_window(
        &mut self,
        width: i32,
        height: i32,
        style: WindowStyle,
    ) -> Result<DesktopWindow> {
        let event_loop = self
            .event_loop
            .as_ref()
            .context("video subsystem is not initialized")?;

        let attrs = Window::default_attributes()
            .with_title("dusk")
            .with_inner_size(LogicalSize::new(width as f64, height as f64))
            .with_resizable(style.contains(WindowStyle::RESIZABLE))
            .with_decorations(!style.contains(WindowStyle::BORDERLESS));

        #[allow(deprecated)]
        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        Ok(DesktopWindow {
            window: Arc::new(window),
            style,
            title: "dusk".to_string(),
        })
    }

    fn destroy_window(&mut self, window: DesktopWindow) {
        drop(window);
    }

    fn create_renderer(
        &mut self,
        window: &DesktopWindow,
        kind: RendererKind,
    ) -> Result<DesktopRenderer> {
        pollster::block_on(DesktopRenderer::new(window.window.clone(), kind))
    }

    fn destroy_renderer(&mut self, renderer: DesktopRenderer) {
        drop(renderer);
    }

    fn window_mode(
        &self,
        window: &DesktopWindow,
        renderer: Option<&DesktopRenderer>,
    ) -> WindowModeInfo {
        let physical = window.window.inner_size();
        let logical: LogicalSize<f64> = physical.to_logical(window.window.scale_factor());
        let (x, y) = window
            .window
            .outer_position()
            .map(|p| (p.x, p.y))
            .unwrap_or((0, 0));

        WindowModeInfo {
            width: logical.width as i32,
            height: logical.height as i32,
            pixel_width: physical.width,
            pixel_height: physical.height,
            fullscreen: false,
            fullscreen_style: Default::default(),
            borderless: !window.window.is_decorated(),
            resizable: window.window.is_resizable(),
            high_dpi: window.style.contains(WindowStyle::HIGH_DPI),
            x,
            y,
            title: window.title.clone(),
            vsync: renderer.is_some_and(|r| {
                matches!(
                    r.config.present_mode,
                    wgpu::PresentMode::AutoVsync | wgpu::PresentMode::Fifo
                )
            }),
            display: display_index_of(&window.window),
            refresh_millihertz: window
                .window
                .current_monitor()
                .and_then(|m| m.refresh_rate_millihertz())
                .unwrap_or(0),
        }
    }

    fn set_title(&mut self, window: &mut DesktopWindow, title: &str) -> Result<()> {
        window.title = title.to_string();
        window.window.set_title(title);
        Ok(())
    }

    fn set_size(&mut self, window: &mut DesktopWindow, width: i32, height: i32) -> Result<()> {
        let _ = window
            .window
            .request_inner_size(LogicalSize::new(width.max(1) as f64, height.max(1) as f64));
        Ok(())
    }

    fn set_placement(&mut self, window: &mut DesktopWindow, placement: WindowPlacement) {
        match placement {
            WindowPlacement::At(x, y) => {
                window.window.set_outer_position(PhysicalPosition::new(x, y));
            }
            WindowPlacement::Centered => {
                if let Some(monitor) = window.window.current_monitor() {
                    let mp = monitor.position();
                    let ms = monitor.size();
                    let ws = window.window.outer_size();
                    let x = mp.x + ms.width.saturating_sub(ws.width) as i32 / 2;
                    let y = mp.y + ms.height.saturating_sub(ws.height) as i32 / 2;
                    window.window.set_outer_position(PhysicalPosition::new(x, y));
                }
            }
        }
    }

    fn set_bordered(&mut self, window: &mut DesktopWindow, bordered: bool) -> Result<()> {
        window.window.set_decorations(bordered);
        Ok(())
    }

    fn raise(&mut self, window: &DesktopWindow) {
        window.window.focus_window();
    }

    fn set_icon(&mut self, window: &mut DesktopWindow, path: &Path) -> Result<()> {
        let image = image::open(path)
            .with_context(|| format!("failed to load icon image {}", path.display()))?
            .into_rgba8();
        let (w, h) = image.dimensions();
        let icon = winit::window::Icon::from_rgba(image.into_raw(), w, h)
            .context("invalid icon image data")?;
        window.window.set_window_icon(Some(icon));
        Ok(())
    }

    fn display_for_window(&self, window: &DesktopWindow) -> Result<DisplayId> {
        let current = window
            .window
            .current_monitor()
            .context("window has no current monitor")?;
        Ok(window
            .window
            .available_monitors()
            .position(|m| m == current)
            .unwrap_or(0))
    }

    fn desktop_mode_for(&self, window: &DesktopWindow) -> Result<DisplayMode> {
        let monitor = window
            .window
            .current_monitor()
            .context("window has no current monitor")?;
        let size = monitor.size();
        Ok(DisplayMode {
            width: size.width,
            height: size.height,
            refresh_millihertz: monitor.refresh_rate_millihertz().unwrap_or(0),
        })
    }

    fn enter_exclusive(&mut self, window: &mut DesktopWindow, mode: DisplayMode) -> Result<()> {
        let monitor = window
            .window
            .current_monitor()
            .context("window has no current monitor")?;

        // Prefer an exact match including refresh rate, then fall back to a
        // size-only match.
        let target = monitor
            .video_modes()
            .find(|m| {
                m.size().width == mode.width
                    && m.size().height == mode.height
                    && m.refresh_rate_millihertz() == mode.refresh_millihertz
            })
            .or_else(|| {
                monitor
                    .video_modes()
                    .find(|m| m.size().width == mode.width && m.size().height == mode.height)
            })
            .context("no matching exclusive video mode")?;

        window.window.set_fullscreen(Some(Fullscreen::Exclusive(target)));
        Ok(())
    }

    fn leave_exclusive(&mut self, window: &mut DesktopWindow) -> Result<()> {
        window.window.set_fullscreen(None);
        Ok(())
    }

    fn set_vsync(&mut self, renderer: &mut DesktopRenderer, enabled: bool) -> Result<()> {
        // Reconfiguring invalidates any acquired texture, so discard it.
        renderer.pending = None;
        renderer.config.present_mode = if enabled {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        renderer
            .surface
            .configure(&renderer.device, &renderer.config);
        Ok(())
    }

    fn reset_input_modes(&mut self, window: &DesktopWindow) {
        window.window.set_cursor_visible(true);
        if let Err(e) = window.window.set_cursor_grab(CursorGrabMode::None) {
            log::debug!("cursor ungrab not supported here: {e}");
        }
    }

    fn poll_event(&mut self) -> Option<Event> {
        if self.sink.events.is_empty() {
            if let Some(event_loop) = self.event_loop.as_mut() {
                let _ = event_loop.pump_app_events(Some(Duration::ZERO), &mut self.sink);
            }
        }
        self.sink.events.pop_front()
    }

    fn clear(&mut self, renderer: &mut DesktopRenderer, color: Color) -> Result<()> {
        // ensure_frame needs the live window size for stale-surface recovery;
        // the configured size is the best stand-in available here.
        let size = PhysicalSize::new(renderer.config.width, renderer.config.height);
        renderer.ensure_frame(size)?;

        if let Some(frame) = renderer.pending.as_mut() {
            let _pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("dusk clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: color.r as f64 / 255.0,
                            g: color.g as f64 / 255.0,
                            b: color.b as f64 / 255.0,
                            a: color.a as f64 / 255.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        Ok(())
    }

    fn present(&mut self, renderer: &mut DesktopRenderer) -> Result<()> {
        match renderer.pending.take() {
            Some(FrameInFlight {
                texture,
                view,
                encoder,
            }) => {
                renderer.queue.submit(std::iter::once(encoder.finish()));
                drop(view);
                texture.present();
            }
            None => {
                // Nothing was recorded this frame; present the surface as-is.
                let texture = renderer
                    .surface
                    .get_current_texture()
                    .map_err(|e| anyhow!("failed to acquire surface texture: {e}"))?;
                texture.present();
            }
        }
        Ok(())
    }
}

fn display_index_of(window: &Window) -> DisplayId {
    let Some(current) = window.current_monitor() else {
        return 0;
    };
    window
        .available_monitors()
        .position(|m| m == current)
        .unwrap_or(0)
}

/// Buffers translated platform events between pumps.
#[derive(Default)]
struct EventSink {
    events: VecDeque<Event>,
    cursor: (f32, f32),
}

impl ApplicationHandler for EventSink {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.events.push_back(Event::Quit),

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let (key, scancode) = map_key(event.physical_key);
                match event.state {
                    ElementState::Pressed => self.events.push_back(Event::KeyDown {
                        key,
                        scancode,
                        repeat: event.repeat,
                    }),
                    ElementState::Released => {
                        self.events.push_back(Event::KeyUp { key, scancode })
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let button = map_mouse_button(button);
                let (x, y) = self.cursor;
                // winit does not report click counts; single click assumed.
                let ev = match state {
                    ElementState::Pressed => Event::MouseDown {
                        x,
                        y,
                        button,
                        clicks: 1,
                    },
                    ElementState::Released => Event::MouseUp {
                        x,
                        y,
                        button,
                        clicks: 1,
                    },
                };
                self.events.push_back(ev);
            }

            _ => {}
        }
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

fn map_key(pk: PhysicalKey) -> (Key, u32) {
    match pk {
        PhysicalKey::Code(code) => {
            let key = match code {
                KeyCode::Escape => Key::Escape,
                KeyCode::Enter => Key::Enter,
                KeyCode::Tab => Key::Tab,
                KeyCode::Backspace => Key::Backspace,
                KeyCode::Space => Key::Space,

                KeyCode::Insert => Key::Insert,
                KeyCode::Delete => Key::Delete,
                KeyCode::Home => Key::Home,
                KeyCode::End => Key::End,
                KeyCode::PageUp => Key::PageUp,
                KeyCode::PageDown => Key::PageDown,

                KeyCode::ArrowUp => Key::ArrowUp,
                KeyCode::ArrowDown => Key::ArrowDown,
                KeyCode::ArrowLeft => Key::ArrowLeft,
                KeyCode::ArrowRight => Key::ArrowRight,

                KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
                KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
                KeyCode::AltLeft | KeyCode::AltRight => Key::Alt,
                KeyCode::SuperLeft | KeyCode::SuperRight => Key::Meta,

                KeyCode::KeyA => Key::A,
                KeyCode::KeyB => Key::B,
                KeyCode::KeyC => Key::C,
                KeyCode::KeyD => Key::D,
                KeyCode::KeyE => Key::E,
                KeyCode::KeyF => Key::F,
                KeyCode::KeyG => Key::G,
                KeyCode::KeyH => Key::H,
                KeyCode::KeyI => Key::I,
                KeyCode::KeyJ => Key::J,
                KeyCode::KeyK => Key::K,
                KeyCode::KeyL => Key::L,
                KeyCode::KeyM => Key::M,
                KeyCode::KeyN => Key::N,
                KeyCode::KeyO => Key::O,
                KeyCode::KeyP => Key::P,
                KeyCode::KeyQ => Key::Q,
                KeyCode::KeyR => Key::R,
                KeyCode::KeyS => Key::S,
                KeyCode::KeyT => Key::T,
                KeyCode::KeyU => Key::U,
                KeyCode::KeyV => Key::V,
                KeyCode::KeyW => Key::W,
                KeyCode::KeyX => Key::X,
                KeyCode::KeyY => Key::Y,
                KeyCode::KeyZ => Key::Z,

                KeyCode::Digit0 => Key::Digit0,
                KeyCode::Digit1 => Key::Digit1,
                KeyCode::Digit2 => Key::Digit2,
                KeyCode::Digit3 => Key::Digit3,
                KeyCode::Digit4 => Key::Digit4,
                KeyCode::Digit5 => Key::Digit5,
                KeyCode::Digit6 => Key::Digit6,
                KeyCode::Digit7 => Key::Digit7,
                KeyCode::Digit8 => Key::Digit8,
                KeyCode::Digit9 => Key::Digit9,

                KeyCode::F1 => Key::F1,
                KeyCode::F2 => Key::F2,
                KeyCode::F3 => Key::F3,
                KeyCode::F4 => Key::F4,
                KeyCode::F5 => Key::F5,
                KeyCode::F6 => Key::F6,
                KeyCode::F7 => Key::F7,
                KeyCode::F8 => Key::F8,
                KeyCode::F9 => Key::F9,
                KeyCode::F10 => Key::F10,
                KeyCode::F11 => Key::F11,
                KeyCode::F12 => Key::F12,

                other => Key::Unknown(other as u32),
            };

            (key, code as u32)
        }

        // No stable numeric code for unidentified keys.
        PhysicalKey::Unidentified(_) => (Key::Unknown(0), 0),
    }
}
