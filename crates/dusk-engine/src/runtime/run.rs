//! The run loop.
//!
//! A run walks NotStarted -> SettingUp -> Looping -> Draining/Closing ->
//! Torn down. Setup applies the configuration, brings up subsystems and the
//! window/renderer pair, then calls `load` once. The loop then steps the
//! clock, delivers input, and calls `update`/`draw` each pass until the
//! window closes or a fault puts the run into its error state. Teardown runs
//! on every exit path.

use anyhow::Context;

use crate::backend::{
    DesktopBackend, HeadlessBackend, SubsystemFlags, VideoBackend, WindowPlacement, WindowStyle,
};
use crate::core::{Canvas, Color, Game, RunConfig};
use crate::input::{Event, Key};
use crate::time::FrameClock;

use super::fault::{Fault, FaultHandler, Phase, catch_phase, panic_message};
use super::subsystems::{SubsystemLifecycle, SubsystemRegistry};
use super::surface::WindowSurfaceManager;

/// Backdrop of the built-in fault screen.
const FAULT_SCREEN_COLOR: Color = Color::rgb(30, 30, 30);

/// Pause between fault screen passes, so it does not busy-spin.
const FAULT_SCREEN_FRAME_SECONDS: f64 = 0.016;

/// Recovery surface size when a fault arrives with no window up.
const RECOVERY_SIZE: (i32, i32) = (800, 600);

/// How one run ended.
#[derive(Debug)]
pub enum RunExit {
    /// The window was closed normally.
    Completed,
    /// Subsystem, window or renderer acquisition failed; `load` never ran.
    SetupFailed(anyhow::Error),
    /// A callback faulted; the fault handler ran and the run drained.
    Faulted(Fault),
}

/// One runnable instance of the engine over a concrete backend.
///
/// All run-scoped state (clock, error state, window handles) lives here, so
/// "one active run at a time" falls out of `run` taking `&mut self`; only
/// the subsystem registry is shared process-wide.
pub struct Runtime<B: VideoBackend> {
    backend: B,
    config: RunConfig,
    subsystems: SubsystemLifecycle,
    surface: WindowSurfaceManager<B>,
    clock: FrameClock,
    handler: Option<Box<dyn FaultHandler>>,
    fault: Option<Fault>,
}

impl<B: VideoBackend> Runtime<B> {
    pub fn new(backend: B, config: RunConfig) -> Self {
        Self::with_registry(backend, config, SubsystemRegistry::global())
    }

    /// Builds a runtime around a private subsystem registry, so it does not
    /// share subsystem state with the rest of the process.
    pub fn with_registry(backend: B, config: RunConfig, registry: SubsystemRegistry) -> Self {
        Self {
            backend,
            config,
            subsystems: SubsystemLifecycle::new(registry),
            surface: WindowSurfaceManager::new(),
            clock: FrameClock::new(),
            handler: None,
            fault: None,
        }
    }

    /// Replaces the built-in fault screen with `handler`.
    pub fn set_fault_handler(&mut self, handler: impl FaultHandler + 'static) {
        self.handler = Some(Box::new(handler));
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Drives `game` through one complete run.
    ///
    /// Faults are contained: they end the run through [`RunExit::Faulted`]
    /// and never propagate out of this call. Teardown executes on every exit
    /// path exactly once.
    pub fn run(&mut self, game: &mut dyn Game) -> RunExit {
        self.fault = None;

        let exit = match self.setup(game) {
            Ok(()) => {
                self.main_loop(game);
                match self.fault.take() {
                    Some(fault) => RunExit::Faulted(fault),
                    None => RunExit::Completed,
                }
            }
            Err(e) => {
                log::error!("run setup failed: {e:#}");
                RunExit::SetupFailed(e)
            }
        };

        self.teardown();
        exit
    }

    fn setup(&mut self, game: &mut dyn Game) -> anyhow::Result<()> {
        self.subsystems
            .init(
                &mut self.backend,
                SubsystemFlags::VIDEO | SubsystemFlags::EVENTS,
            )
            .context("subsystem initialization failed")?;

        let window = self.config.window.clone();

        let mut style = WindowStyle::empty();
        style.set(WindowStyle::RESIZABLE, window.resizable);
        style.set(WindowStyle::BORDERLESS, window.borderless);
        style.set(WindowStyle::HIGH_DPI, window.high_dpi);

        self.surface
            .set_mode(&mut self.backend, window.width, window.height, style)
            .context("could not open a window with a renderer")?;

        // The rest of the configuration is applied best-effort; the run
        // proceeds on a plain window rather than aborting.
        if let Err(e) = self.surface.set_title(&mut self.backend, &window.title) {
            log::warn!("could not set window title: {e:#}");
        }
        if window.fullscreen {
            if let Err(e) =
                self.surface
                    .set_fullscreen(&mut self.backend, true, window.fullscreen_style)
            {
                log::warn!("could not enter fullscreen: {e:#}");
            }
        }
        if let Err(e) = self.surface.set_vsync(&mut self.backend, window.vsync) {
            log::warn!("could not apply vsync: {e:#}");
        }
        if let Some((x, y)) = window.position {
            if let Err(e) = self
                .surface
                .set_position(&mut self.backend, WindowPlacement::At(x, y))
            {
                log::warn!("could not position window: {e:#}");
            }
        }
        if let Some(path) = window.icon_path.as_deref() {
            if let Err(e) = self.surface.set_icon(&mut self.backend, path) {
                log::warn!("could not set window icon: {e:#}");
            }
        }

        self.clock.reset();

        // A load fault sets the error state rather than failing setup; the
        // loop observes it immediately and drains.
        if let Some(fault) = catch_phase(Phase::Load, || game.load()) {
            self.handle_fault(fault);
        }

        Ok(())
    }

    fn main_loop(&mut self, game: &mut dyn Game) {
        while self.surface.is_open() && self.fault.is_none() {
            let dt = self.clock.step();

            self.dispatch_events(game);

            if self.fault.is_none() && self.surface.is_open() {
                if let Some(fault) = catch_phase(Phase::Update, || game.update(dt as f32)) {
                    self.handle_fault(fault);
                }
            }

            if self.fault.is_none() && self.surface.is_open() {
                self.draw_frame(game);
            }
        }
    }

    fn dispatch_events(&mut self, game: &mut dyn Game) {
        // Drain the queue up front: a fault in one handler must not stop
        // delivery of events that were already queued behind it.
        let mut events = Vec::new();
        while let Some(event) = self.backend.poll_event() {
            events.push(event);
        }

        for event in events {
            let fault = match event {
                Event::Quit => {
                    self.surface.request_close();
                    None
                }
                Event::KeyDown {
                    key,
                    scancode,
                    repeat,
                } => catch_phase(Phase::KeyPressed, || game.key_pressed(key, scancode, repeat)),
                Event::KeyUp { key, scancode } => {
                    catch_phase(Phase::KeyReleased, || game.key_released(key, scancode))
                }
                Event::MouseDown {
                    x,
                    y,
                    button,
                    clicks,
                } => catch_phase(Phase::MousePressed, || game.mouse_pressed(x, y, button, clicks)),
                Event::MouseUp {
                    x,
                    y,
                    button,
                    clicks,
                } => catch_phase(Phase::MouseReleased, || {
                    game.mouse_released(x, y, button, clicks)
                }),
            };

            if let Some(fault) = fault {
                self.handle_fault(fault);
            }
        }
    }

    fn draw_frame(&mut self, game: &mut dyn Game) {
        let Runtime {
            backend, surface, ..
        } = self;

        let mut fault = None;
        if let Some((window, renderer)) = surface.canvas_parts() {
            let mut canvas = BackendCanvas {
                backend,
                window,
                renderer,
            };
            fault = catch_phase(Phase::Draw, || game.draw(&mut canvas));
        }

        match fault {
            Some(fault) => self.handle_fault(fault),
            None => self.surface.present(&mut self.backend),
        }
    }

    /// Records the fault (first one wins) and dispatches the registered
    /// handler, or the built-in fault screen when none is registered.
    fn handle_fault(&mut self, fault: Fault) {
        if self.fault.is_some() {
            log::error!("additional {fault}");
            return;
        }
        log::error!("{fault}");

        match self.handler.take() {
            Some(mut handler) => {
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    handler.handle(&fault)
                }));
                self.handler = Some(handler);

                if let Err(payload) = outcome {
                    log::error!(
                        "fault handler itself panicked: {}; closing the window",
                        panic_message(payload.as_ref())
                    );
                }
                self.surface.request_close();
            }
            None => self.fault_screen(&fault),
        }

        self.fault = Some(fault);
    }

    /// Built-in fault handling: show a neutral screen until the user
    /// dismisses it with Quit or Escape, then close the window.
    fn fault_screen(&mut self, fault: &Fault) {
        log::error!("unhandled {fault}; showing fault screen");

        if !self.surface.has_renderer() {
            let (w, h) = RECOVERY_SIZE;
            if let Err(e) =
                self.surface
                    .set_mode(&mut self.backend, w, h, WindowStyle::RESIZABLE)
            {
                log::error!("could not acquire a fault screen surface: {e:#}");
                self.surface.request_close();
                return;
            }
        }

        if self.subsystems.is_active(SubsystemFlags::EVENTS) {
            self.surface.reset_input_modes(&mut self.backend);
        }

        // Cooperative: exits only on user action, never on a timer.
        'screen: loop {
            while let Some(event) = self.backend.poll_event() {
                match event {
                    Event::Quit => break 'screen,
                    Event::KeyDown {
                        key: Key::Escape, ..
                    } => break 'screen,
                    _ => {}
                }
            }

            self.surface.clear(&mut self.backend, FAULT_SCREEN_COLOR);
            self.surface.present(&mut self.backend);
            FrameClock::sleep(FAULT_SCREEN_FRAME_SECONDS);
        }

        self.surface.request_close();
    }

    fn teardown(&mut self) {
        self.surface.shutdown(&mut self.backend);
        self.subsystems.shutdown(&mut self.backend);
    }
}

/// Per-frame drawing surface backed by the live window/renderer pair.
struct BackendCanvas<'a, B: VideoBackend> {
    backend: &'a mut B,
    window: &'a B::Window,
    renderer: &'a mut B::Renderer,
}

impl<B: VideoBackend> Canvas for BackendCanvas<'_, B> {
    fn clear(&mut self, color: Color) {
        if let Err(e) = self.backend.clear(self.renderer, color) {
            log::error!("clear failed during draw: {e:#}");
        }
    }

    fn size(&self) -> (u32, u32) {
        let info = self.backend.window_mode(self.window, Some(&*self.renderer));
        (info.pixel_width, info.pixel_height)
    }
}

/// Runs `game` to completion on the backend selected by `config`.
///
/// This is the whole-program entry point; it blocks until the run ends.
pub fn run(config: RunConfig, game: &mut dyn Game) -> RunExit {
    if config.headless {
        let mut runtime = Runtime::new(HeadlessBackend::new(), config);
        runtime.run(game)
    } else {
        let mut runtime = Runtime::new(DesktopBackend::new(), config);
        runtime.run(game)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::bail;

    use super::*;
    use crate::input::MouseButton;

    // ── fixtures ──

    #[derive(Default)]
    struct ScriptedGame {
        loads: u32,
        updates: u32,
        draws: u32,
        keys: Vec<Key>,
        buttons: Vec<MouseButton>,
        fail_load: bool,
        fail_key: Option<Key>,
        fail_update_on: Option<u32>,
    }

    impl Game for ScriptedGame {
        fn load(&mut self) -> anyhow::Result<()> {
            self.loads += 1;
            if self.fail_load {
                bail!("scripted load failure");
            }
            Ok(())
        }

        fn update(&mut self, _dt: f32) -> anyhow::Result<()> {
            self.updates += 1;
            if self.fail_update_on == Some(self.updates) {
                bail!("scripted update failure");
            }
            Ok(())
        }

        fn draw(&mut self, canvas: &mut dyn Canvas) -> anyhow::Result<()> {
            self.draws += 1;
            canvas.clear(Color::BLACK);
            Ok(())
        }

        fn key_pressed(&mut self, key: Key, _scancode: u32, _repeat: bool) -> anyhow::Result<()> {
            self.keys.push(key);
            if self.fail_key == Some(key) {
                bail!("scripted key failure");
            }
            Ok(())
        }

        fn mouse_pressed(
            &mut self,
            _x: f32,
            _y: f32,
            button: MouseButton,
            _clicks: u8,
        ) -> anyhow::Result<()> {
            self.buttons.push(button);
            Ok(())
        }
    }

    fn runtime() -> Runtime<HeadlessBackend> {
        Runtime::with_registry(
            HeadlessBackend::new(),
            RunConfig::default(),
            SubsystemRegistry::isolated(),
        )
    }

    fn key_down(key: Key) -> Event {
        Event::KeyDown {
            key,
            scancode: 0,
            repeat: false,
        }
    }

    // ── normal runs ──

    #[test]
    fn quit_event_completes_the_run() {
        let mut rt = runtime();
        rt.backend_mut().push_event(Event::Quit);
        let mut game = ScriptedGame::default();

        let exit = rt.run(&mut game);

        assert!(matches!(exit, RunExit::Completed));
        assert_eq!(game.loads, 1);
        // Quit lands in the first pass, before update/draw of that pass.
        assert_eq!(game.updates, 0);
        assert_eq!(game.draws, 0);

        let counters = rt.backend().counters();
        assert_eq!(counters.windows_destroyed, 1);
        assert_eq!(counters.renderers_destroyed, 1);
        assert_eq!(counters.native_quits, 1);
    }

    #[test]
    fn events_are_delivered_in_order_before_the_quit() {
        let mut rt = runtime();
        rt.backend_mut().push_event(key_down(Key::A));
        rt.backend_mut().push_event(Event::MouseDown {
            x: 4.0,
            y: 2.0,
            button: MouseButton::Left,
            clicks: 1,
        });
        rt.backend_mut().push_event(Event::Quit);
        let mut game = ScriptedGame::default();

        let exit = rt.run(&mut game);

        assert!(matches!(exit, RunExit::Completed));
        assert_eq!(game.keys, vec![Key::A]);
        assert_eq!(game.buttons, vec![MouseButton::Left]);
    }

    #[test]
    fn error_state_is_fresh_per_run() {
        let mut rt = runtime();
        rt.set_fault_handler(|_: &Fault| {});

        let mut game = ScriptedGame {
            fail_update_on: Some(1),
            ..Default::default()
        };
        assert!(matches!(rt.run(&mut game), RunExit::Faulted(_)));

        let mut game = ScriptedGame::default();
        rt.backend_mut().push_event(Event::Quit);
        assert!(matches!(rt.run(&mut game), RunExit::Completed));
        assert_eq!(rt.backend().counters().native_inits, 2);
    }

    #[test]
    fn frames_present_until_the_run_ends() {
        let mut rt = runtime();
        rt.set_fault_handler(|_: &Fault| {});
        let mut game = ScriptedGame {
            fail_update_on: Some(3),
            ..Default::default()
        };

        rt.run(&mut game);

        // Two full frames before the third update faults.
        assert_eq!(game.updates, 3);
        assert_eq!(game.draws, 2);
        let counters = rt.backend().counters();
        assert_eq!(counters.clears, 2);
        assert_eq!(counters.presents, 2);
    }

    // ── setup failures ──

    #[test]
    fn invalid_geometry_fails_setup_before_load() {
        let mut rt = runtime();
        rt.config.window.width = 0;
        let mut game = ScriptedGame::default();

        let exit = rt.run(&mut game);

        assert!(matches!(exit, RunExit::SetupFailed(_)));
        assert_eq!(game.loads, 0);

        let counters = rt.backend().counters();
        assert_eq!(counters.windows_created, 0);
        assert_eq!(counters.windows_destroyed, 0);
        // Teardown still quits the subsystems this run brought up.
        assert_eq!(counters.native_quits, 1);
    }

    #[test]
    fn subsystem_failure_aborts_before_any_window() {
        let mut rt = runtime();
        rt.backend_mut().fail.subsystem_init = true;
        let mut game = ScriptedGame::default();

        let exit = rt.run(&mut game);

        assert!(matches!(exit, RunExit::SetupFailed(_)));
        assert_eq!(game.loads, 0);
        assert_eq!(rt.backend().counters().windows_created, 0);
        assert_eq!(rt.backend().counters().native_quits, 0);
    }

    #[test]
    fn exhausted_renderer_fallback_is_a_setup_failure() {
        let mut rt = runtime();
        rt.backend_mut().fail.accelerated_renderer = true;
        rt.backend_mut().fail.software_renderer = true;
        let mut game = ScriptedGame::default();

        let exit = rt.run(&mut game);

        assert!(matches!(exit, RunExit::SetupFailed(_)));
        assert_eq!(game.loads, 0);

        let counters = rt.backend().counters();
        assert_eq!(counters.windows_created, 1);
        assert_eq!(counters.windows_destroyed, 1);
    }

    // ── fault containment ──

    #[test]
    fn load_fault_skips_update_and_draw_and_closes_the_window() {
        let mut rt = runtime();
        // Dismisses the fault screen as soon as it polls.
        rt.backend_mut().push_event(key_down(Key::Escape));
        let mut game = ScriptedGame {
            fail_load: true,
            ..Default::default()
        };

        let exit = rt.run(&mut game);

        match exit {
            RunExit::Faulted(fault) => assert_eq!(fault.phase, Phase::Load),
            other => panic!("expected a load fault, got {other:?}"),
        }
        assert_eq!(game.updates, 0);
        assert_eq!(game.draws, 0);

        let counters = rt.backend().counters();
        assert_eq!(counters.windows_destroyed, 1);
        assert_eq!(counters.native_quits, 1);
        // Dismissed before the fault screen drew a single frame.
        assert_eq!(counters.presents, 0);
    }

    #[test]
    fn fault_screen_resets_input_modes() {
        let mut rt = runtime();
        rt.backend_mut().push_event(Event::Quit);
        let mut game = ScriptedGame {
            fail_load: true,
            ..Default::default()
        };

        rt.run(&mut game);

        assert_eq!(rt.backend().counters().input_mode_resets, 1);
    }

    #[test]
    fn update_fault_skips_draw_but_not_teardown() {
        let mut rt = runtime();
        rt.set_fault_handler(|_: &Fault| {});
        let mut game = ScriptedGame {
            fail_update_on: Some(1),
            ..Default::default()
        };

        let exit = rt.run(&mut game);

        match exit {
            RunExit::Faulted(fault) => assert_eq!(fault.phase, Phase::Update),
            other => panic!("expected an update fault, got {other:?}"),
        }
        assert_eq!(game.updates, 1);
        assert_eq!(game.draws, 0);

        let counters = rt.backend().counters();
        assert_eq!(counters.windows_destroyed, 1);
        assert_eq!(counters.native_quits, 1);
    }

    #[test]
    fn custom_handler_sees_the_first_fault_only() {
        let seen: Arc<Mutex<Vec<Phase>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut rt = runtime();
        rt.set_fault_handler(move |fault: &Fault| {
            sink.lock().unwrap().push(fault.phase);
        });
        rt.backend_mut().push_event(key_down(Key::A));
        rt.backend_mut().push_event(key_down(Key::B));
        let mut game = ScriptedGame {
            fail_key: Some(Key::A),
            ..Default::default()
        };

        let exit = rt.run(&mut game);

        match exit {
            RunExit::Faulted(fault) => assert_eq!(fault.phase, Phase::KeyPressed),
            other => panic!("expected a key fault, got {other:?}"),
        }
        assert_eq!(*seen.lock().unwrap(), vec![Phase::KeyPressed]);
        // The already-queued B was still delivered after the fault.
        assert_eq!(game.keys, vec![Key::A, Key::B]);
    }

    #[test]
    fn panicking_custom_handler_is_contained() {
        let mut rt = runtime();
        rt.set_fault_handler(|_: &Fault| panic!("handler gone wrong"));
        let mut game = ScriptedGame {
            fail_load: true,
            ..Default::default()
        };

        let exit = rt.run(&mut game);

        assert!(matches!(exit, RunExit::Faulted(_)));
        // The window was force-closed and teardown still ran.
        let counters = rt.backend().counters();
        assert_eq!(counters.windows_destroyed, 1);
        assert_eq!(counters.native_quits, 1);
    }

    #[test]
    fn panicking_update_is_a_fault_not_an_unwind() {
        struct PanickyGame;
        impl Game for PanickyGame {
            fn load(&mut self) -> anyhow::Result<()> {
                Ok(())
            }
            fn update(&mut self, _dt: f32) -> anyhow::Result<()> {
                panic!("frame 1 blew up")
            }
            fn draw(&mut self, _canvas: &mut dyn Canvas) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let mut rt = runtime();
        rt.set_fault_handler(|_: &Fault| {});

        let exit = rt.run(&mut PanickyGame);

        match exit {
            RunExit::Faulted(fault) => {
                assert_eq!(fault.phase, Phase::Update);
                assert!(fault.error.to_string().contains("frame 1 blew up"));
            }
            other => panic!("expected an update fault, got {other:?}"),
        }
    }
}
