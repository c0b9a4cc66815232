//! Minimal game driving the dusk runtime.
//!
//! Left/right arrows cycle the clear color; `B` deliberately faults to show
//! the built-in fault screen (dismiss it with Escape or by closing the
//! window). Run with `DUSK_VIDEODRIVER=dummy` for a headless pass.

use anyhow::{Result, bail};
use dusk_engine::input::Key;
use dusk_engine::logging::{LoggingConfig, init_logging};
use dusk_engine::{Canvas, Color, Game, RunConfig, RunExit, headless_from_env, run};

const PALETTE: [Color; 4] = [
    Color::rgb(30, 30, 46),
    Color::rgb(46, 30, 30),
    Color::rgb(30, 46, 30),
    Color::rgb(46, 42, 16),
];

struct Demo {
    slot: usize,
    elapsed: f32,
}

impl Game for Demo {
    fn load(&mut self) -> Result<()> {
        log::info!("demo loaded; arrows cycle colors, B faults on purpose");
        Ok(())
    }

    fn update(&mut self, dt: f32) -> Result<()> {
        self.elapsed += dt;
        Ok(())
    }

    fn draw(&mut self, canvas: &mut dyn Canvas) -> Result<()> {
        canvas.clear(PALETTE[self.slot]);
        Ok(())
    }

    fn key_pressed(&mut self, key: Key, _scancode: u32, repeat: bool) -> Result<()> {
        if repeat {
            return Ok(());
        }
        match key {
            Key::ArrowRight => self.slot = (self.slot + 1) % PALETTE.len(),
            Key::ArrowLeft => self.slot = (self.slot + PALETTE.len() - 1) % PALETTE.len(),
            Key::B => bail!("demo fault requested from the keyboard"),
            _ => {}
        }
        Ok(())
    }
}

fn main() {
    let headless = headless_from_env();
    init_logging(LoggingConfig {
        headless,
        ..Default::default()
    });

    let mut config = RunConfig::default();
    config.headless = headless;
    config.window.title = "dusk demo".to_string();

    let mut demo = Demo {
        slot: 0,
        elapsed: 0.0,
    };

    match run(config, &mut demo) {
        RunExit::Completed => log::info!("run completed after {:.1}s", demo.elapsed),
        RunExit::SetupFailed(e) => log::error!("setup failed: {e:#}"),
        RunExit::Faulted(fault) => log::error!("run ended on a {fault}"),
    }
}
