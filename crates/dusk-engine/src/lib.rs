//! Dusk engine crate.
//!
//! A frame-based application runtime: it owns the backend lifecycle, drives
//! the load -> (poll -> update -> draw) cycle, and contains faults raised by
//! game callbacks so a bad frame ends the run cleanly instead of crashing.

pub mod backend;
pub mod core;
pub mod input;
pub mod logging;
pub mod runtime;
pub mod time;

pub use crate::core::{Canvas, Color, Game, RunConfig, WindowConfig, headless_from_env};
pub use crate::runtime::{RunExit, Runtime, run};
