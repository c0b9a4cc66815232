//! Core engine-facing contracts.
//!
//! Defines the stable interface between the runtime and game code: the
//! [`Game`] callback trait, the per-frame [`Canvas`], and the configuration
//! consumed once per run. Runtime internals do not leak through this module.

mod config;
mod game;

pub use config::{headless_from_env, FullscreenStyle, RunConfig, WindowConfig};
pub use game::{Canvas, Color, Game};
