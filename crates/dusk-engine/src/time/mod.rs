//! Time subsystem.
//!
//! Provides stable, testable frame timing without coupling to the runtime.
//! Intended usage:
//! - one `FrameClock` per run loop
//! - call `step()` once per frame to advance delta, rolling average and FPS

mod frame_clock;

pub use frame_clock::FrameClock;
