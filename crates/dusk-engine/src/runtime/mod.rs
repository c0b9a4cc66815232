//! Run orchestration.
//!
//! [`Runtime`] sequences one complete run: subsystem bring-up
//! ([`SubsystemLifecycle`]), window/renderer acquisition
//! ([`WindowSurfaceManager`]), the frame loop, and fault containment around
//! every game callback ([`Fault`], [`FaultHandler`]).

mod fault;
mod run;
mod subsystems;
mod surface;

pub use fault::{Fault, FaultHandler, Phase};
pub use run::{RunExit, Runtime, run};
pub use subsystems::{SubsystemLifecycle, SubsystemRegistry};
pub use surface::WindowSurfaceManager;
