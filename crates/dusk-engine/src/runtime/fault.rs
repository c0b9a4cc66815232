//! Fault capture around user callbacks.
//!
//! Each phase invocation is funnelled through [`catch_phase`], which turns
//! both `Err` returns and panics into a [`Fault`] value the run loop can
//! branch on, instead of letting either unwind through the loop.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use anyhow::{Result, anyhow};

/// The callback a fault escaped from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Load,
    Update,
    Draw,
    KeyPressed,
    KeyReleased,
    MousePressed,
    MouseReleased,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Load => "load",
            Phase::Update => "update",
            Phase::Draw => "draw",
            Phase::KeyPressed => "key_pressed",
            Phase::KeyReleased => "key_released",
            Phase::MousePressed => "mouse_pressed",
            Phase::MouseReleased => "mouse_released",
        })
    }
}

/// An error or panic that escaped one phase invocation.
#[derive(Debug)]
pub struct Fault {
    pub phase: Phase,
    pub error: anyhow::Error,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fault in {}: {:#}", self.phase, self.error)
    }
}

/// Recovery handler invoked for the first fault of a run.
///
/// Registering one fully replaces the built-in fault screen. Closures
/// implement this directly.
pub trait FaultHandler {
    fn handle(&mut self, fault: &Fault);
}

impl<F: FnMut(&Fault)> FaultHandler for F {
    fn handle(&mut self, fault: &Fault) {
        self(fault)
    }
}

/// Runs `action`, converting an `Err` return or a panic into a [`Fault`].
pub fn catch_phase(phase: Phase, action: impl FnOnce() -> Result<()>) -> Option<Fault> {
    match panic::catch_unwind(AssertUnwindSafe(action)) {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(Fault { phase, error }),
        Err(payload) => Some(Fault {
            phase,
            error: anyhow!("panic: {}", panic_message(payload.as_ref())),
        }),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    #[test]
    fn success_produces_no_fault() {
        assert!(catch_phase(Phase::Update, || Ok(())).is_none());
    }

    #[test]
    fn err_return_becomes_a_fault_with_its_phase() {
        let fault = catch_phase(Phase::Load, || bail!("asset missing")).unwrap();
        assert_eq!(fault.phase, Phase::Load);
        assert!(fault.to_string().contains("load"));
        assert!(fault.to_string().contains("asset missing"));
    }

    #[test]
    fn panic_is_captured_as_a_fault() {
        let fault = catch_phase(Phase::Draw, || panic!("boom")).unwrap();
        assert_eq!(fault.phase, Phase::Draw);
        assert!(fault.error.to_string().contains("boom"));
    }

    #[test]
    fn closures_are_fault_handlers() {
        let mut seen = Vec::new();
        let mut handler = |fault: &Fault| seen.push(fault.phase);

        let fault = Fault {
            phase: Phase::KeyPressed,
            error: anyhow!("nope"),
        };
        FaultHandler::handle(&mut handler, &fault);

        assert_eq!(seen, vec![Phase::KeyPressed]);
    }
}
