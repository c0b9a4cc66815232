//! Process-wide backend subsystem lifecycle.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use anyhow::Result;

use crate::backend::{SubsystemFlags, VideoBackend};

/// Shared record of which backend subsystems are natively active.
///
/// Normal operation uses the per-process [`SubsystemRegistry::global`]
/// registry; tests use [`SubsystemRegistry::isolated`] so they do not
/// interfere with each other.
#[derive(Clone)]
pub struct SubsystemRegistry {
    active: Arc<Mutex<SubsystemFlags>>,
}

impl SubsystemRegistry {
    pub fn global() -> Self {
        static ACTIVE: OnceLock<Arc<Mutex<SubsystemFlags>>> = OnceLock::new();
        Self {
            active: ACTIVE
                .get_or_init(|| Arc::new(Mutex::new(SubsystemFlags::empty())))
                .clone(),
        }
    }

    pub fn isolated() -> Self {
        Self {
            active: Arc::new(Mutex::new(SubsystemFlags::empty())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SubsystemFlags> {
        // A poisoned lock only means another run panicked while holding it;
        // the flag set itself is still coherent.
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One run's view of the registry.
///
/// Remembers exactly which flags this run turned on, so [`shutdown`] never
/// tears down subsystems another run (or the host process) still relies on.
///
/// [`shutdown`]: SubsystemLifecycle::shutdown
pub struct SubsystemLifecycle {
    registry: SubsystemRegistry,
    this_run: SubsystemFlags,
}

impl SubsystemLifecycle {
    pub fn new(registry: SubsystemRegistry) -> Self {
        Self {
            registry,
            this_run: SubsystemFlags::empty(),
        }
    }

    /// Turns on `flags`, skipping any that are already active process-wide.
    ///
    /// On native failure nothing is recorded, so a later [`shutdown`] stays a
    /// no-op for the failed flags.
    ///
    /// [`shutdown`]: SubsystemLifecycle::shutdown
    pub fn init<B: VideoBackend>(&mut self, backend: &mut B, flags: SubsystemFlags) -> Result<()> {
        let mut active = self.registry.lock();

        let missing = flags - *active;
        if missing.is_empty() {
            log::debug!("subsystems already active: {flags:?}");
            return Ok(());
        }

        backend.init_subsystems(missing)?;
        *active |= missing;
        self.this_run |= missing;
        Ok(())
    }

    /// Quits exactly the subsystems this value turned on.
    ///
    /// Safe to call when [`init`] never ran or failed, and safe to call twice.
    ///
    /// [`init`]: SubsystemLifecycle::init
    pub fn shutdown<B: VideoBackend>(&mut self, backend: &mut B) {
        if self.this_run.is_empty() {
            return;
        }

        let mut active = self.registry.lock();
        backend.quit_subsystems(self.this_run);
        *active -= self.this_run;
        self.this_run = SubsystemFlags::empty();
    }

    /// Whether all of `flags` are active process-wide.
    pub fn is_active(&self, flags: SubsystemFlags) -> bool {
        self.registry.lock().contains(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    const BOTH: SubsystemFlags = SubsystemFlags::VIDEO.union(SubsystemFlags::EVENTS);

    #[test]
    fn init_twice_performs_one_native_init() {
        let mut backend = HeadlessBackend::new();
        let mut lifecycle = SubsystemLifecycle::new(SubsystemRegistry::isolated());

        lifecycle.init(&mut backend, BOTH).unwrap();
        lifecycle.init(&mut backend, BOTH).unwrap();

        assert_eq!(backend.counters().native_inits, 1);
        assert!(lifecycle.is_active(BOTH));
    }

    #[test]
    fn shutdown_quits_only_what_this_run_started() {
        let registry = SubsystemRegistry::isolated();
        let mut backend = HeadlessBackend::new();

        let mut first = SubsystemLifecycle::new(registry.clone());
        first.init(&mut backend, BOTH).unwrap();

        // Second run finds everything already active and owns nothing.
        let mut second = SubsystemLifecycle::new(registry.clone());
        second.init(&mut backend, BOTH).unwrap();
        second.shutdown(&mut backend);

        assert_eq!(backend.counters().native_quits, 0);
        assert!(first.is_active(BOTH));

        first.shutdown(&mut backend);
        assert_eq!(backend.counters().native_quits, 1);
        assert!(!second.is_active(SubsystemFlags::VIDEO));
    }

    #[test]
    fn shutdown_without_init_is_a_noop() {
        let mut backend = HeadlessBackend::new();
        let mut lifecycle = SubsystemLifecycle::new(SubsystemRegistry::isolated());

        lifecycle.shutdown(&mut backend);
        lifecycle.shutdown(&mut backend);

        assert_eq!(backend.counters().native_quits, 0);
    }

    #[test]
    fn failed_init_leaves_state_untouched() {
        let mut backend = HeadlessBackend::new();
        backend.fail.subsystem_init = true;
        let mut lifecycle = SubsystemLifecycle::new(SubsystemRegistry::isolated());

        assert!(lifecycle.init(&mut backend, BOTH).is_err());
        assert!(!lifecycle.is_active(SubsystemFlags::VIDEO));

        lifecycle.shutdown(&mut backend);
        assert_eq!(backend.counters().native_quits, 0);
    }
}
