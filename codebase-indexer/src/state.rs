use serde::Serialize;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Whether a full build is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Idle,
    Building,
}

/// Word value while a full build holds the gate. Any smaller value is the
/// number of incremental updates in flight.
const BUILDING: usize = usize::MAX;

/// Shared/exclusive gate between full builds and incremental updates.
///
/// A build needs the gate to itself; updates share it with each other.
/// Neither side ever waits: a refused build reports `Busy`, a refused update
/// is skipped.
#[derive(Debug, Default)]
pub struct BuildGate {
    state: AtomicUsize,
}

impl BuildGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves to `Building`, or returns `None` if a build or any update is
    /// in flight.
    pub fn try_begin(&self) -> Option<BuildGuard<'_>> {
        self.state
            .compare_exchange(0, BUILDING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BuildGuard { gate: self })
    }

    /// Registers one more update, or returns `None` while a build runs.
    pub fn try_begin_update(&self) -> Option<UpdateGuard<'_>> {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < BUILDING - 1).then_some(current + 1)
            })
            .ok()
            .map(|_| UpdateGuard { gate: self })
    }

    pub fn state(&self) -> BuildState {
        if self.state.load(Ordering::Acquire) == BUILDING {
            BuildState::Building
        } else {
            BuildState::Idle
        }
    }

    pub fn is_building(&self) -> bool {
        self.state() == BuildState::Building
    }

    pub fn updates_in_flight(&self) -> usize {
        match self.state.load(Ordering::Acquire) {
            BUILDING => 0,
            updates => updates,
        }
    }
}

/// Returns the gate to `Idle` when dropped, on every exit path.
#[derive(Debug)]
pub struct BuildGuard<'a> {
    gate: &'a BuildGate,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.gate.state.store(0, Ordering::Release);
    }
}

/// One update's share of the gate.
#[derive(Debug)]
pub struct UpdateGuard<'a> {
    gate: &'a BuildGate,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.gate.state.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_second_begin_is_refused() {
        let gate = BuildGate::new();
        assert_eq!(gate.state(), BuildState::Idle);

        let guard = gate.try_begin().expect("first build starts");
        assert!(gate.is_building());
        assert!(gate.try_begin().is_none());

        drop(guard);
        assert_eq!(gate.state(), BuildState::Idle);
        assert!(gate.try_begin().is_some());
    }

    #[test]
    fn test_guard_resets_on_early_return() {
        fn failing_build(gate: &BuildGate) -> Result<(), String> {
            let _guard = gate.try_begin().ok_or("busy")?;
            Err("setup failed".to_string())
        }

        let gate = BuildGate::new();
        assert!(failing_build(&gate).is_err());
        assert!(!gate.is_building());
    }

    #[test]
    fn test_updates_share_the_gate_and_exclude_builds() {
        let gate = BuildGate::new();
        let first = gate.try_begin_update().expect("first update");
        let second = gate.try_begin_update().expect("updates share the gate");
        assert_eq!(gate.updates_in_flight(), 2);
        assert_eq!(gate.state(), BuildState::Idle);
        assert!(gate.try_begin().is_none());

        drop(first);
        assert!(gate.try_begin().is_none());
        drop(second);
        assert_eq!(gate.updates_in_flight(), 0);

        let build = gate.try_begin().expect("build starts once updates finish");
        assert!(gate.try_begin_update().is_none());
        drop(build);
        assert!(gate.try_begin_update().is_some());
    }
}
