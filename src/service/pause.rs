//! Pause/resume state shared between the monitor loop and activity sources

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::service::activity::ActivityEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseState {
    Active,
    Paused,
}

/// Cloneable handle over a single atomic flag
///
/// Written by the activity pump, read once per tick by the monitor loop.
#[derive(Debug, Clone, Default)]
pub struct PauseController {
    paused: Arc<AtomicBool>,
}

impl PauseController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deactivate(&self) {
        if !self.paused.swap(true, Ordering::AcqRel) {
            info!("Monitoring paused");
        }
    }

    pub fn activate(&self) {
        if self.paused.swap(false, Ordering::AcqRel) {
            info!("Monitoring resumed");
        }
    }

    pub fn apply(&self, event: ActivityEvent) {
        match event {
            ActivityEvent::Inactive => self.deactivate(),
            ActivityEvent::Active => self.activate(),
        }
    }

    /// Back to Active without logging a transition
    pub fn reset(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PauseState {
        if self.is_paused() {
            PauseState::Paused
        } else {
            PauseState::Active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_active() {
        assert_eq!(PauseController::new().state(), PauseState::Active);
    }

    #[test]
    fn test_repeated_deactivate_then_activate() {
        let pause = PauseController::new();
        pause.deactivate();
        pause.deactivate();
        assert_eq!(pause.state(), PauseState::Paused);
        pause.activate();
        assert_eq!(pause.state(), PauseState::Active);
    }

    #[test]
    fn test_activate_while_active_is_noop() {
        let pause = PauseController::new();
        pause.activate();
        assert!(!pause.is_paused());
    }

    #[test]
    fn test_events_and_shared_handles() {
        let pause = PauseController::new();
        let handle = pause.clone();

        handle.apply(ActivityEvent::Inactive);
        assert!(pause.is_paused());
        handle.apply(ActivityEvent::Active);
        assert!(!pause.is_paused());

        handle.apply(ActivityEvent::Inactive);
        pause.reset();
        assert_eq!(handle.state(), PauseState::Active);
    }
}
