use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum RunState {
    Running = 0,
    StopRequested = 1,
    Stopped = 2,
}

impl RunState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RunState::Running,
            1 => RunState::StopRequested,
            _ => RunState::Stopped,
        }
    }
}

/// Stop flag shared by the decode worker and the render loop.
///
/// Transitions only move forward: `Running -> StopRequested -> Stopped`
/// (the worker may also go straight to `Stopped` on end of stream or error).
#[derive(Debug, Default)]
pub struct PipelineState {
    state: AtomicU8,
    aborted: AtomicBool,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Asks the worker to stop at its next read. No effect once stopped.
    pub fn request_stop(&self) {
        self.state
            .fetch_max(RunState::StopRequested as u8, Ordering::AcqRel);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.get() >= RunState::StopRequested
    }

    /// Worker reached its terminal state. `aborted` marks an abnormal exit.
    pub fn mark_stopped(&self, aborted: bool) {
        if aborted {
            self.aborted.store(true, Ordering::Release);
        }
        self.state.fetch_max(RunState::Stopped as u8, Ordering::AcqRel);
    }

    pub fn is_stopped(&self) -> bool {
        self.get() == RunState::Stopped
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_monotonic() {
        let state = PipelineState::new();
        assert_eq!(state.get(), RunState::Running);

        state.request_stop();
        assert_eq!(state.get(), RunState::StopRequested);
        assert!(state.is_stop_requested());

        state.mark_stopped(false);
        assert!(state.is_stopped());
        assert!(!state.is_aborted());

        state.request_stop();
        assert_eq!(state.get(), RunState::Stopped);
    }

    #[test]
    fn test_abnormal_stop_without_request() {
        let state = PipelineState::new();
        state.mark_stopped(true);
        assert!(state.is_stopped());
        assert!(state.is_stop_requested());
        assert!(state.is_aborted());
    }
}
