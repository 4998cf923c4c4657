//! UpdateScheduler
//! Coalesces any number of refresh requests into one pass per animation
//! frame.
//!
//! Idle --schedule--> Pending --frame--> Refreshing --work done--> Idle
//!
//! `schedule` outside `Idle` does nothing. The work run on the frame reads
//! current state, so nothing is lost by not queueing.

use crate::provider::ViewHost;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Pending,
    Refreshing,
}

#[derive(Debug, Default)]
pub struct UpdateScheduler {
    state: SchedulerState,
    frames: u64,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state != SchedulerState::Idle
    }

    /// Number of frames that actually ran work.
    pub fn frames_run(&self) -> u64 {
        self.frames
    }

    /// Returns true if this call requested a frame.
    pub fn schedule(&mut self, host: &dyn ViewHost) -> bool {
        if self.state != SchedulerState::Idle {
            return false;
        }
        self.state = SchedulerState::Pending;
        host.request_frame();
        true
    }

    /// Pending -> Refreshing. False if no refresh was pending.
    pub fn begin_frame(&mut self) -> bool {
        if self.state != SchedulerState::Pending {
            return false;
        }
        self.state = SchedulerState::Refreshing;
        true
    }

    /// Refreshing -> Idle.
    pub fn finish_frame(&mut self) {
        if self.state == SchedulerState::Refreshing {
            self.frames += 1;
            self.state = SchedulerState::Idle;
        }
    }

    /// Runs `work` if a refresh is pending. Returns whether it ran.
    pub fn run_frame<F>(&mut self, work: F) -> bool
    where
        F: FnOnce(),
    {
        if !self.begin_frame() {
            return false;
        }
        work();
        self.finish_frame();
        true
    }
}
