//! Count-up engine implementation.
//!
//! Structurally the countdown's sibling: a pure state machine driven by the
//! device layer once per second. The elapsed count only grows while
//! running; stop reports the final value and clears it.

use chrono::Utc;
use tracing::debug;

use super::{format_hms, TimerState};
use crate::config::CountupProperties;
use crate::events::TimerEvent;

/// Core count-up state machine for a single device.
#[derive(Debug, Clone)]
pub struct CountupTimer {
    elapsed_secs: u64,
    state: TimerState,
    reset_clears_elapsed: bool,
}

impl CountupTimer {
    pub fn new(props: &CountupProperties) -> Self {
        Self {
            elapsed_secs: 0,
            state: TimerState::Idle,
            reset_clears_elapsed: props.reset_clears_elapsed,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin counting. The elapsed count continues from its current value;
    /// distinguishing "start" from "restart" is the caller's call.
    pub fn start(&mut self) -> Option<TimerEvent> {
        if self.state == TimerState::Running {
            debug!("start ignored while already counting");
            return None;
        }
        self.state = TimerState::Running;
        Some(TimerEvent::Started {
            finish_time: None,
            at: Utc::now(),
        })
    }

    /// Stop counting and report the final elapsed time, then clear it.
    pub fn stop(&mut self) -> Option<TimerEvent> {
        if self.state != TimerState::Running {
            debug!("stop ignored while idle");
            return None;
        }
        self.state = TimerState::Idle;
        let final_elapsed = format_hms(self.elapsed_secs);
        self.elapsed_secs = 0;
        Some(TimerEvent::Stopped {
            elapsed: final_elapsed,
            at: Utc::now(),
        })
    }

    /// Realign after an external resync. The elapsed count survives unless
    /// the clear-and-restart variant was configured; running state is never
    /// flipped. The cadence restart itself is the device layer's job.
    pub fn reset(&mut self) {
        if self.reset_clears_elapsed {
            self.elapsed_secs = 0;
        }
        debug!(elapsed = self.elapsed_secs, "count-up reset");
    }

    /// Advance the elapsed count by one second.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.state != TimerState::Running {
            return None;
        }
        self.elapsed_secs += 1;
        Some(TimerEvent::Progress {
            seconds: self.elapsed_secs,
            percent: None,
            text: format_hms(self.elapsed_secs),
            at: Utc::now(),
        })
    }
}
