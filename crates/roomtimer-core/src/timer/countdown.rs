//! Countdown engine implementation.
//!
//! The countdown engine is a pure state machine. It does not own a thread or
//! a clock -- the device layer drives `tick()` once per second and forwards
//! the returned events to subscribers.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (expired | cancelled) -> Idle
//! ```
//!
//! Both outcomes restore the remaining count to the configured length before
//! the command handler returns, so `Idle` always means "armed with the full
//! configured length".

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{format_hms, TimerState};
use crate::config::CountdownProperties;
use crate::error::ConfigError;
use crate::events::TimerEvent;

/// Core countdown state machine for a single device.
///
/// All mutation goes through the command handlers and `tick()`; the device
/// layer serializes those behind one lock so a tick decrement and a
/// concurrent command can never interleave.
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    /// Nominal countdown length; restored after every finish/cancel.
    configured_secs: u64,
    remaining_secs: u64,
    warning_secs: Option<u64>,
    extend_secs: Option<u64>,
    state: TimerState,
    /// Armed on start and by extend, disarmed once the warning fires.
    warning_armed: bool,
    finish_time: Option<DateTime<Utc>>,
}

impl CountdownTimer {
    /// Build an idle engine from validated properties.
    ///
    /// Fails fast on a zero countdown length or a warning threshold beyond
    /// it; no engine is created for an invalid configuration.
    pub fn new(props: &CountdownProperties) -> Result<Self, ConfigError> {
        if props.countdown_time == 0 {
            return Err(ConfigError::InvalidValue {
                key: "countdown_time".into(),
                message: "must be greater than zero".into(),
            });
        }
        if let Some(warning) = props.warning_time {
            if warning > props.countdown_time {
                return Err(ConfigError::InvalidValue {
                    key: "warning_time".into(),
                    message: format!("must not exceed countdown_time ({})", props.countdown_time),
                });
            }
        }
        Ok(Self {
            configured_secs: props.countdown_time,
            remaining_secs: props.countdown_time,
            warning_secs: props.warning_time,
            extend_secs: props.extend_time,
            state: TimerState::Idle,
            warning_armed: false,
            finish_time: None,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn configured_secs(&self) -> u64 {
        self.configured_secs
    }

    pub fn finish_time(&self) -> Option<DateTime<Utc>> {
        self.finish_time
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a run from idle. Redundant starts are ignored.
    pub fn start(&mut self) -> Option<TimerEvent> {
        if self.state == TimerState::Running {
            debug!("start ignored while already counting");
            return None;
        }
        self.remaining_secs = self.configured_secs;
        self.warning_armed = self.warning_secs.is_some();
        let finish = Utc::now() + chrono::Duration::seconds(self.remaining_secs as i64);
        self.finish_time = Some(finish);
        self.state = TimerState::Running;
        Some(TimerEvent::Started {
            finish_time: Some(finish),
            at: Utc::now(),
        })
    }

    /// Abort the current run. No expired or warning pulse fires.
    pub fn cancel(&mut self) -> Option<TimerEvent> {
        if self.state != TimerState::Running {
            debug!("cancel ignored while idle");
            return None;
        }
        self.rearm();
        Some(TimerEvent::Cancelled { at: Utc::now() })
    }

    /// Force completion, or complete naturally when the count reaches zero.
    pub fn finish(&mut self) -> Option<TimerEvent> {
        if self.state != TimerState::Running {
            debug!("finish ignored while idle");
            return None;
        }
        self.rearm();
        Some(TimerEvent::Expired { at: Utc::now() })
    }

    /// Re-seed the remaining count mid-run without interrupting it.
    ///
    /// Uses the configured extend length, falling back to the full countdown
    /// length. Re-arms the warning so it can fire again on the new
    /// trajectory. Returns whether the extension applied so the caller can
    /// realign the tick cadence.
    pub fn extend(&mut self) -> bool {
        if self.state != TimerState::Running {
            debug!("extend ignored while idle");
            return false;
        }
        let seconds = self.extend_secs.unwrap_or(self.configured_secs);
        self.remaining_secs = seconds;
        self.warning_armed = self.warning_secs.is_some();
        self.finish_time = Some(Utc::now() + chrono::Duration::seconds(seconds as i64));
        debug!(seconds, "countdown extended");
        true
    }

    /// Update the configured length for future runs. A run already counting
    /// keeps its current remaining value; the new length takes effect at the
    /// next start/finish/cancel reset.
    pub fn set_countdown_length(&mut self, seconds: u64) {
        if seconds == 0 {
            warn!("ignoring countdown length of zero");
            return;
        }
        self.configured_secs = seconds;
        if self.state == TimerState::Idle {
            self.remaining_secs = seconds;
        }
        debug!(seconds, "countdown length updated");
    }

    /// Advance the countdown by one second.
    ///
    /// The single authoritative site for percent and warning derivation:
    /// both are computed from the same remaining-count sample, so the
    /// emitted batch is always internally consistent.
    pub fn tick(&mut self) -> Vec<TimerEvent> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);

        let mut events = vec![TimerEvent::Progress {
            seconds: self.remaining_secs,
            percent: Some(percent_complete(self.configured_secs, self.remaining_secs)),
            text: format_hms(self.remaining_secs),
            at: Utc::now(),
        }];
        if self.warning_armed && Some(self.remaining_secs) == self.warning_secs {
            self.warning_armed = false;
            events.push(TimerEvent::Warning { at: Utc::now() });
        }
        if self.remaining_secs == 0 {
            if let Some(expired) = self.finish() {
                events.push(expired);
            }
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn rearm(&mut self) {
        self.state = TimerState::Idle;
        self.remaining_secs = self.configured_secs;
        self.warning_armed = false;
        self.finish_time = None;
    }
}

/// `round(100 * elapsed / configured)`, in integer arithmetic.
/// `configured` is non-zero by construction.
fn percent_complete(configured: u64, remaining: u64) -> u16 {
    let elapsed = configured.saturating_sub(remaining);
    ((elapsed * 100 + configured / 2) / configured) as u16
}
