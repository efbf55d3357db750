//! Boundary feedback derived from a device's event stream.
//!
//! The engines emit `Expired`/`Warning` as single edges; the publisher owns
//! their wall-clock width and drops each signal back to false after the
//! configured pulse width. Everything else is level feedback mirrored from
//! the most recent event.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::events::TimerEvent;

/// Default pulse width for panel-facing edge signals.
pub const DEFAULT_PULSE_WIDTH: Duration = Duration::from_millis(500);

/// Outward-facing signal set mirrored to the control surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackState {
    pub running: bool,
    pub percent: u16,
    pub remaining_text: String,
    pub expired: bool,
    pub warning: bool,
}

/// Renders a device event stream into level and pulse feedback signals,
/// observable through a watch channel.
#[derive(Debug)]
pub struct FeedbackPublisher {
    state_rx: watch::Receiver<FeedbackState>,
    task: JoinHandle<()>,
}

impl FeedbackPublisher {
    /// Spawn the publisher task. Must be called within a tokio runtime.
    pub fn spawn(events: broadcast::Receiver<TimerEvent>, pulse_width: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(FeedbackState::default());
        let task = tokio::spawn(publish(events, state_tx, pulse_width));
        Self { state_rx, task }
    }

    /// Observe feedback changes.
    pub fn subscribe(&self) -> watch::Receiver<FeedbackState> {
        self.state_rx.clone()
    }

    /// The current signal set.
    pub fn current(&self) -> FeedbackState {
        self.state_rx.borrow().clone()
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for FeedbackPublisher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn publish(
    mut events: broadcast::Receiver<TimerEvent>,
    state_tx: watch::Sender<FeedbackState>,
    pulse_width: Duration,
) {
    let mut expired_until: Option<Instant> = None;
    let mut warning_until: Option<Instant> = None;
    loop {
        let deadline = match (expired_until, warning_until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => apply(
                    &state_tx,
                    &event,
                    &mut expired_until,
                    &mut warning_until,
                    pulse_width,
                ),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(missed, "feedback publisher lagged behind the event stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let now = Instant::now();
                if expired_until.is_some_and(|t| t <= now) {
                    expired_until = None;
                    state_tx.send_modify(|state| state.expired = false);
                }
                if warning_until.is_some_and(|t| t <= now) {
                    warning_until = None;
                    state_tx.send_modify(|state| state.warning = false);
                }
            }
        }
    }
}

fn apply(
    state_tx: &watch::Sender<FeedbackState>,
    event: &TimerEvent,
    expired_until: &mut Option<Instant>,
    warning_until: &mut Option<Instant>,
    pulse_width: Duration,
) {
    match event {
        TimerEvent::Started { .. } => state_tx.send_modify(|state| {
            state.running = true;
            state.percent = 0;
        }),
        TimerEvent::Progress { percent, text, .. } => state_tx.send_modify(|state| {
            if let Some(percent) = percent {
                state.percent = *percent;
            }
            state.remaining_text.clone_from(text);
        }),
        TimerEvent::Warning { .. } => {
            *warning_until = Some(Instant::now() + pulse_width);
            state_tx.send_modify(|state| state.warning = true);
        }
        TimerEvent::Expired { .. } => {
            *expired_until = Some(Instant::now() + pulse_width);
            state_tx.send_modify(|state| {
                state.expired = true;
                state.running = false;
            });
        }
        TimerEvent::Cancelled { .. } => state_tx.send_modify(|state| state.running = false),
        TimerEvent::Stopped { elapsed, .. } => state_tx.send_modify(|state| {
            state.running = false;
            state.remaining_text.clone_from(elapsed);
        }),
    }
}
