//! Periodic tick scheduling on the tokio runtime.
//!
//! Each engine owns exactly one `TickScheduler`; starting an already-active
//! handle stops the prior task first, so a handle never drives two
//! concurrent tick loops.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

use crate::error::SchedulerError;

/// Whether the scheduler should keep ticking after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/// Owns at most one recurring tick task.
///
/// The callback runs inline in the owning task, so at most one tick is in
/// flight per handle and a long callback delays, rather than overlaps, the
/// next tick. The fixed-period `tokio::time::interval` keeps the cadence
/// anchored to the arm instant instead of accumulating per-tick drift.
#[derive(Debug, Default)]
pub struct TickScheduler {
    active: Option<ActiveTick>,
}

#[derive(Debug)]
struct ActiveTick {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the cadence: `on_tick` fires every `period`, first firing one
    /// full period from now. Any prior task is stopped first.
    pub fn start<F>(&mut self, period: Duration, mut on_tick: F) -> Result<(), SchedulerError>
    where
        F: FnMut() -> TickFlow + Send + 'static,
    {
        self.stop();
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick completes immediately; consume it so
            // the first callback lands one full period after arming.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        trace!("tick");
                        if on_tick() == TickFlow::Stop {
                            break;
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
        });
        self.active = Some(ActiveTick { stop_tx, task });
        Ok(())
    }

    /// Re-arm so the next tick lands exactly one period from now, without a
    /// skipped or doubled tick around the restart.
    pub fn restart<F>(&mut self, period: Duration, on_tick: F) -> Result<(), SchedulerError>
    where
        F: FnMut() -> TickFlow + Send + 'static,
    {
        self.start(period, on_tick)
    }

    /// Stop the cadence. Safe to call when idle.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.stop_tx.send(true);
            active.task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|a| !a.task.is_finished())
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
