//! Live countdown device.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info};

use super::{EVENT_CHANNEL_CAPACITY, TICK_PERIOD};
use crate::config::CountdownProperties;
use crate::error::{ConfigError, SchedulerError};
use crate::events::TimerEvent;
use crate::timer::{CountdownTimer, TickFlow, TickScheduler};

/// A countdown engine wired to its own tick cadence and event stream.
///
/// All command handlers and the tick callback lock the same engine state,
/// so a tick decrement and a concurrent `extend`/`cancel` cannot interleave
/// into an inconsistent remaining/running pair.
#[derive(Debug)]
pub struct CountdownDevice {
    key: String,
    timer: Arc<Mutex<CountdownTimer>>,
    scheduler: Mutex<TickScheduler>,
    events: broadcast::Sender<TimerEvent>,
    pulse_width: Duration,
}

impl CountdownDevice {
    /// Build an idle device. Fails fast on an invalid configuration.
    pub fn new(key: &str, props: CountdownProperties) -> Result<Self, ConfigError> {
        let timer = CountdownTimer::new(&props)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            key: key.to_string(),
            timer: Arc::new(Mutex::new(timer)),
            scheduler: Mutex::new(TickScheduler::new()),
            events,
            pulse_width: props.pulse_width(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Pulse width the boundary publisher should use for this device's
    /// expired/warning edges.
    pub fn pulse_width(&self) -> Duration {
        self.pulse_width
    }

    pub fn is_running(&self) -> bool {
        self.with_timer(|t| t.is_running()).unwrap_or(false)
    }

    pub fn remaining_secs(&self) -> u64 {
        self.with_timer(|t| t.remaining_secs()).unwrap_or(0)
    }

    /// Subscribe to this device's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a run from idle and arm the 1 Hz cadence.
    pub fn start(&self) {
        let Some(Some(started)) = self.with_timer(CountdownTimer::start) else {
            return;
        };
        if let Err(err) = self.arm_cadence() {
            error!(key = %self.key, "failed to arm tick cadence: {err}");
            if let Some(Some(cancelled)) = self.with_timer(CountdownTimer::cancel) {
                self.emit(cancelled);
            }
            return;
        }
        info!(key = %self.key, remaining = self.remaining_secs(), "countdown started");
        self.emit(started);
    }

    /// Abort the current run. No-op while idle.
    pub fn cancel(&self) {
        let Some(Some(cancelled)) = self.with_timer(CountdownTimer::cancel) else {
            return;
        };
        self.stop_cadence();
        info!(key = %self.key, "countdown cancelled");
        self.emit(cancelled);
    }

    /// Force completion of the current run. No-op while idle.
    pub fn finish(&self) {
        let Some(Some(expired)) = self.with_timer(CountdownTimer::finish) else {
            return;
        };
        self.stop_cadence();
        info!(key = %self.key, "countdown finished");
        self.emit(expired);
    }

    /// Extend the current run and realign the cadence so the next decrement
    /// lands a full second from now. No-op while idle.
    pub fn extend(&self) {
        if self.with_timer(CountdownTimer::extend) != Some(true) {
            return;
        }
        if let Err(err) = self.arm_cadence() {
            error!(key = %self.key, "failed to realign tick cadence: {err}");
            if let Some(Some(cancelled)) = self.with_timer(CountdownTimer::cancel) {
                self.emit(cancelled);
            }
        }
    }

    /// Update the configured length for future runs.
    pub fn set_countdown_length(&self, seconds: u64) {
        self.with_timer(|timer| timer.set_countdown_length(seconds));
    }

    /// Cancel any active run and release the tick task. The device stays
    /// usable; the next `start` re-arms.
    pub fn shutdown(&self) {
        self.cancel();
        self.stop_cadence();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn with_timer<R>(&self, f: impl FnOnce(&mut CountdownTimer) -> R) -> Option<R> {
        match self.timer.lock() {
            Ok(mut timer) => Some(f(&mut timer)),
            Err(err) => {
                error!(key = %self.key, "timer state lock poisoned: {err}");
                None
            }
        }
    }

    fn arm_cadence(&self) -> Result<(), SchedulerError> {
        let timer = Arc::clone(&self.timer);
        let events = self.events.clone();
        let key = self.key.clone();
        let callback = move || {
            let (batch, still_running) = match timer.lock() {
                Ok(mut timer) => {
                    let batch = timer.tick();
                    (batch, timer.is_running())
                }
                Err(err) => {
                    error!(key = %key, "timer state lock poisoned: {err}");
                    return TickFlow::Stop;
                }
            };
            for event in batch {
                let _ = events.send(event);
            }
            if still_running {
                TickFlow::Continue
            } else {
                TickFlow::Stop
            }
        };
        match self.scheduler.lock() {
            Ok(mut scheduler) => scheduler.start(TICK_PERIOD, callback),
            Err(_) => Err(SchedulerError::HandleUnusable),
        }
    }

    fn stop_cadence(&self) {
        if let Ok(mut scheduler) = self.scheduler.lock() {
            scheduler.stop();
        }
    }

    fn emit(&self, event: TimerEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn drain(rx: &mut broadcast::Receiver<TimerEvent>) -> Vec<TimerEvent> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => out.push(event),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
        out
    }

    fn device(countdown: u64, warning: Option<u64>, extend: Option<u64>) -> CountdownDevice {
        let mut props = CountdownProperties::new(countdown);
        props.warning_time = warning;
        props.extend_time = extend;
        CountdownDevice::new("test", props).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_expiry_and_resets() {
        let device = device(3, None, None);
        let mut rx = device.subscribe();

        device.start();
        settle().await;
        tokio::time::advance(Duration::from_secs(3)).await;
        settle().await;

        let events = drain(&mut rx);
        assert!(matches!(events[0], TimerEvent::Started { finish_time: Some(_), .. }));
        let progress: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TimerEvent::Progress { seconds, .. } => Some(*seconds),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![2, 1, 0]);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, TimerEvent::Expired { .. }))
                .count(),
            1
        );

        assert!(!device.is_running());
        assert_eq!(device.remaining_secs(), 3);

        // No stray ticks after expiry.
        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_cadence() {
        let device = device(10, Some(3), None);
        let mut rx = device.subscribe();

        device.start();
        settle().await;
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        device.cancel();
        settle().await;

        tokio::time::advance(Duration::from_secs(20)).await;
        settle().await;

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(e, TimerEvent::Cancelled { .. })));
        assert!(!events.iter().any(|e| matches!(e, TimerEvent::Expired { .. })));
        assert!(!events.iter().any(|e| matches!(e, TimerEvent::Warning { .. })));
        assert_eq!(device.remaining_secs(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn extend_realigns_the_cadence() {
        let device = device(5, None, Some(3));
        let mut rx = device.subscribe();

        device.start();
        settle().await;
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(device.remaining_secs(), 3);
        drain(&mut rx);

        // Extend half way between ticks: the next tick lands a full second
        // after the extend, not at the old cadence mark.
        tokio::time::advance(Duration::from_millis(500)).await;
        settle().await;
        device.extend();
        settle().await;
        assert_eq!(device.remaining_secs(), 3);

        tokio::time::advance(Duration::from_millis(999)).await;
        settle().await;
        assert!(drain(&mut rx).is_empty());

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        let events = drain(&mut rx);
        assert!(matches!(events[0], TimerEvent::Progress { seconds: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_keeps_a_single_cadence() {
        let device = device(10, None, None);
        let mut rx = device.subscribe();

        device.start();
        settle().await;
        device.start();
        settle().await;

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;

        let events = drain(&mut rx);
        let progress = events
            .iter()
            .filter(|e| matches!(e, TimerEvent::Progress { .. }))
            .count();
        assert_eq!(progress, 2);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, TimerEvent::Started { .. }))
                .count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn finish_forces_completion_early() {
        let device = device(30, None, None);
        let mut rx = device.subscribe();

        device.start();
        settle().await;
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        device.finish();
        settle().await;

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(e, TimerEvent::Expired { .. })));
        assert!(!device.is_running());

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_a_running_device() {
        let device = device(60, None, None);
        let mut rx = device.subscribe();

        device.start();
        settle().await;
        device.shutdown();
        settle().await;

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(e, TimerEvent::Cancelled { .. })));
        assert!(!device.is_running());
    }
}
