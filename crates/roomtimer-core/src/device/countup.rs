//! Live count-up device.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{error, info};

use super::{EVENT_CHANNEL_CAPACITY, TICK_PERIOD};
use crate::config::CountupProperties;
use crate::error::SchedulerError;
use crate::events::TimerEvent;
use crate::timer::{CountupTimer, TickFlow, TickScheduler};

/// A count-up engine wired to its own tick cadence and event stream.
#[derive(Debug)]
pub struct CountupDevice {
    key: String,
    timer: Arc<Mutex<CountupTimer>>,
    scheduler: Mutex<TickScheduler>,
    events: broadcast::Sender<TimerEvent>,
    auto_stop_on_start_release: bool,
}

impl CountupDevice {
    pub fn new(key: &str, props: CountupProperties) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            key: key.to_string(),
            timer: Arc::new(Mutex::new(CountupTimer::new(&props))),
            scheduler: Mutex::new(TickScheduler::new()),
            events,
            auto_stop_on_start_release: props.auto_stop_on_start_release,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_running(&self) -> bool {
        self.with_timer(|t| t.is_running()).unwrap_or(false)
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.with_timer(|t| t.elapsed_secs()).unwrap_or(0)
    }

    /// Subscribe to this device's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin counting and arm the 1 Hz cadence. No-op while running.
    pub fn start(&self) {
        let Some(Some(started)) = self.with_timer(CountupTimer::start) else {
            return;
        };
        if let Err(err) = self.arm_cadence() {
            error!(key = %self.key, "failed to arm tick cadence: {err}");
            if let Some(Some(stopped)) = self.with_timer(CountupTimer::stop) {
                self.emit(stopped);
            }
            return;
        }
        info!(key = %self.key, "count-up started");
        self.emit(started);
    }

    /// Stop counting and report the final elapsed time. No-op while idle.
    pub fn stop(&self) {
        let Some(Some(stopped)) = self.with_timer(CountupTimer::stop) else {
            return;
        };
        self.stop_cadence();
        info!(key = %self.key, "count-up stopped");
        self.emit(stopped);
    }

    /// Realign the tick cadence after an external resync. Keeps the elapsed
    /// count (unless the clear-on-reset variant was configured) and the
    /// running state.
    pub fn reset(&self) {
        let Some(still_running) = self.with_timer(|timer| {
            timer.reset();
            timer.is_running()
        }) else {
            return;
        };
        if still_running {
            if let Err(err) = self.arm_cadence() {
                error!(key = %self.key, "failed to realign tick cadence: {err}");
                if let Some(Some(stopped)) = self.with_timer(CountupTimer::stop) {
                    self.emit(stopped);
                }
            }
        }
    }

    /// Momentary start-control edge from the boundary protocol. The rising
    /// edge starts counting; the falling edge stops it when
    /// `auto_stop_on_start_release` is configured.
    pub fn start_signal(&self, pressed: bool) {
        if pressed {
            self.start();
        } else if self.auto_stop_on_start_release {
            self.stop();
        }
    }

    /// Stop any active count and release the tick task. The device stays
    /// usable; the next `start` re-arms.
    pub fn shutdown(&self) {
        self.stop();
        self.stop_cadence();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn with_timer<R>(&self, f: impl FnOnce(&mut CountupTimer) -> R) -> Option<R> {
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
        let callback = move || match timer.lock() {
            Ok(mut timer) => {
                if let Some(event) = timer.tick() {
                    let _ = events.send(event);
                }
                TickFlow::Continue
            }
            Err(err) => {
                error!(key = %key, "timer state lock poisoned: {err}");
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
    use std::time::Duration;
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

    #[tokio::test(start_paused = true)]
    async fn counts_up_and_reports_on_stop() {
        let device = CountupDevice::new("test", CountupProperties::default());
        let mut rx = device.subscribe();

        device.start();
        settle().await;
        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        device.stop();
        settle().await;

        let events = drain(&mut rx);
        assert!(matches!(events[0], TimerEvent::Started { finish_time: None, .. }));
        let progress: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TimerEvent::Progress { seconds, percent, .. } => {
                    assert_eq!(*percent, None);
                    Some(*seconds)
                }
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2, 3, 4, 5]);
        match events.last().unwrap() {
            TimerEvent::Stopped { elapsed, .. } => assert_eq!(elapsed, "00:00:05"),
            other => panic!("expected Stopped, got {other:?}"),
        }
        assert_eq!(device.elapsed_secs(), 0);
        assert!(!device.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_the_cadence() {
        let device = CountupDevice::new("test", CountupProperties::default());
        let mut rx = device.subscribe();

        device.start();
        settle().await;
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        device.stop();
        settle().await;
        drain(&mut rx);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn release_stops_when_auto_stop_configured() {
        let props = CountupProperties {
            auto_stop_on_start_release: true,
            reset_clears_elapsed: false,
        };
        let device = CountupDevice::new("test", props);
        let mut rx = device.subscribe();

        device.start_signal(true);
        settle().await;
        tokio::time::advance(Duration::from_secs(3)).await;
        settle().await;
        device.start_signal(false);
        settle().await;

        let events = drain(&mut rx);
        match events.last().unwrap() {
            TimerEvent::Stopped { elapsed, .. } => assert_eq!(elapsed, "00:00:03"),
            other => panic!("expected Stopped, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn release_is_ignored_without_auto_stop() {
        let device = CountupDevice::new("test", CountupProperties::default());

        device.start_signal(true);
        settle().await;
        tokio::time::advance(Duration::from_secs(3)).await;
        settle().await;
        device.start_signal(false);
        settle().await;

        assert!(device.is_running());
        assert_eq!(device.elapsed_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_realigns_without_clearing() {
        let device = CountupDevice::new("test", CountupProperties::default());
        let mut rx = device.subscribe();

        device.start();
        settle().await;
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        drain(&mut rx);

        tokio::time::advance(Duration::from_millis(600)).await;
        settle().await;
        device.reset();
        settle().await;
        assert_eq!(device.elapsed_secs(), 2);
        assert!(device.is_running());

        // Next tick lands a full second after the reset.
        tokio::time::advance(Duration::from_millis(999)).await;
        settle().await;
        assert!(drain(&mut rx).is_empty());
        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        let events = drain(&mut rx);
        assert!(matches!(events[0], TimerEvent::Progress { seconds: 3, .. }));
    }
}
