//! Live timer devices.
//!
//! A device wraps one pure engine behind a lock, drives it from its own
//! `TickScheduler`, and pushes the resulting events to subscribers over a
//! broadcast channel. Commands are fire-and-forget: they apply the state
//! transition, adjust the cadence, and return without blocking on
//! notification delivery. Devices are fully independent of each other.

mod countdown;
mod countup;
mod feedback;
mod registry;

pub use countdown::CountdownDevice;
pub use countup::CountupDevice;
pub use feedback::{FeedbackPublisher, FeedbackState, DEFAULT_PULSE_WIDTH};
pub use registry::{Device, DeviceRegistry};

use std::time::Duration;

/// Both engine kinds tick at 1 Hz.
pub(crate) const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Buffered events per device before slow subscribers start lagging.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;
