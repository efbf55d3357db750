//! # roomtimer Core Library
//!
//! Timing primitives for control-system automation: a countdown engine that
//! decrements toward zero and a count-up engine that increments from zero,
//! each exposing discrete lifecycle events, periodic progress samples, and
//! threshold-triggered pulses.
//!
//! ## Architecture
//!
//! - **Engines**: pure state machines (`CountdownTimer`, `CountupTimer`)
//!   with no thread or clock of their own
//! - **Devices**: async wrappers that serialize command/tick access behind
//!   one lock, drive a 1 Hz `TickScheduler`, and push `TimerEvent`s to
//!   subscribers over a broadcast channel
//! - **Feedback**: a boundary publisher that renders the event stream into
//!   the level/pulse signal set a control surface consumes
//! - **Config**: TOML device declarations, validated before construction
//!
//! ## Key Components
//!
//! - [`CountdownDevice`] / [`CountupDevice`]: live devices
//! - [`TickScheduler`]: drift-free periodic callback primitive
//! - [`TimerEvent`]: the closed notification set
//! - [`DeviceRegistry`]: builds devices from a [`Config`]

pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod timer;

pub use config::{Config, CountdownProperties, CountupProperties, DeviceConfig};
pub use device::{
    CountdownDevice, CountupDevice, Device, DeviceRegistry, FeedbackPublisher, FeedbackState,
    DEFAULT_PULSE_WIDTH,
};
pub use error::{ConfigError, CoreError, Result, SchedulerError};
pub use events::TimerEvent;
pub use timer::{format_hms, CountdownTimer, CountupTimer, TickFlow, TickScheduler, TimerState};
