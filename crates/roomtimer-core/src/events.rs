use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every observable engine transition produces a `TimerEvent`.
///
/// One closed set covers both engine kinds. Events are pushed to
/// subscribers over a per-device broadcast channel; the boundary publisher
/// renders them into level and pulse signals for the control surface.
/// `Progress` carries the remaining count for countdowns and the elapsed
/// count for count-ups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimerEvent {
    /// A run began. Countdown runs carry the projected finish instant.
    Started {
        finish_time: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    /// Per-tick sample. `percent` is only derived for countdowns.
    Progress {
        seconds: u64,
        percent: Option<u16>,
        text: String,
        at: DateTime<Utc>,
    },
    /// One-shot edge: the remaining count first reached the warning
    /// threshold. Fires at most once per run.
    Warning { at: DateTime<Utc> },
    /// One-shot edge: the countdown completed, naturally or forced.
    Expired { at: DateTime<Utc> },
    /// A countdown run was cancelled before completion.
    Cancelled { at: DateTime<Utc> },
    /// A count-up stopped; carries the formatted final elapsed time.
    Stopped { elapsed: String, at: DateTime<Utc> },
}
