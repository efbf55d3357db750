mod countdown;
mod countup;
mod ticker;

pub use countdown::CountdownTimer;
pub use countup::CountupTimer;
pub use ticker::{TickFlow, TickScheduler};

use serde::{Deserialize, Serialize};

/// Observable engine state.
///
/// Completion and cancellation re-arm the engine inside the command handler,
/// so only these two states persist between commands; the terminal outcomes
/// surface as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
}

/// Formats a second count as `HH:MM:SS`. The hour field widens past two
/// digits rather than wrapping.
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
