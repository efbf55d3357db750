use std::path::PathBuf;

use clap::Args;
use roomtimer_core::{Config, DeviceConfig};

#[derive(Args)]
pub struct CheckArgs {
    /// Configuration file path (defaults to the user config location)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = args
        .config
        .or_else(Config::default_path)
        .ok_or("no configuration path available")?;
    let config = Config::load(&path)?;

    for (key, device) in &config.devices {
        match device {
            DeviceConfig::Countdown(props) => {
                let warning = props
                    .warning_time
                    .map_or("none".to_string(), |w| format!("{w}s"));
                let extend = props
                    .extend_time
                    .map_or("none".to_string(), |e| format!("{e}s"));
                println!(
                    "{key}: countdown length={}s warning={warning} extend={extend} pulse={}ms",
                    props.countdown_time, props.pulse_ms
                );
            }
            DeviceConfig::Countup(props) => {
                println!(
                    "{key}: countup auto_stop_on_start_release={} reset_clears_elapsed={}",
                    props.auto_stop_on_start_release, props.reset_clears_elapsed
                );
            }
        }
    }
    println!("{} device(s) OK", config.devices.len());
    Ok(())
}
