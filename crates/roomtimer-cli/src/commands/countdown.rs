use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use roomtimer_core::{CountdownDevice, CountdownProperties, TimerEvent};
use tokio::sync::broadcast::error::RecvError;

#[derive(Args)]
pub struct CountdownArgs {
    /// Countdown length in seconds
    #[arg(long, default_value_t = 10)]
    pub seconds: u64,
    /// Warning threshold in seconds remaining
    #[arg(long)]
    pub warning: Option<u64>,
    /// Extension length in seconds
    #[arg(long)]
    pub extend: Option<u64>,
    /// Issue an extend command after this many seconds
    #[arg(long)]
    pub extend_after: Option<u64>,
}

pub async fn run(args: CountdownArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut props = CountdownProperties::new(args.seconds);
    props.warning_time = args.warning;
    props.extend_time = args.extend;

    let device = Arc::new(CountdownDevice::new("cli", props)?);
    let mut events = device.subscribe();
    device.start();

    if let Some(delay) = args.extend_after {
        let extender = Arc::clone(&device);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay)).await;
            extender.extend();
        });
    }

    loop {
        match events.recv().await {
            Ok(event) => {
                println!("{}", serde_json::to_string(&event)?);
                if matches!(event, TimerEvent::Expired { .. } | TimerEvent::Cancelled { .. }) {
                    break;
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
    device.shutdown();
    Ok(())
}
