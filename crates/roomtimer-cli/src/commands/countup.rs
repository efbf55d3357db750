use std::time::Duration;

use clap::Args;
use roomtimer_core::{CountupDevice, CountupProperties, TimerEvent};
use tokio::sync::broadcast::error::RecvError;

#[derive(Args)]
pub struct CountupArgs {
    /// Stop automatically after this many seconds
    #[arg(long, default_value_t = 5)]
    pub run_for: u64,
}

pub async fn run(args: CountupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let device = CountupDevice::new("cli", CountupProperties::default());
    let mut events = device.subscribe();

    device.start();
    // Margin past the span so the final tick lands before the stop command.
    tokio::time::sleep(Duration::from_millis(args.run_for * 1000 + 200)).await;
    device.stop();

    loop {
        match events.recv().await {
            Ok(event) => {
                println!("{}", serde_json::to_string(&event)?);
                if matches!(event, TimerEvent::Stopped { .. }) {
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
