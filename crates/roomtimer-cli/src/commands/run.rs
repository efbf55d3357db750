use std::path::PathBuf;

use clap::Args;
use roomtimer_core::{Config, DeviceRegistry, FeedbackPublisher};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Args)]
pub struct RunArgs {
    /// Configuration file path (defaults to the user config location)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Start every configured device immediately
    #[arg(long)]
    pub autostart: bool,
}

/// Headless runner: builds every configured device, streams their events
/// and feedback as JSON lines, and shuts everything down on Ctrl-C.
pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = args
        .config
        .or_else(Config::default_path)
        .ok_or("no configuration path available")?;
    let config = Config::load(&path)?;
    let registry = DeviceRegistry::from_config(&config)?;
    if registry.is_empty() {
        return Err("configuration declares no devices".into());
    }

    let mut tasks = Vec::new();
    let mut publishers = Vec::new();
    for (key, device) in registry.iter() {
        let mut events = device.subscribe();
        let event_key = key.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let line = serde_json::json!({ "device": &event_key, "event": &event });
                        println!("{line}");
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(key = %event_key, missed, "event printer lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));

        let publisher = FeedbackPublisher::spawn(device.subscribe(), device.pulse_width());
        let mut feedback = publisher.subscribe();
        let feedback_key = key.clone();
        tasks.push(tokio::spawn(async move {
            while feedback.changed().await.is_ok() {
                let state = feedback.borrow_and_update().clone();
                let line = serde_json::json!({ "device": &feedback_key, "feedback": &state });
                println!("{line}");
            }
        }));
        publishers.push(publisher);
    }

    if args.autostart {
        for (_, device) in registry.iter() {
            device.start();
        }
    }

    info!(devices = registry.len(), "running until Ctrl-C");
    tokio::signal::ctrl_c().await?;

    info!("shutting down timer devices");
    registry.shutdown_all();
    for publisher in &publishers {
        publisher.shutdown();
    }
    for task in tasks {
        task.abort();
    }
    Ok(())
}
