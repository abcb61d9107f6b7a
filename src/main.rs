mod config;
mod models;
mod station;
mod telemetry;
mod utils;

use log::{error, info};

use config::StationConfig;
use station::device::{HidConsole, PRODUCT_ID, REPORT_CAPACITY, VENDOR_ID};
use station::engine::StationEngine;
use telemetry::sink::{AlertNotifier, HttpFeedSink, LogNotifier, WebhookNotifier};

/// Read raw reports and feed them to the engine, one at a time. The next
/// read is armed only after the current report is fully processed, so the
/// engine never sees overlapping fragments.
async fn read_loop(
    console: &mut HidConsole,
    engine: &mut StationEngine<HttpFeedSink, Box<dyn AlertNotifier>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut buf = [0u8; REPORT_CAPACITY];
    loop {
        let n = console.read_report(&mut buf).await?;
        if n == 0 {
            return Err("Weather station stopped sending reports".into());
        }
        engine.handle_report(&buf[..n]);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match StationConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    info!("Opening weather station console at {}", config.device_path);
    let mut console = match HidConsole::open(&config.device_path).await {
        Ok(console) => console,
        Err(e) => {
            error!(
                "No valid weather station could be found at {} (expected {:04x}:{:04x}): {}",
                config.device_path, VENDOR_ID, PRODUCT_ID, e
            );
            return Err(e.into());
        }
    };
    console.send_init().await?;

    let sink = HttpFeedSink::new(config.feed_url.clone(), config.feed_api_key.clone());
    let notifier: Box<dyn AlertNotifier> = match &config.alert_webhook_url {
        Some(url) => {
            info!("Sending alerts to webhook on channel '{}'", config.alert_channel);
            Box::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            info!("No alert webhook configured, alerts go to the log");
            Box::new(LogNotifier)
        }
    };
    let mut engine = StationEngine::new(sink, notifier, config.alert_channel.clone());

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        let _ = tx.send(());
    });

    // Run the read loop or wait for the shutdown signal
    tokio::select! {
        result = read_loop(&mut console, &mut engine) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    info!(
        "Session ended with {} checksum failures",
        engine.checksum_failures()
    );

    Ok(())
}
