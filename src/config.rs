use std::env;
use url::Url;

#[derive(Debug, Clone)]
pub struct StationConfig {
    /// hidraw node of the console.
    pub device_path: String,
    /// Datastream feed endpoint, one PUT per minute.
    pub feed_url: String,
    pub feed_api_key: String,
    /// Chat webhook for alerts; alerts stay in the log when unset.
    pub alert_webhook_url: Option<String>,
    pub alert_channel: String,
}

impl StationConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let device_path =
            env::var("WSTATION_DEVICE").unwrap_or_else(|_| "/dev/hidraw0".to_string());

        let feed_url =
            env::var("FEED_URL").map_err(|_| "FEED_URL environment variable not set")?;
        Url::parse(&feed_url).map_err(|e| format!("Invalid FEED_URL '{}': {}", feed_url, e))?;

        let feed_api_key =
            env::var("FEED_API_KEY").map_err(|_| "FEED_API_KEY environment variable not set")?;

        let alert_webhook_url = env::var("ALERT_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.is_empty());
        if let Some(url) = &alert_webhook_url {
            Url::parse(url).map_err(|e| format!("Invalid ALERT_WEBHOOK_URL '{}': {}", url, e))?;
        }

        let alert_channel =
            env::var("ALERT_CHANNEL").unwrap_or_else(|_| "weather-alerts".to_string());

        Ok(StationConfig {
            device_path,
            feed_url,
            feed_api_key,
            alert_webhook_url,
            alert_channel,
        })
    }
}
