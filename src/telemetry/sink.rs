/// Outbound delivery to the telemetry feed and the alert webhook
use log::{debug, error, warn};
use std::collections::HashMap;

/// Receives one composite snapshot per aggregation window.
///
/// Delivery is fire-and-forget: implementations must not block the engine
/// and never retry. Failures are their own problem to log.
pub trait TelemetrySink {
    fn publish(&self, snapshot: &HashMap<String, f64>);
}

/// Receives free-text alerts on a named channel.
pub trait AlertNotifier {
    fn notify(&self, channel: &str, message: &str);
}

impl AlertNotifier for Box<dyn AlertNotifier> {
    fn notify(&self, channel: &str, message: &str) {
        (**self).notify(channel, message);
    }
}

/// HTTP PUT of each snapshot to a datastream feed.
///
/// The body follows the classic datastream format:
/// `{"version":"1.0.0","datastreams":[{"id":...,"current_value":...}]}`
/// with the API key in the X-ApiKey header.
pub struct HttpFeedSink {
    client: reqwest::Client,
    feed_url: String,
    api_key: String,
}

impl HttpFeedSink {
    pub fn new(feed_url: String, api_key: String) -> Self {
        HttpFeedSink {
            client: reqwest::Client::new(),
            feed_url,
            api_key,
        }
    }
}

impl TelemetrySink for HttpFeedSink {
    fn publish(&self, snapshot: &HashMap<String, f64>) {
        // Snapshot mapping to array, as the feed prefers it.
        let datastreams: Vec<serde_json::Value> = snapshot
            .iter()
            .map(|(id, value)| serde_json::json!({ "id": id, "current_value": value }))
            .collect();
        let body = serde_json::json!({
            "version": "1.0.0",
            "datastreams": datastreams,
        });

        let client = self.client.clone();
        let url = self.feed_url.clone();
        let api_key = self.api_key.clone();
        let count = snapshot.len();
        tokio::spawn(async move {
            match client
                .put(&url)
                .header("X-ApiKey", api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!("Feed accepted {} datastreams", count);
                }
                Ok(response) => {
                    error!("Feed status code: {}", response.status());
                }
                Err(e) => {
                    error!("Feed error: {}", e);
                }
            }
        });
    }
}

/// HTTP POST of alert messages to a chat webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> Self {
        WebhookNotifier {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

impl AlertNotifier for WebhookNotifier {
    fn notify(&self, channel: &str, message: &str) {
        let body = serde_json::json!({
            "channel": channel,
            "text": message,
        });

        let client = self.client.clone();
        let url = self.webhook_url.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Webhook accepted alert");
                }
                Ok(response) => {
                    error!("Webhook status code: {}", response.status());
                }
                Err(e) => {
                    error!("Webhook error: {}", e);
                }
            }
        });
    }
}

/// Fallback notifier when no webhook is configured: alerts only reach the
/// log.
pub struct LogNotifier;

impl AlertNotifier for LogNotifier {
    fn notify(&self, channel: &str, message: &str) {
        warn!("[{}] {}", channel, message);
    }
}
