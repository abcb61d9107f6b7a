/// Low-battery tracking and rate-limited alerting
use log::{debug, info};
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};

use crate::models::BatteryLevel;
use crate::telemetry::sink::AlertNotifier;

/// At most one alert per device within this span. Battery state changes
/// slowly; anything chattier just drowns the channel.
const ALERT_INTERVAL: Duration = Duration::hours(24);

/// Last known battery level and last alert time per sending unit.
///
/// Every validated frame carries the flags byte of the unit that sent it,
/// so the monitor sees each device about once per minute.
pub struct BatteryMonitor {
    levels: HashMap<String, BatteryLevel>,
    last_alert: HashMap<String, OffsetDateTime>,
}

impl BatteryMonitor {
    pub fn new() -> Self {
        BatteryMonitor {
            levels: HashMap::new(),
            last_alert: HashMap::new(),
        }
    }

    /// Record the level from one frame's flags byte and alert on "low",
    /// unless the device already alerted within the last 24 hours.
    pub fn observe<N: AlertNotifier>(
        &mut self,
        flags: u8,
        device: &str,
        now: OffsetDateTime,
        channel: &str,
        notifier: &N,
    ) {
        let level = BatteryLevel::from_flags(flags);
        let previous = self.levels.insert(device.to_string(), level);

        if level != BatteryLevel::Low {
            return;
        }
        if previous != Some(BatteryLevel::Low) {
            info!("Battery level {} on {}", level.as_str(), device);
        }

        let due = match self.last_alert.get(device) {
            None => true,
            Some(last) => now - *last >= ALERT_INTERVAL,
        };
        if due {
            notifier.notify(channel, &format!("Replace batteries in the {}", device));
            self.last_alert.insert(device.to_string(), now);
        } else {
            debug!("Suppressing repeat battery alert for {}", device);
        }
    }

    /// Last level reported by a device, if it has been heard from.
    pub fn level(&self, device: &str) -> Option<BatteryLevel> {
        self.levels.get(device).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use time::macros::datetime;

    #[derive(Default)]
    struct RecordingNotifier {
        alerts: Mutex<Vec<(String, String)>>,
    }

    impl AlertNotifier for RecordingNotifier {
        fn notify(&self, channel: &str, message: &str) {
            self.alerts
                .lock()
                .unwrap()
                .push((channel.to_string(), message.to_string()));
        }
    }

    #[test]
    fn high_level_never_alerts() {
        let mut monitor = BatteryMonitor::new();
        let notifier = RecordingNotifier::default();
        let now = datetime!(2026-08-23 10:00 UTC);
        monitor.observe(0x00, "anemometer", now, "weather-alerts", &notifier);
        assert!(notifier.alerts.lock().unwrap().is_empty());
        assert_eq!(monitor.level("anemometer"), Some(BatteryLevel::High));
    }

    #[test]
    fn repeat_low_within_a_day_alerts_once() {
        let mut monitor = BatteryMonitor::new();
        let notifier = RecordingNotifier::default();
        let start = datetime!(2026-08-23 10:00 UTC);
        monitor.observe(0x40, "rain gauge", start, "weather-alerts", &notifier);
        monitor.observe(
            0x40,
            "rain gauge",
            start + Duration::hours(1),
            "weather-alerts",
            &notifier,
        );
        let alerts = notifier.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].0, "weather-alerts");
        assert!(alerts[0].1.contains("rain gauge"));
    }

    #[test]
    fn low_again_after_a_day_alerts_again() {
        let mut monitor = BatteryMonitor::new();
        let notifier = RecordingNotifier::default();
        let start = datetime!(2026-08-23 10:00 UTC);
        monitor.observe(0x40, "rain gauge", start, "weather-alerts", &notifier);
        monitor.observe(
            0x40,
            "rain gauge",
            start + Duration::hours(25),
            "weather-alerts",
            &notifier,
        );
        assert_eq!(notifier.alerts.lock().unwrap().len(), 2);
    }

    #[test]
    fn rate_limit_is_per_device() {
        let mut monitor = BatteryMonitor::new();
        let notifier = RecordingNotifier::default();
        let now = datetime!(2026-08-23 10:00 UTC);
        monitor.observe(0x40, "rain gauge", now, "weather-alerts", &notifier);
        monitor.observe(0x40, "anemometer", now, "weather-alerts", &notifier);
        assert_eq!(notifier.alerts.lock().unwrap().len(), 2);
    }

    #[test]
    fn recovery_does_not_reset_the_rate_limit() {
        let mut monitor = BatteryMonitor::new();
        let notifier = RecordingNotifier::default();
        let start = datetime!(2026-08-23 10:00 UTC);
        monitor.observe(0x40, "uv sensor", start, "weather-alerts", &notifier);
        monitor.observe(0x00, "uv sensor", start + Duration::hours(2), "weather-alerts", &notifier);
        monitor.observe(0x40, "uv sensor", start + Duration::hours(4), "weather-alerts", &notifier);
        assert_eq!(notifier.alerts.lock().unwrap().len(), 1);
    }
}
