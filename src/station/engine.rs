/// The per-session decoding engine: one instance owns all mutable state
use log::{debug, info, warn};
use time::OffsetDateTime;

use crate::models::SensorReading;
use crate::station::assembler::FrameAssembler;
use crate::station::decoder::decode_frame;
use crate::telemetry::aggregator::MinuteAggregator;
use crate::telemetry::battery::BatteryMonitor;
use crate::telemetry::sink::{AlertNotifier, TelemetrySink};
use crate::utils::format_station_time;

/// Readings beyond this are sensor glitches, not weather.
const PLAUSIBLE_TEMP_LIMIT: f64 = 100.0;

/// Drives one device session: raw HID reports in, snapshot flushes and
/// alerts out.
///
/// Each report is processed to completion before the caller reads the next
/// one, so a single engine instance needs no locking. Outbound deliveries
/// are fire-and-forget through the sink and notifier.
pub struct StationEngine<S: TelemetrySink, N: AlertNotifier> {
    assembler: FrameAssembler,
    aggregator: MinuteAggregator,
    battery: BatteryMonitor,
    sink: S,
    notifier: N,
    alert_channel: String,
}

impl<S: TelemetrySink, N: AlertNotifier> StationEngine<S, N> {
    pub fn new(sink: S, notifier: N, alert_channel: String) -> Self {
        StationEngine {
            assembler: FrameAssembler::new(),
            aggregator: MinuteAggregator::new(),
            battery: BatteryMonitor::new(),
            sink,
            notifier,
            alert_channel,
        }
    }

    /// Handle one raw HID report and every side effect it triggers.
    pub fn handle_report(&mut self, data: &[u8]) {
        let Some(frame) = self.assembler.handle_report(data) else {
            return;
        };
        self.handle_frame(&frame, OffsetDateTime::now_utc());
    }

    fn handle_frame(&mut self, frame: &[u8], now: OffsetDateTime) {
        let flags = frame[0];
        let reading = match decode_frame(frame) {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Dropping undecodable frame: {}", e);
                return;
            }
        };
        debug!("Decoded reading: {:?}", reading);

        self.battery.observe(
            flags,
            &reading.device_label(),
            now,
            &self.alert_channel,
            &self.notifier,
        );

        if let SensorReading::TempHumidity(t) = &reading {
            if t.temperature.abs() > PLAUSIBLE_TEMP_LIMIT {
                // Alert but keep the frame; the reading still counts.
                self.notifier.notify(
                    &self.alert_channel,
                    &format!(
                        "Implausible temperature {:.1} from {}",
                        t.temperature,
                        reading.device_label()
                    ),
                );
            }
        }

        match &reading {
            SensorReading::Status(status) => {
                if let Some(clock) = &status.internal_clock {
                    debug!(
                        "Station status: clock {}, powered {}, radio sync {}, radio signal {}, battery {}",
                        format_station_time(clock),
                        status.powered,
                        status.radio_sync,
                        if status.radio_signal_low { "low" } else { "high" },
                        self.battery
                            .level(&reading.device_label())
                            .map(|level| level.as_str())
                            .unwrap_or("unknown")
                    );
                }
                self.flush_window();
            }
            other => {
                self.log_detail(other);
                self.aggregator.merge(other);
            }
        }
    }

    /// Decoded detail that is worth a log line but has no numeric place in
    /// the snapshot.
    fn log_detail(&self, reading: &SensorReading) {
        match reading {
            SensorReading::Rain(r) => {
                if let Some(since) = &r.total_since {
                    debug!("Rain totals accumulated since {}", format_station_time(since));
                }
            }
            SensorReading::Pressure(p) => {
                debug!(
                    "Forecast: {} (relative pressure {})",
                    p.forecast, p.relative
                );
            }
            _ => {}
        }
    }

    /// The status frame is the minute boundary: deliver the window and
    /// start a new one.
    fn flush_window(&mut self) {
        if self.aggregator.is_empty() {
            warn!("No measurements collected during this interval");
            return;
        }
        let snapshot = self.aggregator.flush();
        info!("Publishing {} measurements", snapshot.len());
        for (name, value) in &snapshot {
            debug!("  {} = {}", name, value);
        }
        self.sink.publish(&snapshot);
    }

    /// Checksum mismatches seen on this session, for diagnostics.
    pub fn checksum_failures(&self) -> u64 {
        self.assembler.checksum_failures()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingSink {
        published: Arc<Mutex<Vec<HashMap<String, f64>>>>,
    }

    impl TelemetrySink for RecordingSink {
        fn publish(&self, snapshot: &HashMap<String, f64>) {
            self.published.lock().unwrap().push(snapshot.clone());
        }
    }

    #[derive(Default, Clone)]
    struct RecordingNotifier {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl AlertNotifier for RecordingNotifier {
        fn notify(&self, _channel: &str, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    fn engine() -> (
        StationEngine<RecordingSink, RecordingNotifier>,
        RecordingSink,
        RecordingNotifier,
    ) {
        let sink = RecordingSink::default();
        let notifier = RecordingNotifier::default();
        let engine = StationEngine::new(
            sink.clone(),
            notifier.clone(),
            "weather-alerts".to_string(),
        );
        (engine, sink, notifier)
    }

    fn checksummed(body: &[u8]) -> Vec<u8> {
        let sum = body.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
        let mut frame = body.to_vec();
        frame.extend_from_slice(&sum.to_le_bytes());
        frame
    }

    /// Deliver a frame the way the device does: sync sequence first, then
    /// one byte per report.
    fn feed_frame(engine: &mut StationEngine<RecordingSink, RecordingNotifier>, frame: &[u8]) {
        engine.handle_report(&[1, 0xFF]);
        engine.handle_report(&[1, 0xFF]);
        for &b in frame {
            engine.handle_report(&[1, b]);
        }
    }

    fn outdoor_temp_frame(flags: u8, temp_tenths: u16) -> Vec<u8> {
        checksummed(&[
            flags,
            0x42,
            0x01,
            (temp_tenths & 0xff) as u8,
            (temp_tenths >> 8) as u8,
            55,
            80,
            0x00,
            0x00,
            0x00,
        ])
    }

    fn status_frame() -> Vec<u8> {
        checksummed(&[0x00, 0x60, 0x00, 0x00, 30, 12, 24, 8, 26, 0x00])
    }

    #[test]
    fn status_flush_delivers_last_readings_then_clears() {
        let (mut engine, sink, _) = engine();
        feed_frame(&mut engine, &outdoor_temp_frame(0x00, 181));
        feed_frame(&mut engine, &outdoor_temp_frame(0x00, 184));
        feed_frame(&mut engine, &status_frame());

        let published = sink.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        let snapshot = &published[0];
        assert_eq!(snapshot["outdoorTemp"], 18.4);
        assert_eq!(snapshot["outdoorHumidity"], 55.0);
        assert_eq!(snapshot["dewpoint"], 8.0);
        drop(published);

        // Next window starts empty: a lone status frame publishes nothing.
        feed_frame(&mut engine, &status_frame());
        assert_eq!(sink.published.lock().unwrap().len(), 1);
    }

    #[test]
    fn corrupted_frame_leaves_snapshot_unchanged() {
        let (mut engine, sink, _) = engine();
        let mut bad = outdoor_temp_frame(0x00, 181);
        bad[3] ^= 0x01; // body changed, trailer stale
        feed_frame(&mut engine, &bad);
        feed_frame(&mut engine, &status_frame());

        assert!(sink.published.lock().unwrap().is_empty());
        assert_eq!(engine.checksum_failures(), 1);
    }

    #[test]
    fn low_battery_frames_alert_once() {
        let (mut engine, _, notifier) = engine();
        feed_frame(&mut engine, &outdoor_temp_frame(0x40, 181));
        feed_frame(&mut engine, &outdoor_temp_frame(0x40, 182));

        let messages = notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("thermo-hygro sensor 1"));
    }

    #[test]
    fn implausible_temperature_alerts_but_still_merges() {
        let (mut engine, sink, notifier) = engine();
        // 120.5 degrees: bit-packed as high nibble 4, low byte 0xb5
        feed_frame(&mut engine, &outdoor_temp_frame(0x00, 1205));
        feed_frame(&mut engine, &status_frame());

        let messages = notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Implausible temperature"));

        let published = sink.published.lock().unwrap();
        assert_eq!(published[0]["outdoorTemp"], 120.5);
    }

    #[test]
    fn garbage_between_frames_is_survived() {
        let (mut engine, sink, _) = engine();
        for b in [0x13u8, 0xFF, 0x00, 0x77] {
            engine.handle_report(&[1, b]);
        }
        feed_frame(&mut engine, &outdoor_temp_frame(0x00, 181));
        feed_frame(&mut engine, &status_frame());
        assert_eq!(sink.published.lock().unwrap().len(), 1);
    }
}
