/// Per-minute accumulation of decoded measurements
use std::collections::HashMap;

use crate::models::SensorReading;

/// How a measurement combines with an earlier value in the same window.
enum MergePolicy {
    /// Peak values: the window reports the strongest gust, not the latest.
    Max,
    /// Wind chill: the window reports the coldest value.
    Min,
    /// Everything else: the freshest value wins.
    LastWrite,
}

fn merge_policy(name: &str) -> MergePolicy {
    match name {
        "rainRate" | "windGust" | "windAverage" => MergePolicy::Max,
        "windChill" => MergePolicy::Min,
        _ => MergePolicy::LastWrite,
    }
}

/// Rolling composite snapshot of the current aggregation window.
///
/// The window boundary is the station's own once-per-minute status frame;
/// there is no internal timer. Measurements never seen within a window stay
/// absent from the flushed snapshot rather than defaulting to zero.
pub struct MinuteAggregator {
    snapshot: HashMap<String, f64>,
}

impl MinuteAggregator {
    pub fn new() -> Self {
        MinuteAggregator {
            snapshot: HashMap::new(),
        }
    }

    /// Merge all measurements of one reading into the current window.
    pub fn merge(&mut self, reading: &SensorReading) {
        for (name, value) in reading.measurements() {
            self.merge_value(name, value);
        }
    }

    fn merge_value(&mut self, name: String, value: f64) {
        match merge_policy(&name) {
            MergePolicy::Max => {
                let slot = self.snapshot.entry(name).or_insert(0.0);
                if value > *slot {
                    *slot = value;
                }
            }
            MergePolicy::Min => {
                let slot = self.snapshot.entry(name).or_insert(0.0);
                if value < *slot {
                    *slot = value;
                }
            }
            MergePolicy::LastWrite => {
                self.snapshot.insert(name, value);
            }
        }
    }

    /// Hand out the completed window and start a fresh, empty one.
    pub fn flush(&mut self) -> HashMap<String, f64> {
        std::mem::take(&mut self.snapshot)
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TempHumidityReading, WindReading};

    fn wind(gust: f64, average: f64, chill: Option<f64>) -> SensorReading {
        SensorReading::Wind(WindReading {
            gust,
            average,
            direction: 90.0,
            chill,
        })
    }

    #[test]
    fn gust_keeps_window_maximum() {
        let mut agg = MinuteAggregator::new();
        agg.merge(&wind(3.2, 1.0, None));
        agg.merge(&wind(2.1, 1.5, None));
        let snapshot = agg.flush();
        assert_eq!(snapshot["windGust"], 3.2);
        assert_eq!(snapshot["windAverage"], 1.5);
    }

    #[test]
    fn chill_keeps_window_minimum() {
        let mut agg = MinuteAggregator::new();
        agg.merge(&wind(0.0, 0.0, Some(-1.0)));
        agg.merge(&wind(0.0, 0.0, Some(-3.0)));
        agg.merge(&wind(0.0, 0.0, Some(-2.0)));
        assert_eq!(agg.flush()["windChill"], -3.0);
    }

    #[test]
    fn last_write_wins_for_plain_measurements() {
        let mut agg = MinuteAggregator::new();
        for temp in [18.2, 18.4, 18.3] {
            agg.merge(&SensorReading::TempHumidity(TempHumidityReading {
                sensor: 1,
                temperature: temp,
                humidity: 60,
                dewpoint: Some(10.0),
            }));
        }
        let snapshot = agg.flush();
        assert_eq!(snapshot["outdoorTemp"], 18.3);
        assert_eq!(snapshot["outdoorHumidity"], 60.0);
        assert_eq!(snapshot["dewpoint"], 10.0);
    }

    #[test]
    fn flush_clears_the_window() {
        let mut agg = MinuteAggregator::new();
        agg.merge(&wind(1.0, 1.0, None));
        assert!(!agg.is_empty());
        let snapshot = agg.flush();
        assert!(!snapshot.is_empty());
        assert!(agg.is_empty());
        assert!(agg.flush().is_empty());
    }

    #[test]
    fn unwritten_measurements_stay_absent() {
        let mut agg = MinuteAggregator::new();
        agg.merge(&wind(1.0, 1.0, None));
        let snapshot = agg.flush();
        assert!(!snapshot.contains_key("windChill"));
        assert!(!snapshot.contains_key("rainRate"));
    }
}
