use time::PrimitiveDateTime;

/// Battery state reported in the flags byte of every frame.
///
/// Bit 0x40 set means the sending unit wants fresh batteries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryLevel {
    Low,
    High,
}

impl BatteryLevel {
    pub fn from_flags(flags: u8) -> Self {
        if flags & 0x40 != 0 {
            BatteryLevel::Low
        } else {
            BatteryLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatteryLevel::Low => "low",
            BatteryLevel::High => "high",
        }
    }
}

/// Rainfall, converted from inches to millimeters by the decoder.
#[derive(Debug, Clone)]
pub struct RainReading {
    pub rate: f64,
    pub last_hour: f64,
    pub last_24h: f64,
    pub total: f64,
    pub total_since: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct TempHumidityReading {
    /// 0 = indoor main unit, 1 = outdoor sensor, 2+ = extra remote units.
    pub sensor: u8,
    pub temperature: f64,
    pub humidity: u8,
    /// Only reported for the outdoor sensor.
    pub dewpoint: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PressureReading {
    pub absolute: u16,
    pub relative: u16,
    pub forecast: &'static str,
}

#[derive(Debug, Clone)]
pub struct UvReading {
    pub index: u8,
}

#[derive(Debug, Clone)]
pub struct WindReading {
    pub gust: f64,
    pub average: f64,
    /// Degrees, in 22.5 degree compass sectors.
    pub direction: f64,
    /// Absent when the station sends the 0x20 sentinel.
    pub chill: Option<f64>,
}

/// Once-per-minute housekeeping report from the main unit.
#[derive(Debug, Clone)]
pub struct StatusReading {
    pub internal_clock: Option<PrimitiveDateTime>,
    pub powered: bool,
    pub radio_sync: bool,
    pub radio_signal_low: bool,
}

/// One decoded report, tagged by the sensor that sent it.
#[derive(Debug, Clone)]
pub enum SensorReading {
    Rain(RainReading),
    TempHumidity(TempHumidityReading),
    Pressure(PressureReading),
    Uv(UvReading),
    Wind(WindReading),
    Status(StatusReading),
}

impl SensorReading {
    /// Human-readable label of the physical unit that produced the frame,
    /// used as the key for battery bookkeeping and alert texts.
    pub fn device_label(&self) -> String {
        match self {
            SensorReading::Rain(_) => "rain gauge".to_string(),
            SensorReading::TempHumidity(t) => format!("thermo-hygro sensor {}", t.sensor),
            SensorReading::Pressure(_) => "barometer".to_string(),
            SensorReading::Uv(_) => "uv sensor".to_string(),
            SensorReading::Wind(_) => "anemometer".to_string(),
            SensorReading::Status(_) => "main unit".to_string(),
        }
    }

    /// Named numeric measurements this reading contributes to the current
    /// aggregation window. Status frames carry none; they only mark the
    /// window boundary.
    pub fn measurements(&self) -> Vec<(String, f64)> {
        match self {
            SensorReading::Rain(r) => vec![
                ("rainRate".to_string(), r.rate),
                ("rainLastHour".to_string(), r.last_hour),
                ("rainLast24h".to_string(), r.last_24h),
                ("rainTotal".to_string(), r.total),
            ],
            SensorReading::TempHumidity(t) => {
                let mut m = match t.sensor {
                    1 => vec![
                        ("outdoorTemp".to_string(), t.temperature),
                        ("outdoorHumidity".to_string(), t.humidity as f64),
                    ],
                    0 => vec![
                        ("indoorTemp".to_string(), t.temperature),
                        ("indoorHumidity".to_string(), t.humidity as f64),
                    ],
                    n => vec![
                        (format!("tempSensor{}", n), t.temperature),
                        (format!("humiditySensor{}", n), t.humidity as f64),
                    ],
                };
                if let Some(dew) = t.dewpoint {
                    m.push(("dewpoint".to_string(), dew));
                }
                m
            }
            SensorReading::Pressure(p) => vec![("pressure".to_string(), p.absolute as f64)],
            SensorReading::Uv(u) => vec![("uvIndex".to_string(), u.index as f64)],
            SensorReading::Wind(w) => {
                let mut m = vec![
                    ("windGust".to_string(), w.gust),
                    ("windAverage".to_string(), w.average),
                    ("windDirection".to_string(), w.direction),
                ];
                if let Some(chill) = w.chill {
                    m.push(("windChill".to_string(), chill));
                }
                m
            }
            SensorReading::Status(_) => Vec::new(),
        }
    }
}
