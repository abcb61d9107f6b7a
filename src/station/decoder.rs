/// Decoding of validated frames into physical measurements
use thiserror::Error;

use crate::models::{
    PressureReading, RainReading, SensorReading, StatusReading, TempHumidityReading, UvReading,
    WindReading,
};
use crate::station::assembler::expected_frame_len;
use crate::utils::{round1, scaled_from_bytes, station_clock};

/// Weather forecast by the high nibble of pressure byte 3. Indices 4 and 6
/// are reserved by the protocol and read as "unknown", as does anything
/// past the table.
const FORECAST: [&str; 7] = [
    "partly cloudy",
    "rainy",
    "cloudy",
    "sunny",
    "unknown",
    "snowy",
    "unknown",
];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown sensor code 0x{0:02x}")]
    UnknownSensor(u8),
    #[error("sensor 0x{code:02x} frame has {len} bytes, expected {expected}")]
    WrongLength {
        code: u8,
        len: usize,
        expected: usize,
    },
}

/// Dispatch a validated frame to the decode routine selected by its
/// sensor-type byte.
pub fn decode_frame(frame: &[u8]) -> Result<SensorReading, DecodeError> {
    let code = *frame.get(1).ok_or(DecodeError::UnknownSensor(0))?;
    let expected = expected_frame_len(code).ok_or(DecodeError::UnknownSensor(code))?;
    if frame.len() != expected {
        return Err(DecodeError::WrongLength {
            code,
            len: frame.len(),
            expected,
        });
    }

    let reading = match code {
        0x41 => SensorReading::Rain(decode_rain(frame)),
        0x42 => SensorReading::TempHumidity(decode_temp_humidity(frame)),
        0x46 => SensorReading::Pressure(decode_pressure(frame)),
        0x47 => SensorReading::Uv(decode_uv(frame)),
        0x48 => SensorReading::Wind(decode_wind(frame)),
        0x60 => SensorReading::Status(decode_status(frame)),
        other => return Err(DecodeError::UnknownSensor(other)),
    };
    Ok(reading)
}

/// Rain comes in inches; * 0.254 makes mm.
fn decode_rain(data: &[u8]) -> RainReading {
    RainReading {
        rate: scaled_from_bytes(data[3] & 0x0f, data[2], 0.254),
        last_hour: scaled_from_bytes(data[5], data[4], 0.254),
        last_24h: scaled_from_bytes(data[7], data[6], 0.254),
        total: scaled_from_bytes(data[9], data[8], 0.254),
        total_since: station_clock(data[10], data[11], data[12], data[13], data[14]),
    }
}

fn decode_temp_humidity(data: &[u8]) -> TempHumidityReading {
    let sensor = data[2] & 0x0f;

    let mut temperature = scaled_from_bytes(data[4] & 0x0f, data[3], 0.1);
    if data[4] & 0x80 != 0 {
        temperature = -temperature;
    }

    // Dewpoint is of interest for the outdoor sensor (no. 1).
    let dewpoint = if sensor == 1 {
        let mut dew = scaled_from_bytes(data[7] & 0x0f, data[6], 0.1);
        if data[7] & 0x80 != 0 {
            dew = -dew;
        }
        Some(dew)
    } else {
        None
    };

    TempHumidityReading {
        sensor,
        temperature,
        humidity: data[5],
        dewpoint,
    }
}

fn decode_pressure(data: &[u8]) -> PressureReading {
    let absolute = data[2] as u16 + (data[3] & 0x0f) as u16 * 256;
    let relative = data[4] as u16 + (data[5] & 0x0f) as u16 * 256;
    let forecast = FORECAST
        .get((data[3] >> 4) as usize)
        .copied()
        .unwrap_or("unknown");
    PressureReading {
        absolute,
        relative,
        forecast,
    }
}

fn decode_uv(data: &[u8]) -> UvReading {
    UvReading { index: data[3] }
}

fn decode_wind(data: &[u8]) -> WindReading {
    let gust = scaled_from_bytes(data[5] & 0x0f, data[4], 0.1);
    let average = round1((data[6] as f64 * 16.0 + (data[5] >> 4) as f64) / 10.0);
    // 16 compass sectors of 22.5 degrees each.
    let direction = (data[2] & 0x0f) as f64 * 360.0 / 16.0;

    // Byte 8 equal to 0x20 is the "no wind chill" sentinel; otherwise the
    // value arrives in Fahrenheit tenths.
    let chill = if data[8] != 0x20 {
        Some(round1(
            (scaled_from_bytes(data[8] & 0x0f, data[7], 0.1) - 32.0) / 1.8,
        ))
    } else {
        None
    };

    WindReading {
        gust,
        average,
        direction,
        chill,
    }
}

fn decode_status(data: &[u8]) -> StatusReading {
    StatusReading {
        internal_clock: station_clock(data[4], data[5], data[6], data[7], data[8]),
        powered: data[0] & 0x80 == 0,
        radio_sync: data[0] & 0x20 != 0,
        radio_signal_low: data[0] & 0x10 != 0,
    }
}
