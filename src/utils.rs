/// Utility functions for bit-packed field decoding and formatting
use time::{format_description, Date, Month, PrimitiveDateTime, Time};

/// Combine a high and low byte into a scaled magnitude.
///
/// The station packs most multi-byte values as `high * 256 + low` in some
/// protocol unit; `factor` converts to the physical unit. Rounded to one
/// decimal, matching the resolution the console itself displays.
pub fn scaled_from_bytes(high: u8, low: u8, factor: f64) -> f64 {
    let result = (high as f64 * 256.0 + low as f64) * factor;
    (result * 10.0).round() / 10.0
}

/// Round a value to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Build a timestamp from the five-byte clock layout used in rain and
/// status frames: minute, hour, day, month, year offset from 2000.
///
/// The station occasionally reports garbage calendar components (fresh
/// batteries, lost radio clock). Those degrade to None rather than
/// invalidating the frame.
pub fn station_clock(
    minute: u8,
    hour: u8,
    day: u8,
    month: u8,
    year_offset: u8,
) -> Option<PrimitiveDateTime> {
    let month = Month::try_from(month).ok()?;
    let date = Date::from_calendar_date(2000 + year_offset as i32, month, day).ok()?;
    let time = Time::from_hms(hour, minute, 0).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

/// Format a station timestamp for human-readable logging.
///
/// Converts a PrimitiveDateTime to DD.MM.YYYY - HH:MM:SS format.
/// Falls back to default string representation if formatting fails.
pub fn format_station_time(dt: &PrimitiveDateTime) -> String {
    let format = format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]")
        .expect("Failed to create format description");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}
