//! Shared utilities for tmp102-telemetry

use chrono::{DateTime, TimeZone};
use std::fmt;

/// Lifecycle of the sensor subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Uninitialized,
    Initializing,
    Ready,
    /// Initialization failed. Terminal until the process restarts.
    Degraded,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleState::Uninitialized => "uninitialized",
            CycleState::Initializing => "initializing",
            CycleState::Ready => "ready",
            CycleState::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// Format a raw register pair as upper-case hex, MSB first
pub fn format_raw_hex(msb: u8, lsb: u8) -> String {
    format!("{:02X} {:02X}", msb, lsb)
}

/// Format a Celsius value with two decimals, ties rounded away from zero
pub fn format_celsius(celsius: f64) -> String {
    format!("{:.2}", (celsius * 100.0).round() / 100.0)
}

/// Wall-clock label in `H:MM` form (hour not zero-padded)
pub fn clock_label<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    now.format("%-H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_raw_hex() {
        assert_eq!(format_raw_hex(0x19, 0x00), "19 00");
        assert_eq!(format_raw_hex(0xE7, 0x0A), "E7 0A");
    }

    #[test]
    fn test_format_celsius() {
        assert_eq!(format_celsius(25.0), "25.00");
        assert_eq!(format_celsius(-25.0), "-25.00");
        assert_eq!(format_celsius(127.9375), "127.94");
        assert_eq!(format_celsius(-0.0625), "-0.06");
    }

    #[test]
    fn test_format_celsius_ties_round_away_from_zero() {
        assert_eq!(format_celsius(25.125), "25.13");
        assert_eq!(format_celsius(25.625), "25.63");
        assert_eq!(format_celsius(-25.125), "-25.13");
        assert_eq!(format_celsius(0.125), "0.13");
    }

    #[test]
    fn test_clock_label() {
        let morning = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap();
        assert_eq!(clock_label(&morning), "9:05");

        let evening = Utc.with_ymd_and_hms(2024, 3, 1, 21, 45, 59).unwrap();
        assert_eq!(clock_label(&evening), "21:45");
    }
}
