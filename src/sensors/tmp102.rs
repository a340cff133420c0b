//! TMP102 digital temperature sensor
//!
//! 12-bit two's-complement temperature register, 0.0625 °C per count.
//! Every read triggers a one-shot conversion by writing the configuration
//! register with the OS bit set before selecting the temperature register.

use embedded_hal::i2c::I2c;

use crate::bus::{BusError, BusHandle};
use crate::shared::{format_celsius, format_raw_hex, CycleState};

/// Default 7-bit address (ADD0 tied to ground)
pub const DEFAULT_ADDRESS: u8 = 0x48;

pub const TEMP_REG: u8 = 0x00;
pub const CONFIG_REG: u8 = 0x01;

/// Normal (continuous, SD=0) operating mode: 12-bit resolution, 4 Hz, AL set
pub const CONFIG_NORMAL: [u8; 3] = [CONFIG_REG, 0x60, 0xA0];

/// Normal-mode control bytes with the one-shot (OS) bit set.
/// Written as a constant; the current register contents are not read back or merged.
pub const CONFIG_ONE_SHOT: [u8; 3] = [CONFIG_REG, 0xE0, 0xA0];

const CELSIUS_PER_COUNT: f64 = 0.0625;

// === Data Types ===

/// Unconverted register pair as read from the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub msb: u8,
    pub lsb: u8,
}

impl RawSample {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BusError> {
        match bytes {
            [msb, lsb, ..] => Ok(Self {
                msb: *msb,
                lsb: *lsb,
            }),
            _ => Err(BusError::ShortRead {
                expected: 2,
                got: bytes.len(),
            }),
        }
    }

    /// Sign-extended 12-bit count
    pub fn counts(self) -> i16 {
        i16::from_be_bytes([self.msb, self.lsb]) >> 4
    }

    pub fn temperature(self) -> Temperature {
        Temperature {
            counts: self.counts(),
        }
    }

    pub fn hex(self) -> String {
        format_raw_hex(self.msb, self.lsb)
    }
}

/// Fixed-point temperature, 1/16 °C per count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Temperature {
    counts: i16,
}

impl Temperature {
    pub fn celsius(self) -> f64 {
        f64::from(self.counts) * CELSIUS_PER_COUNT
    }

    /// Two-decimal rendering used for display and telemetry
    pub fn display(self) -> String {
        format_celsius(self.celsius())
    }
}

/// One successful acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub raw: RawSample,
    pub temperature: Temperature,
}

// === Controller ===

#[derive(Debug)]
pub struct Tmp102<I> {
    bus: BusHandle<I>,
    state: CycleState,
}

impl<I: I2c> Tmp102<I> {
    pub fn new(bus: BusHandle<I>) -> Self {
        Self {
            bus,
            state: CycleState::Uninitialized,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Put the sensor into normal operating mode.
    ///
    /// Failure is terminal: the controller moves to `Degraded` and refuses all
    /// further reads.
    pub fn configure(&mut self) -> Result<(), BusError> {
        if self.state == CycleState::Degraded {
            return Err(BusError::NotReady(self.state));
        }

        self.state = CycleState::Initializing;
        match self.bus.write(&CONFIG_NORMAL) {
            Ok(()) => {
                self.state = CycleState::Ready;
                tracing::info!(
                    "TMP102 at 0x{:02X} configured ({})",
                    self.bus.address(),
                    self.bus.speed()
                );
                Ok(())
            }
            Err(e) => {
                self.state = CycleState::Degraded;
                tracing::error!("TMP102 configuration failed: {}", e);
                Err(e)
            }
        }
    }

    /// Trigger a one-shot conversion and read the temperature register.
    ///
    /// Either both transactions succeed and a full reading is returned, or
    /// nothing is.
    pub fn read_temperature(&mut self) -> Result<Reading, BusError> {
        if self.state != CycleState::Ready {
            return Err(BusError::NotReady(self.state));
        }

        self.bus.write(&CONFIG_ONE_SHOT)?;
        let bytes = self.bus.write_then_read(&[TEMP_REG], 2)?;
        let raw = RawSample::from_bytes(&bytes)?;

        Ok(Reading {
            raw,
            temperature: raw.temperature(),
        })
    }

    /// Release the bus; safe to call more than once
    pub fn close(&mut self) -> bool {
        self.bus.close()
    }
}
