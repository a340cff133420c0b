//! Two-wire bus handle bound to a single device address
//!
//! The handle is transport-agnostic: anything implementing `embedded_hal::i2c::I2c`
//! can back it. Opening a real controller lives in `linux::i2c`.

use embedded_hal::i2c::{I2c, SevenBitAddress};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::shared::CycleState;

/// Errors raised by the bus driver and by sensor transactions on it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("no I2C controller matches '{0}'")]
    NotFound(String),
    #[error("failed to open I2C controller: {0}")]
    OpenFailed(String),
    #[error("I2C transaction failed: {0}")]
    Transaction(String),
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    #[error("bus handle already closed")]
    Closed,
    #[error("sensor not ready (state: {0})")]
    NotReady(CycleState),
}

/// Bus speed class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusSpeed {
    /// 100 kHz
    Standard,
    /// 400 kHz
    #[default]
    Fast,
}

impl BusSpeed {
    pub fn hz(self) -> u32 {
        match self {
            BusSpeed::Standard => 100_000,
            BusSpeed::Fast => 400_000,
        }
    }
}

impl fmt::Display for BusSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusSpeed::Standard => write!(f, "standard ({} kHz)", self.hz() / 1000),
            BusSpeed::Fast => write!(f, "fast ({} kHz)", self.hz() / 1000),
        }
    }
}

/// Exclusive handle to one addressed device on the bus
#[derive(Debug)]
pub struct BusHandle<I> {
    device: Option<I>,
    address: SevenBitAddress,
    speed: BusSpeed,
}

impl<I: I2c> BusHandle<I> {
    pub fn new(device: I, address: SevenBitAddress, speed: BusSpeed) -> Self {
        Self {
            device: Some(device),
            address,
            speed,
        }
    }

    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    pub fn speed(&self) -> BusSpeed {
        self.speed
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Plain write transaction
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        let address = self.address;
        let device = self.device.as_mut().ok_or(BusError::Closed)?;

        device
            .write(address, bytes)
            .map_err(|e| BusError::Transaction(format!("write {:02X?}: {:?}", bytes, e)))?;
        tracing::debug!("i2c 0x{:02X} write {:02X?}", address, bytes);
        Ok(())
    }

    /// Combined register-select-then-read transaction (repeated start)
    pub fn write_then_read(&mut self, bytes: &[u8], read_len: usize) -> Result<Vec<u8>, BusError> {
        let address = self.address;
        let device = self.device.as_mut().ok_or(BusError::Closed)?;

        let mut buffer = vec![0u8; read_len];
        device
            .write_read(address, bytes, &mut buffer)
            .map_err(|e| BusError::Transaction(format!("write-read {:02X?}: {:?}", bytes, e)))?;
        tracing::debug!("i2c 0x{:02X} write {:02X?} read {:02X?}", address, bytes, buffer);
        Ok(buffer)
    }

    /// Release the underlying device. Returns `true` only on the call that released it.
    pub fn close(&mut self) -> bool {
        match self.device.take() {
            Some(device) => {
                drop(device);
                tracing::info!("Released I2C device 0x{:02X}", self.address);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BusEvent, MockI2c};

    #[test]
    fn test_write_and_write_then_read() {
        let (i2c, bus) = MockI2c::new();
        bus.lock().unwrap().reading = [0x19, 0x00];
        let mut handle = BusHandle::new(i2c, 0x48, BusSpeed::Fast);

        handle.write(&[0x01, 0x60, 0xA0]).unwrap();
        let data = handle.write_then_read(&[0x00], 2).unwrap();

        assert_eq!(data, vec![0x19, 0x00]);
        assert_eq!(
            bus.lock().unwrap().events,
            vec![
                BusEvent::Write(0x48, vec![0x01, 0x60, 0xA0]),
                BusEvent::Write(0x48, vec![0x00]),
                BusEvent::Read(0x48, 2),
            ]
        );
    }

    #[test]
    fn test_transaction_failure_is_reported() {
        let (i2c, bus) = MockI2c::new();
        bus.lock().unwrap().fail_writes = true;
        let mut handle = BusHandle::new(i2c, 0x48, BusSpeed::Fast);

        let err = handle.write(&[0x01]).unwrap_err();
        assert!(matches!(err, BusError::Transaction(_)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (i2c, bus) = MockI2c::new();
        let mut handle = BusHandle::new(i2c, 0x48, BusSpeed::Standard);

        assert!(handle.is_open());
        assert!(handle.close());
        assert!(!handle.close());
        assert!(!handle.is_open());

        let released = bus
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| **e == BusEvent::Released)
            .count();
        assert_eq!(released, 1);
    }

    #[test]
    fn test_use_after_close_is_rejected() {
        let (i2c, bus) = MockI2c::new();
        let mut handle = BusHandle::new(i2c, 0x48, BusSpeed::Fast);
        handle.close();

        assert_eq!(handle.write(&[0x00]), Err(BusError::Closed));
        assert_eq!(handle.write_then_read(&[0x00], 2), Err(BusError::Closed));
        assert_eq!(bus.lock().unwrap().events, vec![BusEvent::Released]);
    }

    #[test]
    fn test_speed_display() {
        assert_eq!(BusSpeed::Fast.to_string(), "fast (400 kHz)");
        assert_eq!(BusSpeed::Standard.hz(), 100_000);
    }
}
