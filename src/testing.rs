//! Test doubles for the hardware and network seams

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::i2c::{self, ErrorKind, I2c, Operation};

use crate::telemetry::{ReportError, Transport};

// === I2C ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Write(u8, Vec<u8>),
    Read(u8, usize),
    Released,
}

#[derive(Debug, Default)]
pub struct BusState {
    pub events: Vec<BusEvent>,
    pub reading: [u8; 2],
    pub fail_writes: bool,
    pub fail_reads: bool,
}

pub type SharedBus = Arc<Mutex<BusState>>;

#[derive(Debug)]
pub struct MockI2cError;

impl i2c::Error for MockI2cError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)
    }
}

/// Scriptable I2C device; records every operation and its own release
#[derive(Debug)]
pub struct MockI2c {
    state: SharedBus,
}

impl MockI2c {
    pub fn new() -> (Self, SharedBus) {
        let state = Arc::new(Mutex::new(BusState::default()));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = MockI2cError;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if state.fail_writes {
                        return Err(MockI2cError);
                    }
                    state.events.push(BusEvent::Write(address, bytes.to_vec()));
                }
                Operation::Read(buffer) => {
                    if state.fail_reads {
                        return Err(MockI2cError);
                    }
                    let reading = state.reading;
                    for (slot, byte) in buffer.iter_mut().zip(reading.iter().cycle()) {
                        *slot = *byte;
                    }
                    state.events.push(BusEvent::Read(address, buffer.len()));
                }
            }
        }
        Ok(())
    }
}

impl Drop for MockI2c {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.events.push(BusEvent::Released);
        }
    }
}

// === GPIO ===

/// Output pin that records every level it is driven to (`true` = high)
#[derive(Debug, Clone, Default)]
pub struct MockPin {
    pub levels: Arc<Mutex<Vec<bool>>>,
}

impl PinErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.lock().unwrap().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.lock().unwrap().push(true);
        Ok(())
    }
}

// === Transport ===

/// Records requested URLs and answers with a fixed outcome after an optional delay
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    pub urls: Arc<Mutex<Vec<String>>>,
    pub response: Result<String, ReportError>,
    pub delay: Duration,
}

impl RecordingTransport {
    pub fn ok() -> Self {
        Self {
            urls: Arc::new(Mutex::new(Vec::new())),
            response: Ok("200 OK".to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(ReportError::Transport(message.to_string())),
            ..Self::ok()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    async fn get(&self, url: &str) -> Result<String, ReportError> {
        self.urls.lock().unwrap().push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.clone()
    }
}
