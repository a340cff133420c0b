//! LED feedback indicator
//!
//! The LED is wired active-low: driving the pin low lights it.

use embedded_hal::digital::OutputPin;
use std::time::Duration;

/// Default pulse width
pub const DEFAULT_PULSE: Duration = Duration::from_millis(100);

/// Pause between the two pulses of the ready signal, in pulse widths
const READY_GAP_PULSES: u32 = 4;

#[derive(Debug)]
pub struct Indicator<P> {
    pin: Option<P>,
    pulse: Duration,
}

impl<P: OutputPin> Indicator<P> {
    /// Wrap an acquired pin and drive it to the inactive level
    pub fn new(mut pin: P, pulse: Duration) -> Self {
        if let Err(e) = pin.set_high() {
            tracing::warn!("Failed to set LED inactive: {:?}", e);
        }
        Self {
            pin: Some(pin),
            pulse,
        }
    }

    /// Indicator with no pin; pulses only wait out their delay
    pub fn disabled(pulse: Duration) -> Self {
        Self { pin: None, pulse }
    }

    #[cfg(test)]
    pub fn has_pin(&self) -> bool {
        self.pin.is_some()
    }

    /// Light the LED for one pulse width
    pub async fn pulse(&mut self) {
        self.drive(false);
        tokio::time::sleep(self.pulse).await;
        self.drive(true);
    }

    /// Double blink marking the end of startup
    pub async fn ready_signal(&mut self) {
        self.pulse().await;
        tokio::time::sleep(self.pulse * READY_GAP_PULSES).await;
        self.pulse().await;
    }

    fn drive(&mut self, high: bool) {
        let Some(pin) = self.pin.as_mut() else {
            return;
        };

        let result = if high { pin.set_high() } else { pin.set_low() };
        if let Err(e) = result {
            tracing::warn!("LED write failed: {:?}", e);
        }
    }
}
