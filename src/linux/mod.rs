//! Linux module - hardware backends for the bus and the LED line
//!
//! Only compiled on Linux with the "linux" feature enabled.

pub mod gpio;
pub mod i2c;
