//! Sensors module - temperature acquisition over I2C

pub mod tmp102;
