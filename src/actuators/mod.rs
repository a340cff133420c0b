//! Actuators module - local visual feedback

pub mod led;
