//! Configuration module
//!
//! Reads settings from ~/.config/tmp102-telemetry/config.toml

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::actuators::led::DEFAULT_PULSE;
use crate::bus::BusSpeed;
use crate::sensors::tmp102::DEFAULT_ADDRESS;

/// Full configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub led: LedConfig,
}

/// Remote endpoint and its shared key
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub telemetry_key: String,
    pub endpoint_base: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            telemetry_key: String::new(),
            endpoint_base: "https://io.adafruit.com/api/groups/RPi".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Controller selector: adapter name or logical node name (`I2C1` → `i2c-1`)
    pub controller_name: String,
    pub address: u8,
    pub bus_speed: BusSpeed,
    pub interval_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            controller_name: "I2C1".to_string(),
            address: DEFAULT_ADDRESS,
            bus_speed: BusSpeed::Fast,
            interval_ms: 60_000,
        }
    }
}

impl SensorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedConfig {
    pub enabled: bool,
    pub chip: String,
    pub line: u32,
    pub pulse_ms: u64,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chip: "/dev/gpiochip0".to_string(),
            line: 5,
            pulse_ms: DEFAULT_PULSE.as_millis() as u64,
        }
    }
}

impl LedConfig {
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tmp102-telemetry").join("config.toml"))
    }

    /// Load config from file, or return default if not found
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            tracing::warn!("Could not determine config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config.warn_if_incomplete();
                config
            }
            Err(e) => {
                tracing::error!("Failed to load config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    fn warn_if_incomplete(&self) {
        if self.telemetry.telemetry_key.is_empty() {
            tracing::warn!("telemetry_key is empty; the endpoint will likely reject reports");
        }
    }
}
