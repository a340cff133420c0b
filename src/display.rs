//! Status panel: the textual fields an attached display renders
//!
//! Every update is also logged so a headless deployment shows the same data.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPanel {
    /// Last raw register pair, e.g. `19 00`
    pub raw: String,
    /// Last temperature, e.g. `25.00`
    pub celsius: String,
    pub status: String,
    /// Outcome of the last telemetry submission
    pub report: String,
}

impl StatusPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_raw(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
        tracing::info!("Temp (RAW): {}", self.raw);
    }

    pub fn set_celsius(&mut self, celsius: impl Into<String>) {
        self.celsius = celsius.into();
        tracing::info!("Celsius: {}", self.celsius);
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        tracing::info!("Status: {}", self.status);
    }

    pub fn set_report(&mut self, report: impl Into<String>) {
        self.report = report.into();
        tracing::info!("Report: {}", self.report);
    }
}
