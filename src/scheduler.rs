//! Fixed-interval scheduler and the acquisition-and-report cycle
//!
//! The scheduler runs every tick on a single task, so cycles never overlap:
//! a tick that comes due while a cycle is still in flight is dropped
//! (`MissedTickBehavior::Skip`).

use chrono::Local;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::actuators::led::Indicator;
use crate::bus::BusError;
use crate::display::StatusPanel;
use crate::sensors::tmp102::{Reading, Tmp102};
use crate::telemetry::{running_status, ReportOutcome, Reporter, Transport};

/// Work performed once per elapsed interval
pub trait Tick: Send + 'static {
    fn tick(&mut self) -> impl Future<Output = ()> + Send;
}

// === Scheduler ===

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

enum Slot<C> {
    Stopped(Option<C>),
    Running {
        stop: oneshot::Sender<()>,
        task: JoinHandle<C>,
    },
}

pub struct Scheduler<C> {
    interval: Duration,
    slot: Slot<C>,
}

impl<C: Tick> Scheduler<C> {
    pub fn new(target: C, interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            slot: Slot::Stopped(Some(target)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[cfg(test)]
    pub fn state(&self) -> SchedulerState {
        match self.slot {
            Slot::Stopped(_) => SchedulerState::Stopped,
            Slot::Running { .. } => SchedulerState::Running,
        }
    }

    /// Begin ticking. The first tick fires one full interval from now.
    pub fn start(&mut self) {
        let Slot::Stopped(target) = &mut self.slot else {
            tracing::warn!("Scheduler already running");
            return;
        };
        let Some(mut target) = target.take() else {
            tracing::warn!("Scheduler has nothing to run");
            return;
        };

        let interval = self.interval;
        let (stop, mut stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = ticker.tick() => target.tick().await,
                }
            }
            target
        });

        tracing::info!("Scheduler started ({:?} interval)", interval);
        self.slot = Slot::Running { stop, task };
    }

    /// Stop ticking. No cycle runs after this returns.
    ///
    /// An in-flight cycle gets up to `grace` to finish. Past that it is aborted
    /// and the tick target is dropped with its task (`into_inner` then yields `None`).
    pub async fn stop(&mut self, grace: Duration) {
        match std::mem::replace(&mut self.slot, Slot::Stopped(None)) {
            Slot::Running { stop, mut task } => {
                let _ = stop.send(());
                match tokio::time::timeout(grace, &mut task).await {
                    Ok(Ok(target)) => self.slot = Slot::Stopped(Some(target)),
                    Ok(Err(e)) => tracing::error!("Scheduler task ended abnormally: {}", e),
                    Err(_) => {
                        tracing::warn!("Cycle still running after {:?}, abandoning it", grace);
                        task.abort();
                        let _ = task.await;
                    }
                }
                tracing::info!("Scheduler stopped");
            }
            stopped => self.slot = stopped,
        }
    }

    /// Take back the tick target. `None` while running.
    pub fn into_inner(self) -> Option<C> {
        match self.slot {
            Slot::Stopped(target) => target,
            Slot::Running { .. } => None,
        }
    }
}

// === Cycle ===

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed {
        reading: Reading,
        report: ReportOutcome,
    },
    ReadFailed(BusError),
}

/// One acquisition-and-report pass: read, display, report, pulse
pub struct Cycle<I, P, T> {
    sensor: Tmp102<I>,
    indicator: Indicator<P>,
    reporter: Reporter<T>,
    panel: StatusPanel,
    completed: u64,
    failed: u64,
}

impl<I, P, T> Cycle<I, P, T>
where
    I: I2c,
    P: OutputPin,
    T: Transport,
{
    pub fn new(
        sensor: Tmp102<I>,
        indicator: Indicator<P>,
        reporter: Reporter<T>,
        panel: StatusPanel,
    ) -> Self {
        Self {
            sensor,
            indicator,
            reporter,
            panel,
            completed: 0,
            failed: 0,
        }
    }

    #[cfg(test)]
    pub fn panel(&self) -> &StatusPanel {
        &self.panel
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub async fn run_once(&mut self) -> CycleOutcome {
        let reading = match self.sensor.read_temperature() {
            Ok(reading) => reading,
            Err(e) => {
                // Last good reading stays on the panel
                self.failed += 1;
                self.panel.set_status(format!("Exception: {}", e));
                return CycleOutcome::ReadFailed(e);
            }
        };

        self.panel.set_raw(reading.raw.hex());
        self.panel.set_celsius(reading.temperature.display());
        self.panel.set_status("Running");

        let status = running_status(&Local::now());
        let report = ReportOutcome::from(
            self.reporter
                .report_reading(reading.temperature, &status)
                .await,
        );
        self.panel.set_report(report.to_string());

        self.indicator.pulse().await;
        self.completed += 1;

        CycleOutcome::Completed { reading, report }
    }

    pub fn into_parts(self) -> (Tmp102<I>, Indicator<P>, StatusPanel) {
        (self.sensor, self.indicator, self.panel)
    }
}

impl<I, P, T> Tick for Cycle<I, P, T>
where
    I: I2c + Send + 'static,
    P: OutputPin + Send + 'static,
    T: Transport,
{
    async fn tick(&mut self) {
        if let CycleOutcome::ReadFailed(e) = self.run_once().await {
            tracing::warn!("Cycle skipped: {}", e);
        }
        tracing::debug!(
            "Cycles: {} completed, {} failed",
            self.completed,
            self.failed
        );
    }
}
