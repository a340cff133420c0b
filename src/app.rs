//! Session lifecycle: startup, periodic operation, orderly shutdown
//!
//! Startup failures (bus open, sensor configuration) are terminal for the
//! session: no timer is started and the process idles until shutdown.

use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use std::future::Future;
use std::time::Duration;

use crate::actuators::led::Indicator;
use crate::bus::{BusError, BusHandle};
use crate::display::StatusPanel;
use crate::scheduler::{Cycle, Scheduler};
use crate::sensors::tmp102::Tmp102;
use crate::shared::CycleState;
use crate::telemetry::{Reporter, Transport, STATUS_FINISHED, STATUS_INITIALISING};

/// How long the final status ping may hold up shutdown
pub const FINISH_GRACE: Duration = Duration::from_secs(2);

/// How long shutdown waits for an in-flight cycle before abandoning it
pub const STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub state: CycleState,
    pub completed: u64,
    pub failed: u64,
    pub panel: StatusPanel,
}

/// Run one session until `shutdown` resolves.
///
/// Shutdown order: scheduler stopped, then the bus released, then the
/// `Finished` ping sent with a bounded wait.
pub async fn run_session<I, P, T, S>(
    bus: Result<BusHandle<I>, BusError>,
    mut indicator: Indicator<P>,
    reporter: Reporter<T>,
    interval: Duration,
    shutdown: S,
) -> SessionSummary
where
    I: I2c + Send + 'static,
    P: OutputPin + Send + 'static,
    T: Transport,
    S: Future<Output = ()>,
{
    let mut panel = StatusPanel::new();
    panel.set_status("Initialising ...");
    reporter.report_status(STATUS_INITIALISING);

    let bus = match bus {
        Ok(bus) => bus,
        Err(e) => {
            tracing::error!("I2C initialization failed: {}", e);
            panel.set_status(format!("Exception: {}", e));
            shutdown.await;
            finish(&reporter).await;
            return SessionSummary {
                state: CycleState::Degraded,
                completed: 0,
                failed: 0,
                panel,
            };
        }
    };

    let mut sensor = Tmp102::new(bus);
    if sensor.configure().is_err() {
        panel.set_status("Initialization failed");
        shutdown.await;
        sensor.close();
        finish(&reporter).await;
        return SessionSummary {
            state: sensor.state(),
            completed: 0,
            failed: 0,
            panel,
        };
    }

    tracing::info!("Init complete");
    indicator.ready_signal().await;

    let cycle = Cycle::new(sensor, indicator, reporter.clone(), panel);
    let mut scheduler = Scheduler::new(cycle, interval);
    tracing::info!("Sampling every {:?}", scheduler.interval());
    scheduler.start();

    shutdown.await;
    tracing::info!("Shutting down");
    scheduler.stop(STOP_GRACE).await;

    let summary = match scheduler.into_inner() {
        Some(cycle) => {
            let (completed, failed) = (cycle.completed(), cycle.failed());
            let (mut sensor, _indicator, panel) = cycle.into_parts();
            sensor.close();
            SessionSummary {
                state: sensor.state(),
                completed,
                failed,
                panel,
            }
        }
        // The cycle was abandoned or died; the bus was dropped with its task
        None => SessionSummary {
            state: CycleState::Degraded,
            completed: 0,
            failed: 0,
            panel: StatusPanel::new(),
        },
    };

    finish(&reporter).await;
    tracing::info!(
        "Session ended: {} cycles completed, {} failed",
        summary.completed,
        summary.failed
    );
    summary
}

async fn finish<T: Transport>(reporter: &Reporter<T>) {
    let ping = reporter.report_status(STATUS_FINISHED);
    if tokio::time::timeout(FINISH_GRACE, ping).await.is_err() {
        tracing::warn!("Finished status not confirmed within {:?}, abandoning", FINISH_GRACE);
    }
}
