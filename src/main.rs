//! tmp102-telemetry: periodic I2C temperature sampling with HTTP telemetry
//!
//! Samples a TMP102 over I2C once per interval, shows the reading, reports it to
//! a query-string HTTP endpoint and blinks an LED.
//!
//! Components:
//! - bus / linux::i2c: I2C controller selection and the device handle
//! - sensors::tmp102: configuration, one-shot conversion, decoding
//! - telemetry: awaited reading reports, detached lifecycle pings
//! - actuators::led: active-low feedback pulses
//! - scheduler / app: fixed-interval cycle and session lifecycle

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// === Modules ===

mod actuators;
mod app;
mod bus;
mod config;
mod display;
mod scheduler;
mod sensors;
mod shared;
mod telemetry;

#[cfg(all(feature = "linux", target_os = "linux"))]
mod linux;

#[cfg(test)]
mod testing;

// === CLI ===

#[derive(Parser)]
#[command(name = "tmp102-telemetry")]
#[command(about = "Periodic TMP102 temperature sampling with HTTP telemetry and LED feedback")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the config file in your editor
    Config,
    /// Take a single reading and print it (no telemetry, no LED)
    Read,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Some(Commands::Config) => {
            run_config_command()?;
        }
        Some(Commands::Read) => {
            run_read_command(&config::Config::load())?;
        }
        None => {
            run_monitor(config::Config::load()).await?;
        }
    }

    Ok(())
}

/// Open config file in user's editor
fn run_config_command() -> anyhow::Result<()> {
    let config_path = config::Config::path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    // Create config dir if needed
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Create config file from template if it doesn't exist
    if !config_path.exists() {
        let template = include_str!("../config.toml.example");
        std::fs::write(&config_path, template)?;
        println!("Created config file: {}", config_path.display());
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "nano".to_string());

    println!("Opening {} with {}", config_path.display(), editor);

    std::process::Command::new(&editor)
        .arg(&config_path)
        .status()?;

    Ok(())
}

/// One-off reading for checking the wiring
#[cfg(all(feature = "linux", target_os = "linux"))]
fn run_read_command(config: &config::Config) -> anyhow::Result<()> {
    let bus = linux::i2c::open(
        &config.sensor.controller_name,
        config.sensor.address,
        config.sensor.bus_speed,
    )?;
    let mut sensor = sensors::tmp102::Tmp102::new(bus);

    let reading = sensor
        .configure()
        .and_then(|()| sensor.read_temperature());
    sensor.close();
    let reading = reading?;

    println!("Temp (RAW): {}", reading.raw.hex());
    println!("Celsius: {}", reading.temperature.display());
    Ok(())
}

/// Run the sampling session until Ctrl-C / SIGTERM
#[cfg(all(feature = "linux", target_os = "linux"))]
async fn run_monitor(config: config::Config) -> anyhow::Result<()> {
    use actuators::led::Indicator;
    use telemetry::{HttpTransport, Reporter};

    tracing::info!("Starting tmp102-telemetry");

    let reporter = Reporter::new(
        HttpTransport::new(reqwest::Client::new()),
        &config.telemetry.endpoint_base,
        &config.telemetry.telemetry_key,
    );

    let pulse = config.led.pulse();
    let indicator = if config.led.enabled {
        match linux::gpio::open_led(&config.led.chip, config.led.line) {
            Ok(pin) => Indicator::new(pin, pulse),
            Err(e) => {
                tracing::warn!("LED unavailable, continuing without it: {}", e);
                Indicator::disabled(pulse)
            }
        }
    } else {
        Indicator::disabled(pulse)
    };

    let bus = linux::i2c::open(
        &config.sensor.controller_name,
        config.sensor.address,
        config.sensor.bus_speed,
    );

    let summary = app::run_session(
        bus,
        indicator,
        reporter,
        config.sensor.interval(),
        shutdown_signal(),
    )
    .await;

    tracing::info!("tmp102-telemetry stopped (sensor {})", summary.state);
    Ok(())
}

#[cfg(not(all(feature = "linux", target_os = "linux")))]
fn run_read_command(_config: &config::Config) -> anyhow::Result<()> {
    anyhow::bail!("No I2C backend available: build on Linux with the \"linux\" feature")
}

#[cfg(not(all(feature = "linux", target_os = "linux")))]
async fn run_monitor(_config: config::Config) -> anyhow::Result<()> {
    anyhow::bail!("No I2C backend available: build on Linux with the \"linux\" feature")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
