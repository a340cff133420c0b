//! LED output line via the GPIO character device

use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::CdevPin;

const CONSUMER: &str = "tmp102-telemetry";

/// Request `line` on `chip` as an output, initially high (LED off)
pub fn open_led(chip: &str, line: u32) -> anyhow::Result<CdevPin> {
    let mut chip = Chip::new(chip)?;
    let handle = chip
        .get_line(line)?
        .request(LineRequestFlags::OUTPUT, 1, CONSUMER)?;
    let pin = CdevPin::new(handle)?;

    tracing::info!("LED on {} line {}", chip.path().display(), line);
    Ok(pin)
}
