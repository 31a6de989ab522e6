use crate::{bus::DisplayBus, lcd_driver::St7796, Error, Result};
use embedded_hal::delay::DelayNs;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Install a SIGINT/SIGTERM handler that flips the shared running flag instead of exiting immediately.
pub(super) fn create_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let running_handle = running.clone();

    ctrlc::set_handler(move || {
        running_handle.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    Ok(running)
}

/// Blank the panel and release the bus before exiting.
pub(super) fn render_shutdown<B: DisplayBus, D: DelayNs>(display: &mut St7796<B, D>) {
    if let Err(err) = display.shutdown() {
        tracing::warn!(error = %err, "could not blank the panel on exit");
    }
}
