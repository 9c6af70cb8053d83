use anyhow::Result;
use embassy_time::Timer;
use futures_lite::future::block_on;
use log::error;

/// Grace period before a restart, so the last log lines get out.
const RESTART_DELAY_MS: u64 = 1000;

/// Handles program failure by restarting the device.
///
/// The controller should run until it is powered off. If the main loop ever
/// dies, wait a second and start over.
pub fn failure() -> ! {
    block_on(Timer::after_millis(RESTART_DELAY_MS));

    #[cfg(feature = "espidf")]
    esp_idf_hal::reset::restart();

    #[cfg(not(feature = "espidf"))]
    std::process::abort();
}

/// Runs the application with error logging and a restart on exit.
///
/// Any error is logged with its full chain before the restart.
///
/// # Arguments
/// * `f` - A closure that returns a `Result`.
///
/// # Type Parameters
/// * `F` - The type of the closure.
///
/// # Returns
/// Never returns normally: either runs forever or restarts the device.
pub fn main<F>(f: F) -> !
where
    F: FnOnce() -> Result<()>,
{
    if let Err(e) = f() {
        error!("Fatal error: {:#}", e);
    }

    failure()
}
