/// Lighting controller for a battery powered derby car.
///
/// A motion sensor and a single button feed a small hierarchical state
/// machine that drives the head and tail lights and puts the device to sleep
/// between stimuli.
///
/// # Modules
/// * `adxl362` - ADXL362 accelerometer register driver.
/// * `button` - Button debounce and click/long-press classification.
/// * `car` - The actuator: lights, sensor power and sleep.
/// * `clock` - Cancellable timeouts and the sample ticker.
/// * `config` - Timing configuration.
/// * `infra` - Infrastructure traits and macros.
/// * `light` - Head and tail light drivers.
/// * `logic` - The lighting state machine.
/// * `message` - Event mailbox and shared levels.
/// * `motion` - Motion sensor status and monitor.
/// * `power` - Sleep and wake interrupt gating.
/// * `scheduler` - The cooperative main loop.
/// * `thread` - Restart-on-failure wrapper.
pub mod adxl362;
pub mod button;
pub mod car;
pub mod clock;
pub mod config;
pub mod infra;
pub mod light;
pub mod logic;
pub mod message;
pub mod motion;
pub mod power;
pub mod scheduler;
pub mod thread;
