use anyhow::{anyhow, Result};
use log::warn;
use std::{
    fmt,
    sync::{Arc, Mutex},
};

use crate::{
    infra::Poller,
    message::{Level, Notifier, Trigger},
};

/// Raw status byte reported by the motion sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Status(u8);

impl Status {
    pub const DATA_READY: u8 = 0x01;
    pub const ACT: u8 = 0x10;
    pub const INACT: u8 = 0x20;
    pub const AWAKE: u8 = 0x40;
    pub const ERR_USER_REGS: u8 = 0x80;

    /// Motion is present.
    #[must_use]
    pub fn is_awake(self) -> bool {
        self.0 & Self::AWAKE != 0
    }

    /// The sensor lost its configuration (or could not be read at all).
    #[must_use]
    pub fn is_error(self) -> bool {
        self.0 & Self::ERR_USER_REGS != 0
    }
}

impl From<u8> for Status {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Anything that reports a motion status byte.
pub trait Sensor {
    /// Reads the current status.
    ///
    /// # Errors
    /// Returns an error if the sensor cannot be reached.
    fn poll_status(&mut self) -> Result<Status>;
}

/// A motion sensor that can also be powered and reconfigured.
pub trait MotionSensor: Sensor {
    /// Writes the full wake-on-motion configuration.
    ///
    /// # Errors
    /// Returns an error if the sensor cannot be reached.
    fn configure(&mut self) -> Result<()>;

    /// # Errors
    /// Returns an error if the sensor cannot be reached.
    fn enable(&mut self) -> Result<()>;

    /// # Errors
    /// Returns an error if the sensor cannot be reached.
    fn disable(&mut self) -> Result<()>;
}

// The monitor polls the sensor while the actuator powers and reconfigures
// it, so both hold it through a shared mutex.
impl<S: Sensor> Sensor for Arc<Mutex<S>> {
    fn poll_status(&mut self) -> Result<Status> {
        self.lock()
            .map_err(|e| anyhow!("Mutex lock error: {:?}", e))?
            .poll_status()
    }
}

impl<S: MotionSensor> MotionSensor for Arc<Mutex<S>> {
    fn configure(&mut self) -> Result<()> {
        self.lock()
            .map_err(|e| anyhow!("Mutex lock error: {:?}", e))?
            .configure()
    }

    fn enable(&mut self) -> Result<()> {
        self.lock()
            .map_err(|e| anyhow!("Mutex lock error: {:?}", e))?
            .enable()
    }

    fn disable(&mut self) -> Result<()> {
        self.lock()
            .map_err(|e| anyhow!("Mutex lock error: {:?}", e))?
            .disable()
    }
}

/// What the monitor concluded from one status read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading {
    pub awake: bool,
    pub error: bool,
}

impl Reading {
    /// Brake lights show while the car has settled.
    #[must_use]
    pub fn brakes_on(self) -> bool {
        !self.awake
    }
}

impl From<Status> for Reading {
    fn from(status: Status) -> Self {
        Self {
            awake: status.is_awake(),
            error: status.is_error(),
        }
    }
}

/// Turns the sensor status into the brake level and the error trigger.
///
/// # Type Parameters
/// * `S` - The sensor.
/// * `T` - The trigger type implementing the `Trigger` trait.
pub struct MotionMonitor<S, T>
where
    S: Sensor,
    T: Trigger,
{
    sensor: S,
    notifier: Notifier<T>,
    error: &'static T,
    brakes: Level,
}

impl<S, T> MotionMonitor<S, T>
where
    S: Sensor,
    T: Trigger,
{
    /// Creates a new `MotionMonitor` instance.
    ///
    /// # Arguments
    /// * `sensor` - The sensor to poll.
    /// * `notifier` - A notifier to raise errors on.
    /// * `error` - The trigger raised when the sensor reports a fault.
    /// * `brakes` - The brake level to keep up to date.
    #[must_use]
    pub fn new(
        sensor: S,
        notifier: Notifier<T>,
        error: &'static T,
        brakes: Level,
    ) -> Self {
        Self {
            sensor,
            notifier,
            error,
            brakes,
        }
    }

    /// Reads the sensor once and publishes the result.
    ///
    /// A fault raises the error trigger and leaves the brake level alone;
    /// otherwise the brake level follows the awake flag. A sensor that cannot
    /// be read counts as a fault.
    ///
    /// # Errors
    /// Returns an error if the error trigger cannot be raised.
    pub fn update(&mut self) -> Result<Reading> {
        let status = self.sensor.poll_status().unwrap_or_else(|e| {
            warn!("Motion sensor read failed: {:#}", e);
            Status::from(Status::ERR_USER_REGS)
        });
        let reading = Reading::from(status);

        if reading.error {
            warn!("Motion sensor fault, status {}", status);
            self.notifier.notify(self.error)?;
        } else {
            self.brakes.set(reading.brakes_on());
        }

        Ok(reading)
    }
}

impl<S, T> Poller for MotionMonitor<S, T>
where
    S: Sensor,
    T: Trigger,
{
    fn poll(&mut self) -> Result<()> {
        self.update().map(|_| ())
    }
}
