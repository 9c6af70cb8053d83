use anyhow::Result;
use embedded_hal::{digital::v2::OutputPin, PwmPin};
use log::{debug, warn};
use std::fmt::Debug;

use crate::{
    button::ButtonActivity,
    clock::Timeout,
    infra::{trace_func, Actuator},
    light::{Headlights, Taillights},
    motion::MotionSensor,
    power::{Sleeper, WakeGate},
};

/// The car's outputs, driven by the state machine.
///
/// # Type Parameters
/// * `H` - Headlight pin.
/// * `L` - Left tail light channel.
/// * `R` - Right tail light channel.
/// * `S` - The motion sensor.
/// * `Z` - The platform's sleep implementation.
pub struct Car<H, L, R, S, Z>
where
    H: OutputPin,
    L: PwmPin<Duty = u32>,
    R: PwmPin<Duty = u32>,
    S: MotionSensor,
    Z: Sleeper,
{
    headlights: Headlights<H>,
    taillights: Taillights<L, R>,
    sensor: S,
    sleeper: Z,
    gate: WakeGate,
    activity: ButtonActivity,
    error_hold: Timeout,
}

impl<H, L, R, S, Z> Car<H, L, R, S, Z>
where
    H: OutputPin,
    H::Error: Debug,
    L: PwmPin<Duty = u32>,
    R: PwmPin<Duty = u32>,
    S: MotionSensor,
    Z: Sleeper,
{
    /// Creates a new `Car` instance.
    ///
    /// # Arguments
    /// * `headlights` - The headlights.
    /// * `taillights` - The tail/brake lights.
    /// * `sensor` - The motion sensor, shared with the motion monitor.
    /// * `sleeper` - Puts the device to sleep.
    /// * `gate` - Wake interrupt gate, armed before sleeping.
    /// * `activity` - Button activity; sleep is skipped while it is busy.
    /// * `error_hold` - How long the fail-safe pattern is held.
    #[must_use]
    pub fn new(
        headlights: Headlights<H>,
        taillights: Taillights<L, R>,
        sensor: S,
        sleeper: Z,
        gate: WakeGate,
        activity: ButtonActivity,
        error_hold: Timeout,
    ) -> Self {
        Self {
            headlights,
            taillights,
            sensor,
            sleeper,
            gate,
            activity,
            error_hold,
        }
    }

    #[must_use]
    pub fn headlights(&self) -> &Headlights<H> {
        &self.headlights
    }

    #[must_use]
    pub fn taillights(&self) -> &Taillights<L, R> {
        &self.taillights
    }

    #[must_use]
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    #[must_use]
    pub fn sleeper(&self) -> &Z {
        &self.sleeper
    }
}

impl<H, L, R, S, Z> Actuator for Car<H, L, R, S, Z>
where
    H: OutputPin,
    H::Error: Debug,
    L: PwmPin<Duty = u32>,
    R: PwmPin<Duty = u32>,
    S: MotionSensor,
    Z: Sleeper,
{
    fn start_car(&mut self) -> Result<()> {
        trace_func!();

        self.sensor.configure()?;
        self.sensor.enable()?;
        self.taillights_off()
    }

    fn stop_car(&mut self) -> Result<()> {
        trace_func!();

        self.sensor.disable()?;
        self.taillights_off()?;
        self.headlights_off()
    }

    fn headlights_on(&mut self) -> Result<()> {
        trace_func!();

        self.headlights.on()
    }

    fn headlights_off(&mut self) -> Result<()> {
        trace_func!();

        self.headlights.off()
    }

    fn taillights_bright(&mut self) -> Result<()> {
        trace_func!();

        self.taillights.bright();
        Ok(())
    }

    fn taillights_dim(&mut self) -> Result<()> {
        trace_func!();

        self.taillights.dim();
        Ok(())
    }

    fn taillights_off(&mut self) -> Result<()> {
        trace_func!();

        self.taillights.off();
        Ok(())
    }

    fn wait_for_interrupt(&mut self) -> Result<()> {
        // Sleeping mid-debounce would freeze the sample clock with a press
        // half classified.
        if !self.activity.is_idle() {
            return Ok(());
        }

        debug!("Sleeping until the next wake interrupt");
        self.gate.arm();
        let slept = self.sleeper.sleep();
        // Woken by something other than a wake line: nothing disarmed it.
        self.gate.on_wake();

        slept
    }

    fn handle_error(&mut self) -> Result<()> {
        trace_func!();

        // The lights go to the attention pattern even if the sensor is gone.
        let configured = self.sensor.configure();
        if let Err(e) = &configured {
            warn!("Sensor reconfiguration failed: {:#}", e);
        }
        self.taillights.full();
        self.headlights.on()?;

        if !self.error_hold.wait() {
            debug!("Error hold cancelled");
        }

        configured
    }
}
