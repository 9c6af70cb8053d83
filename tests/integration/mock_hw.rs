//! Mock hardware for integration tests.
//!
//! Pins and sensors share their state through `Rc`/`Arc` handles so a test
//! can drive the inputs while the scheduler owns the drivers.

use anyhow::{bail, Result};
use derby_lights::{
    infra::Actuator,
    motion::{MotionSensor, Sensor, Status},
    power::Sleeper,
};
use embedded_hal::{
    digital::v2::{InputPin, OutputPin},
    PwmPin,
};
use std::{cell::Cell, convert::Infallible, rc::Rc};

// ── Button pin ────────────────────────────────────────────────

/// Active-low button pin. `pressed` is shared with the test.
pub struct MockButtonPin {
    pub pressed: Rc<Cell<bool>>,
}

impl InputPin for MockButtonPin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(!self.pressed.get())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.pressed.get())
    }
}

// ── Motion sensor ─────────────────────────────────────────────

/// Scripted motion sensor. `status: None` makes every read fail.
#[derive(Default)]
pub struct MockSensor {
    pub status: Option<u8>,
    pub calls: Vec<&'static str>,
}

#[allow(dead_code)]
impl MockSensor {
    pub fn with_status(status: u8) -> Self {
        Self {
            status: Some(status),
            calls: Vec::new(),
        }
    }

    pub fn powered(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match *c {
                "enable" => Some(true),
                "disable" => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl Sensor for MockSensor {
    fn poll_status(&mut self) -> Result<Status> {
        match self.status {
            Some(bits) => Ok(Status::from(bits)),
            None => bail!("sensor not responding"),
        }
    }
}

impl MotionSensor for MockSensor {
    fn configure(&mut self) -> Result<()> {
        self.calls.push("configure");
        Ok(())
    }

    fn enable(&mut self) -> Result<()> {
        self.calls.push("enable");
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.calls.push("disable");
        Ok(())
    }
}

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    StartCar,
    StopCar,
    HeadlightsOn,
    HeadlightsOff,
    TaillightsBright,
    TaillightsDim,
    TaillightsOff,
    WaitForInterrupt,
    HandleError,
}

/// Records every actuator call.
#[derive(Default)]
pub struct MockActuator {
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockActuator {
    /// Returns the calls recorded so far, without the sleep requests, and
    /// forgets them.
    pub fn take(&mut self) -> Vec<ActuatorCall> {
        std::mem::take(&mut self.calls)
            .into_iter()
            .filter(|c| *c != ActuatorCall::WaitForInterrupt)
            .collect()
    }

    pub fn sleep_requests(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == ActuatorCall::WaitForInterrupt)
            .count()
    }
}

impl Actuator for MockActuator {
    fn start_car(&mut self) -> Result<()> {
        self.calls.push(ActuatorCall::StartCar);
        Ok(())
    }

    fn stop_car(&mut self) -> Result<()> {
        self.calls.push(ActuatorCall::StopCar);
        Ok(())
    }

    fn headlights_on(&mut self) -> Result<()> {
        self.calls.push(ActuatorCall::HeadlightsOn);
        Ok(())
    }

    fn headlights_off(&mut self) -> Result<()> {
        self.calls.push(ActuatorCall::HeadlightsOff);
        Ok(())
    }

    fn taillights_bright(&mut self) -> Result<()> {
        self.calls.push(ActuatorCall::TaillightsBright);
        Ok(())
    }

    fn taillights_dim(&mut self) -> Result<()> {
        self.calls.push(ActuatorCall::TaillightsDim);
        Ok(())
    }

    fn taillights_off(&mut self) -> Result<()> {
        self.calls.push(ActuatorCall::TaillightsOff);
        Ok(())
    }

    fn wait_for_interrupt(&mut self) -> Result<()> {
        self.calls.push(ActuatorCall::WaitForInterrupt);
        Ok(())
    }

    fn handle_error(&mut self) -> Result<()> {
        self.calls.push(ActuatorCall::HandleError);
        Ok(())
    }
}

// ── Light outputs ─────────────────────────────────────────────

#[derive(Default)]
pub struct MockOutputPin {
    pub high: bool,
}

impl OutputPin for MockOutputPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

/// 8 bit PWM channel.
#[derive(Default)]
pub struct MockPwm {
    pub duty: u32,
    pub enabled: bool,
}

impl PwmPin for MockPwm {
    type Duty = u32;

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn get_duty(&self) -> u32 {
        self.duty
    }

    fn get_max_duty(&self) -> u32 {
        255
    }

    fn set_duty(&mut self, duty: u32) {
        self.duty = duty;
    }
}

// ── Sleep ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockSleeper {
    pub naps: usize,
}

impl Sleeper for MockSleeper {
    fn sleep(&mut self) -> Result<()> {
        self.naps += 1;
        Ok(())
    }
}
