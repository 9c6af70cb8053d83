use anyhow::{anyhow, Result};
use embedded_hal::{digital::v2::OutputPin, PwmPin};
use std::fmt::Debug;

/// Duty cycles are expressed against this full scale.
pub const DUTY_SCALE: u32 = 255;
/// Brake lights on.
pub const BRIGHT_DUTY: u32 = 250;
/// Running lights.
pub const DIM_DUTY: u32 = 10;

/// Scales a duty from `DUTY_SCALE` to the channel's own resolution.
fn scaled(max_duty: u32, duty: u32) -> u32 {
    let value = u64::from(max_duty) * u64::from(duty) / u64::from(DUTY_SCALE);
    u32::try_from(value).unwrap_or(max_duty)
}

/// Headlights switched by a MOSFET on a GPIO pin.
///
/// # Type Parameters
/// * `P` - The output pin, high when lit.
pub struct Headlights<P: OutputPin> {
    pin: P,
    lit: bool,
}

impl<P> Headlights<P>
where
    P: OutputPin,
    P::Error: Debug,
{
    /// Creates a new `Headlights` instance, initially off.
    ///
    /// # Errors
    /// Returns an error if the pin cannot be driven.
    pub fn new(pin: P) -> Result<Self> {
        let mut ret = Self { pin, lit: false };
        ret.off()?;

        Ok(ret)
    }

    /// # Errors
    /// Returns an error if the pin cannot be driven.
    pub fn on(&mut self) -> Result<()> {
        self.pin
            .set_high()
            .map_err(|e| anyhow!("Headlight pin error: {:?}", e))?;
        self.lit = true;

        Ok(())
    }

    /// # Errors
    /// Returns an error if the pin cannot be driven.
    pub fn off(&mut self) -> Result<()> {
        self.pin
            .set_low()
            .map_err(|e| anyhow!("Headlight pin error: {:?}", e))?;
        self.lit = false;

        Ok(())
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.lit
    }
}

/// Output level of the tail lights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Brightness {
    Off,
    Dim,
    Bright,
    /// Attention pattern: PWM bypassed, channels fully on.
    Full,
}

/// Two tail light LEDs on PWM channels sharing one timer.
///
/// # Type Parameters
/// * `L` - Left channel.
/// * `R` - Right channel.
pub struct Taillights<L, R>
where
    L: PwmPin<Duty = u32>,
    R: PwmPin<Duty = u32>,
{
    left: L,
    right: R,
    brightness: Brightness,
}

impl<L, R> Taillights<L, R>
where
    L: PwmPin<Duty = u32>,
    R: PwmPin<Duty = u32>,
{
    /// Creates a new `Taillights` instance with both channels off.
    #[must_use]
    pub fn new(left: L, right: R) -> Self {
        let mut ret = Self {
            left,
            right,
            brightness: Brightness::Off,
        };
        ret.apply();

        ret
    }

    /// Pushes the current brightness to both channels.
    fn apply(&mut self) {
        let duty = match self.brightness {
            Brightness::Off => None,
            Brightness::Dim => Some(DIM_DUTY),
            Brightness::Bright => Some(BRIGHT_DUTY),
            Brightness::Full => Some(DUTY_SCALE),
        };

        match duty {
            Some(duty) => {
                let left = scaled(self.left.get_max_duty(), duty);
                let right = scaled(self.right.get_max_duty(), duty);
                self.left.set_duty(left);
                self.right.set_duty(right);
                self.left.enable();
                self.right.enable();
            }
            None => {
                self.left.set_duty(0);
                self.right.set_duty(0);
                self.left.disable();
                self.right.disable();
            }
        }
    }

    fn set(&mut self, brightness: Brightness) {
        self.brightness = brightness;

        self.apply();
    }

    pub fn bright(&mut self) {
        self.set(Brightness::Bright);
    }

    pub fn dim(&mut self) {
        self.set(Brightness::Dim);
    }

    pub fn off(&mut self) {
        self.set(Brightness::Off);
    }

    pub fn full(&mut self) {
        self.set(Brightness::Full);
    }

    #[must_use]
    pub fn brightness(&self) -> Brightness {
        self.brightness
    }
}
