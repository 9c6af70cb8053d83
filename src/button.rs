use anyhow::{anyhow, Result};
use embedded_hal::digital::v2::InputPin;
use log::debug;
use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    config::{Config, RUN_REGISTER_BITS, SAMPLE_REGISTER_BITS},
    infra::Poller,
    message::{Notifier, Trigger},
};

/// Events produced by the classifier, at most one per press/release cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEvent {
    Click,
    LongPress,
}

/// Debounces raw button samples and tells clicks from long presses.
///
/// Every sample is shifted into a 16 bit history. A press is accepted once
/// the last `debounce_samples` samples are all pressed, a release once they
/// are all released. While the press is held, a second register counts
/// all-pressed runs; enough completed runs latch a long press, which
/// suppresses the click on release.
#[derive(Clone, Debug)]
pub struct Classifier {
    samples: u16,
    run: u32,
    runs: u32,
    pressed: bool,
    long_pressed: bool,
    debounce_mask: u16,
    run_mask: u32,
    long_press_runs: u32,
}

impl Classifier {
    /// Creates a new `Classifier` with an empty history.
    ///
    /// # Arguments
    /// * `config` - Provides the debounce width and the long-press threshold.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let debounce_mask = if config.debounce_samples() >= SAMPLE_REGISTER_BITS {
            u16::MAX
        } else {
            (1_u16 << config.debounce_samples()) - 1
        };
        let run_mask = if config.long_press_run() >= RUN_REGISTER_BITS {
            u32::MAX
        } else {
            (1_u32 << config.long_press_run()) - 1
        };

        Self {
            samples: 0,
            run: 0,
            runs: 0,
            pressed: false,
            long_pressed: false,
            debounce_mask,
            run_mask,
            long_press_runs: config.long_press_runs(),
        }
    }

    /// Feeds one raw sample.
    ///
    /// # Arguments
    /// * `raw_pressed` - `true` if the pin reads as pressed on this tick.
    ///
    /// # Returns
    /// The event completed by this sample, if any.
    pub fn sample(&mut self, raw_pressed: bool) -> Option<ButtonEvent> {
        self.samples = (self.samples << 1) | u16::from(raw_pressed);
        let window = self.samples & self.debounce_mask;

        if !self.pressed {
            if window == self.debounce_mask {
                self.pressed = true;
            }
            return None;
        }

        if window == 0 {
            return self.release();
        }

        if self.long_pressed {
            return None;
        }

        self.run = (self.run << 1) | 1;
        if self.run & self.run_mask != self.run_mask {
            return None;
        }

        self.run = 0;
        self.runs += 1;
        if self.runs == self.long_press_runs {
            self.long_pressed = true;
            return Some(ButtonEvent::LongPress);
        }

        None
    }

    fn release(&mut self) -> Option<ButtonEvent> {
        let long_pressed = self.long_pressed;

        self.pressed = false;
        self.long_pressed = false;
        self.run = 0;
        self.runs = 0;

        (!long_pressed).then_some(ButtonEvent::Click)
    }

    /// Whether a debounced press is currently held.
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Whether the whole sample history reads released.
    ///
    /// Anything else means a press may be in progress or still settling.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.samples == 0
    }
}

/// Publishes whether the button is quiet, for the code deciding to sleep.
///
/// Written only by the button, read only by the actuator.
#[derive(Clone, Debug)]
pub struct ButtonActivity {
    idle: Arc<AtomicBool>,
}

impl Default for ButtonActivity {
    fn default() -> Self {
        Self {
            idle: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl ButtonActivity {
    pub(crate) fn set_idle(&self, idle: bool) {
        self.idle.store(idle, Ordering::Release);
    }

    /// `true` if no press is in progress or settling.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.idle.load(Ordering::Acquire)
    }
}

/// An active-low push button sampled from a GPIO pin.
///
/// # Type Parameters
/// * `P` - The input pin.
/// * `T` - The trigger type implementing the `Trigger` trait.
pub struct Button<P, T>
where
    P: InputPin,
    T: Trigger,
{
    notifier: Notifier<T>,
    click: &'static T,
    long_press: &'static T,
    pin: P,
    classifier: Classifier,
    activity: ButtonActivity,
}

impl<P, T> Button<P, T>
where
    P: InputPin,
    P::Error: Debug,
    T: Trigger,
{
    /// Creates a new `Button` instance.
    ///
    /// # Arguments
    /// * `notifier` - A notifier to send button events.
    /// * `click` - The trigger to emit on a click.
    /// * `long_press` - The trigger to emit on a long press.
    /// * `pin` - The input pin, low when pressed.
    /// * `activity` - Where to publish whether the button is quiet.
    /// * `config` - Debounce and long-press settings.
    ///
    /// # Returns
    /// A new `Button` instance.
    #[must_use]
    pub fn new(
        notifier: Notifier<T>,
        click: &'static T,
        long_press: &'static T,
        pin: P,
        activity: ButtonActivity,
        config: &Config,
    ) -> Self {
        Self {
            notifier,
            click,
            long_press,
            pin,
            classifier: Classifier::new(config),
            activity,
        }
    }

    /// Checks if the pin currently reads as pressed.
    ///
    /// # Errors
    /// Returns an error if the pin cannot be read.
    fn pressed(&self) -> Result<bool> {
        self.pin
            .is_low()
            .map_err(|e| anyhow!("Button pin read error: {:?}", e))
    }

    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

impl<P, T> Poller for Button<P, T>
where
    P: InputPin,
    P::Error: Debug,
    T: Trigger,
{
    /// Takes one sample and notifies on a completed click or long press.
    ///
    /// # Errors
    /// Returns an error if the pin cannot be read or the notifier fails.
    fn poll(&mut self) -> Result<()> {
        // Polled rather than interrupt driven: the sample clock is the only
        // time base the debounce has.
        let pressed = self.pressed()?;
        let event = self.classifier.sample(pressed);
        self.activity.set_idle(self.classifier.is_idle());

        match event {
            Some(ButtonEvent::Click) => {
                debug!("Button click");
                self.notifier.notify(self.click)
            }
            Some(ButtonEvent::LongPress) => {
                debug!("Button long press");
                self.notifier.notify(self.long_press)
            }
            None => Ok(()),
        }
    }
}
