use anyhow::Result;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Suspends the device until the next wake stimulus.
pub trait Sleeper {
    /// Enters low-power sleep. Returns once a wake source fired.
    ///
    /// # Errors
    /// Returns an error if the platform refuses to sleep.
    fn sleep(&mut self) -> Result<()>;
}

/// Arms and disarms the wake interrupts (motion sensor, serial activity).
///
/// The wake lines are level triggered: held low, they would fire again as
/// soon as the handler returns. The handler therefore only disarms the gate;
/// the main loop re-arms it right before the next sleep.
#[derive(Clone, Debug, Default)]
pub struct WakeGate {
    armed: Arc<AtomicBool>,
}

impl WakeGate {
    /// Enables the wake interrupts.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Interrupt handler for every wake source.
    pub fn on_wake(&self) {
        self.armed.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}
