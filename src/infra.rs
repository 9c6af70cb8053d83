use anyhow::Result;

macro_rules! func {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);

        match &name[..name.len() - 3].rfind(':') {
            Some(pos) => &name[pos + 1..name.len() - 3],
            None => &name[..name.len() - 3],
        }
    }};
}
pub(crate) use func;

macro_rules! trace_func {
    () => {
        log::debug!("{}", $crate::infra::func!())
    };
}
pub(crate) use trace_func;

/// A trait representing an input source sampled once per scheduler cycle.
///
/// # Errors
/// This trait's `poll` method returns an error if the underlying hardware
/// cannot be read.
pub trait Poller {
    /// Samples the input once and publishes whatever it observed.
    ///
    /// # Errors
    /// Returns an error if the polling operation fails.
    fn poll(&mut self) -> Result<()>;
}

/// The outputs driven by the state machine.
///
/// Every call happens from inside a run-to-completion step, so
/// implementations must never call back into the state machine and should
/// return as quickly as the hardware allows.
pub trait Actuator {
    /// Powers up the motion sensor and the tail light PWM.
    ///
    /// # Errors
    /// Returns an error if the sensor or the lights cannot be driven.
    fn start_car(&mut self) -> Result<()>;

    /// Powers down the motion sensor and turns every light off.
    ///
    /// # Errors
    /// Returns an error if the sensor or the lights cannot be driven.
    fn stop_car(&mut self) -> Result<()>;

    /// # Errors
    /// Returns an error if the headlight pin cannot be driven.
    fn headlights_on(&mut self) -> Result<()>;

    /// # Errors
    /// Returns an error if the headlight pin cannot be driven.
    fn headlights_off(&mut self) -> Result<()>;

    /// Brake pattern: tail lights at high duty.
    ///
    /// # Errors
    /// Returns an error if the tail lights cannot be driven.
    fn taillights_bright(&mut self) -> Result<()>;

    /// Running pattern: tail lights at low duty.
    ///
    /// # Errors
    /// Returns an error if the tail lights cannot be driven.
    fn taillights_dim(&mut self) -> Result<()>;

    /// # Errors
    /// Returns an error if the tail lights cannot be driven.
    fn taillights_off(&mut self) -> Result<()>;

    /// Asks the platform to suspend until the next wake stimulus.
    ///
    /// Must return once a new event is pending; may return immediately.
    ///
    /// # Errors
    /// Returns an error if the platform fails to enter or leave sleep.
    fn wait_for_interrupt(&mut self) -> Result<()>;

    /// Runs the fail-safe sequence: reconfigure the sensor, force the
    /// attention light pattern, then hold it for a fixed time.
    ///
    /// # Errors
    /// Returns an error if any part of the sequence cannot be driven.
    fn handle_error(&mut self) -> Result<()>;
}
