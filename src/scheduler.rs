use anyhow::Result;
use log::{info, warn};

use crate::{
    clock::Ticker,
    infra::{Actuator, Poller},
    logic::{StateMachine, Trigger},
    message::{Dispatcher, Level},
};

/// Cycles between two health reports from `run`.
const REPORT_EVERY: u64 = 30_000;

/// The cooperative main loop: poll the inputs, then run one step.
///
/// # Type Parameters
/// * `B` - The button poller.
/// * `M` - The motion monitor.
/// * `A` - The actuator driven by the state machine.
pub struct Scheduler<B, M, A>
where
    B: Poller,
    M: Poller,
    A: Actuator,
{
    button: B,
    motion: M,
    machine: StateMachine<A>,
    dispatcher: Dispatcher<Trigger>,
    brakes: Level,
    ticker: Ticker,
    cycles: u64,
    failures: u64,
}

impl<B, M, A> Scheduler<B, M, A>
where
    B: Poller,
    M: Poller,
    A: Actuator,
{
    /// Creates a new `Scheduler` and enters the state machine.
    ///
    /// # Arguments
    /// * `button` - Sampled once per cycle.
    /// * `motion` - Polled once per cycle, after the button.
    /// * `machine` - The state machine, not yet entered.
    /// * `dispatcher` - The mailbox both inputs notify.
    /// * `brakes` - The brake level written by the motion monitor.
    /// * `ticker` - Paces the loop at the sample period.
    ///
    /// # Errors
    /// Returns an error if entering the state machine fails.
    pub fn new(
        button: B,
        motion: M,
        machine: StateMachine<A>,
        dispatcher: Dispatcher<Trigger>,
        brakes: Level,
        ticker: Ticker,
    ) -> Result<Self> {
        let mut machine = machine;
        machine.enter()?;

        Ok(Self {
            button,
            motion,
            machine,
            dispatcher,
            brakes,
            ticker,
            cycles: 0,
            failures: 0,
        })
    }

    /// Runs one cycle without waiting for the tick.
    ///
    /// Input failures are logged and the cycle carries on with whatever was
    /// published. An actuator failure was already logged by the machine; it
    /// is counted here and never stops the loop.
    pub fn cycle(&mut self) {
        if let Err(e) = self.button.poll() {
            warn!("Button poll failed: {:#}", e);
        }
        if let Err(e) = self.motion.poll() {
            warn!("Motion poll failed: {:#}", e);
        }

        let triggers = self.dispatcher.collect();
        if !triggers.is_empty() {
            info!("Triggers: {:?}, state: {:?}", triggers, self.machine.state());
        }
        self.machine.handle_triggers(&triggers);
        self.machine.set_brakes_on(self.brakes.get());

        if self.machine.run_cycle().is_err() {
            self.failures += 1;
        }
        self.cycles += 1;
    }

    /// Runs forever at the ticker's period.
    pub fn run(&mut self) -> ! {
        info!(
            "Scheduler running, sample period {:?}",
            self.ticker.period()
        );

        loop {
            self.ticker.wait();
            self.cycle();

            if self.cycles % REPORT_EVERY == 0 {
                self.report();
            }
        }
    }

    /// Logs the loop's health counters.
    pub fn report(&self) {
        info!(
            "{} cycles, {} failed steps, {} overruns, state: {:?}",
            self.cycles,
            self.failures,
            self.ticker.overruns(),
            self.machine.state()
        );
    }

    #[must_use]
    pub fn machine(&self) -> &StateMachine<A> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut StateMachine<A> {
        &mut self.machine
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Number of cycles whose step reported an actuator failure.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Ticks that started late.
    #[must_use]
    pub fn overruns(&self) -> u64 {
        self.ticker.overruns()
    }
}
