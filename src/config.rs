use anyhow::{anyhow, bail, Result};
use std::{fmt::Display, str::FromStr, time::Duration};

const DEFAULT_SAMPLE_PERIOD_MS: u64 = 2;
const DEFAULT_DEBOUNCE_SAMPLES: u32 = 12;
const DEFAULT_LONG_PRESS_RUN: u32 = 32;
const DEFAULT_LONG_PRESS_RUNS: u32 = 32;
const DEFAULT_ERROR_HOLD_MS: u64 = 2000;

/// Width of the raw button sample register.
pub const SAMPLE_REGISTER_BITS: u32 = u16::BITS;
/// Width of the long-press run register.
pub const RUN_REGISTER_BITS: u32 = u32::BITS;

/// Timing knobs of the controller.
///
/// # Fields
/// * `sample_period_ms` - Period of the button sample clock.
/// * `debounce_samples` - Consecutive identical samples needed to accept a
///   press or a release.
/// * `long_press_run` - Length of one all-pressed run.
/// * `long_press_runs` - Number of completed runs that make a long press.
/// * `error_hold_ms` - How long the fail-safe light pattern is held.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    sample_period_ms: u64,
    debounce_samples: u32,
    long_press_run: u32,
    long_press_runs: u32,
    error_hold_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
            debounce_samples: DEFAULT_DEBOUNCE_SAMPLES,
            long_press_run: DEFAULT_LONG_PRESS_RUN,
            long_press_runs: DEFAULT_LONG_PRESS_RUNS,
            error_hold_ms: DEFAULT_ERROR_HOLD_MS,
        }
    }
}

fn parse<T>(name: &str, value: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value.map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value {raw:?} for {name}: {e}"))
    })
}

impl Config {
    /// Creates a validated `Config`.
    ///
    /// # Errors
    /// Returns an error if any value is out of range, see [`Config::validate`].
    pub fn new(
        sample_period_ms: u64,
        debounce_samples: u32,
        long_press_run: u32,
        long_press_runs: u32,
        error_hold_ms: u64,
    ) -> Result<Self> {
        let config = Self {
            sample_period_ms,
            debounce_samples,
            long_press_run,
            long_press_runs,
            error_hold_ms,
        };
        config.validate()?;

        Ok(config)
    }

    /// Creates a `Config` from compile-time environment variables.
    ///
    /// Reads `DERBY_SAMPLE_PERIOD_MS`, `DERBY_DEBOUNCE_SAMPLES`,
    /// `DERBY_LONG_PRESS_RUN`, `DERBY_LONG_PRESS_RUNS` and
    /// `DERBY_ERROR_HOLD_MS` via `option_env!`; unset variables keep their
    /// defaults.
    ///
    /// # Errors
    /// Returns an error if a variable does not parse or is out of range.
    pub fn from_env() -> Result<Self> {
        Self::new(
            parse(
                "DERBY_SAMPLE_PERIOD_MS",
                option_env!("DERBY_SAMPLE_PERIOD_MS"),
                DEFAULT_SAMPLE_PERIOD_MS,
            )?,
            parse(
                "DERBY_DEBOUNCE_SAMPLES",
                option_env!("DERBY_DEBOUNCE_SAMPLES"),
                DEFAULT_DEBOUNCE_SAMPLES,
            )?,
            parse(
                "DERBY_LONG_PRESS_RUN",
                option_env!("DERBY_LONG_PRESS_RUN"),
                DEFAULT_LONG_PRESS_RUN,
            )?,
            parse(
                "DERBY_LONG_PRESS_RUNS",
                option_env!("DERBY_LONG_PRESS_RUNS"),
                DEFAULT_LONG_PRESS_RUNS,
            )?,
            parse(
                "DERBY_ERROR_HOLD_MS",
                option_env!("DERBY_ERROR_HOLD_MS"),
                DEFAULT_ERROR_HOLD_MS,
            )?,
        )
    }

    /// Checks that every value fits the registers it configures.
    ///
    /// # Errors
    /// Returns an error if the sample period is zero, if `debounce_samples`
    /// is not in `1..=16`, if `long_press_run` is not in `1..=32` or if
    /// `long_press_runs` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.sample_period_ms == 0 {
            bail!("Sample period must be at least 1 ms");
        }
        if !(1..=SAMPLE_REGISTER_BITS).contains(&self.debounce_samples) {
            bail!(
                "Debounce samples must be within 1..={SAMPLE_REGISTER_BITS}, got {}",
                self.debounce_samples
            );
        }
        if !(1..=RUN_REGISTER_BITS).contains(&self.long_press_run) {
            bail!(
                "Long press run must be within 1..={RUN_REGISTER_BITS}, got {}",
                self.long_press_run
            );
        }
        if self.long_press_runs == 0 {
            bail!("Long press needs at least one run");
        }

        Ok(())
    }

    #[must_use]
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    #[must_use]
    pub fn debounce_samples(&self) -> u32 {
        self.debounce_samples
    }

    #[must_use]
    pub fn long_press_run(&self) -> u32 {
        self.long_press_run
    }

    #[must_use]
    pub fn long_press_runs(&self) -> u32 {
        self.long_press_runs
    }

    /// Number of samples a press must be held, after it was accepted, before
    /// it counts as a long press.
    #[must_use]
    pub fn long_press_samples(&self) -> u32 {
        self.long_press_run.saturating_mul(self.long_press_runs)
    }

    #[must_use]
    pub fn error_hold(&self) -> Duration {
        Duration::from_millis(self.error_hold_ms)
    }
}
