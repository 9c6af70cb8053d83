use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::{with_timeout, Duration, Instant};
use futures_lite::future::block_on;
use std::sync::Arc;

fn ticks(duration: std::time::Duration) -> Duration {
    Duration::try_from(duration).unwrap_or(Duration::MAX)
}

/// Handle that aborts a pending [`Timeout::wait`].
#[derive(Clone, Default)]
pub struct CancelToken {
    signal: Arc<Signal<CriticalSectionRawMutex, ()>>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.signal.signal(());
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signal.signaled()
    }
}

/// A fixed-length wait that can be cancelled from another thread.
#[derive(Clone)]
pub struct Timeout {
    duration: Duration,
    token: CancelToken,
}

impl Timeout {
    /// Creates a new `Timeout` instance.
    ///
    /// # Arguments
    /// * `duration` - How long each call to `wait` blocks.
    #[must_use]
    pub fn new(duration: std::time::Duration) -> Self {
        Self {
            duration: ticks(duration),
            token: CancelToken::default(),
        }
    }

    /// Returns a token that cancels the current or the next `wait`.
    #[must_use]
    pub fn canceller(&self) -> CancelToken {
        self.token.clone()
    }

    /// Blocks until the timeout elapses or is cancelled.
    ///
    /// A cancellation is consumed by the wait it ends.
    ///
    /// # Returns
    /// `true` if the full duration elapsed, `false` if it was cancelled.
    pub fn wait(&self) -> bool {
        block_on(with_timeout(self.duration, self.token.signal.wait())).is_err()
    }
}

/// Paces the main loop at a fixed period.
///
/// A cycle that overruns its slot is counted and the schedule restarts from
/// now instead of firing the missed ticks back to back.
pub struct Ticker {
    period: Duration,
    ticker: embassy_time::Ticker,
    next: Instant,
    overruns: u64,
}

impl Ticker {
    /// Creates a new `Ticker` whose first tick is one period from now.
    ///
    /// # Arguments
    /// * `period` - Time between two ticks.
    #[must_use]
    pub fn new(period: std::time::Duration) -> Self {
        let period = ticks(period);

        Self {
            period,
            ticker: embassy_time::Ticker::every(period),
            next: Instant::now() + period,
            overruns: 0,
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks that were already late when `wait` was called.
    #[must_use]
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Blocks until the next tick.
    pub fn wait(&mut self) {
        if Instant::now() > self.next {
            self.overruns += 1;
            self.ticker.reset();
            self.next = Instant::now() + self.period;
        }

        block_on(self.ticker.next());
        self.next += self.period;
    }
}
