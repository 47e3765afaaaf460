// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::time::Duration;

use crate::{Error, Result};

/// A timer, expressed as a duration in virtual time.
///
/// A timer added to a [`Clock`][crate::Clock] at virtual time `t` elapses at `t + delay`.
/// A repeating timer keeps elapsing every `delay` after that, until it is cancelled or removed.
///
/// Timers are not `Clone`: once registered with a clock, a timer's identity is the
/// [`TimerId`] handed out by [`Clock::register`][crate::Clock::register].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use timewarp::Timer;
///
/// let mut tea = Timer::once(Duration::from_secs(180));
/// assert!(!tea.is_repeating());
///
/// tea.cancel();
/// assert!(tea.is_cancelled());
///
/// let heartbeat = Timer::repeating(Duration::from_secs(10))?;
/// assert!(heartbeat.is_repeating());
/// # Ok::<(), timewarp::Error>(())
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Timer {
    delay: Duration,
    repeat: bool,
    cancelled: bool,
}

impl Timer {
    /// Creates a one-shot timer that elapses `delay` after it is added.
    ///
    /// A zero delay is allowed; such a timer elapses at the instant it is added.
    #[must_use]
    pub const fn once(delay: Duration) -> Self {
        Self {
            delay,
            repeat: false,
            cancelled: false,
        }
    }

    /// Creates a timer that elapses every `period`, starting `period` after it is added.
    ///
    /// # Errors
    ///
    /// Returns an error if `period` is zero.
    pub fn repeating(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::zero_period());
        }

        Ok(Self {
            delay: period,
            repeat: true,
            cancelled: false,
        })
    }

    /// The delay until the first elapse, which is also the period of a repeating timer.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether the timer elapses again every [`Timer::delay`] after its first elapse.
    #[must_use]
    pub const fn is_repeating(&self) -> bool {
        self.repeat
    }

    /// Whether [`Timer::cancel`] has been called.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Cancels the timer.
    ///
    /// A cancelled timer stays on the schedule, but it is no longer reported as
    /// elapsed and does not repeat. Cancelling twice has no further effect.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// A handle to a timer registered with a [`Clock`][crate::Clock].
///
/// Handles are never reused: once a timer is removed, its handle stays invalid even if
/// the storage slot is later given to another timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId {
    index: usize,
    epoch: u64,
}

impl TimerId {
    pub(crate) const fn new(index: usize, epoch: u64) -> Self {
        Self { index, epoch }
    }

    pub(crate) const fn index(self) -> usize {
        self.index
    }

    pub(crate) const fn epoch(self) -> u64 {
        self.epoch
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.epoch)
    }
}
