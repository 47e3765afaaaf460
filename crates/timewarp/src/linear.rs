// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{Error, Result};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// A linear function of time, `f(x) = kx + m`.
///
/// `Linear` maps reference time to virtual time. The slope `k` is the speed of virtual
/// time relative to the reference (0 for a stopped clock, 1 for normal speed, 2 for double
/// speed and so on), and the offset `m` is a signed virtual-time duration.
///
/// A transform is never changed in place. [`Linear::compose`] derives the next transform
/// from the current one: offsets accumulate, while the speed is always absolute.
///
/// # Precision
///
/// The speed is an `f64`, so evaluation rounds. Time points are handled as nanoseconds since
/// the UNIX epoch; the error grows with the magnitude of the reference time and with
/// `|k - 1|`, and speed changes compose the error of each step. At speed 1 evaluation is exact.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use timewarp::Linear;
///
/// let noon = SystemTime::UNIX_EPOCH + Duration::from_secs(12 * 3600);
///
/// // Shift virtual time one hour ahead and make it run twice as fast.
/// let f = Linear::default().compose(noon, noon + Duration::from_secs(3600), 2.0);
///
/// assert_eq!(f.speed(), 2.0);
/// assert_eq!(f.scale(Duration::from_secs(60)), Duration::from_secs(120));
/// assert_eq!(f.unscale(Duration::from_secs(60)), Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linear {
    speed: f64,
    /// Offset in nanoseconds of virtual time.
    offset: i128,
}

impl Default for Linear {
    fn default() -> Self {
        Self { speed: 1.0, offset: 0 }
    }
}

impl Linear {
    /// Creates a transform that runs at `speed` and follows the reference otherwise.
    #[must_use]
    pub const fn with_speed(speed: f64) -> Self {
        Self { speed, offset: 0 }
    }

    /// Derives a new transform from this one: what is virtual time `a` now becomes virtual
    /// time `b`, and the speed becomes `speed`.
    ///
    /// The `a -> b` shift is relative to this transform, while the speed is absolute:
    /// composing with speed 2 twice yields speed 2, not 4. Neither `a` nor `b` needs to be
    /// the current time; only their difference matters.
    #[must_use]
    pub fn compose(&self, a: SystemTime, b: SystemTime, speed: f64) -> Self {
        self.shifted(nanos_since_epoch(b) - nanos_since_epoch(a), speed)
    }

    /// Derives a new transform with `delta` nanoseconds added to the offset.
    pub(crate) fn shifted(&self, delta: i128, speed: f64) -> Self {
        Self {
            speed,
            offset: self.offset.saturating_add(delta),
        }
    }

    /// The slope of the transform.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// The offset of the transform, in signed nanoseconds of virtual time.
    #[must_use]
    pub const fn offset_nanos(&self) -> i128 {
        self.offset
    }

    /// Maps a reference time point to virtual time.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be represented as a [`SystemTime`].
    pub fn at(&self, reference: SystemTime) -> Result<SystemTime> {
        let x = nanos_since_epoch(reference);

        // kx is evaluated as x + (k - 1)x so that the identity transform is exact.
        #[expect(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            reason = "the speed is a floating-point approximation by contract; the float-to-int cast saturates"
        )]
        let drift = ((self.speed - 1.0) * x as f64) as i128;

        x.checked_add(drift)
            .and_then(|v| v.checked_add(self.offset))
            .and_then(system_time_from_nanos)
            .ok_or_else(|| Error::out_of_range("virtual time is out of the range of SystemTime"))
    }

    /// Scales a reference-time interval into virtual time, i.e. `k * dt`.
    ///
    /// Intervals never become negative: a stopped or reversed transform yields zero.
    #[must_use]
    pub fn scale(&self, dt: Duration) -> Duration {
        if self.is_identity_speed() {
            return dt;
        }

        let v = dt.as_secs_f64() * self.speed;
        if v.is_nan() || v <= 0.0 {
            return Duration::ZERO;
        }

        Duration::try_from_secs_f64(v).unwrap_or(Duration::MAX)
    }

    /// Converts a virtual-time interval into the reference time it takes to elapse, i.e. `dt / k`.
    ///
    /// Returns `None` if virtual time never covers the interval, which is the case for a
    /// stopped or reversed transform, or when the result overflows [`Duration`].
    #[must_use]
    pub fn unscale(&self, dt: Duration) -> Option<Duration> {
        if self.is_identity_speed() {
            return Some(dt);
        }

        if !self.speed.is_finite() || self.speed <= 0.0 {
            return None;
        }

        Duration::try_from_secs_f64(dt.as_secs_f64() / self.speed).ok()
    }

    #[expect(clippy::float_cmp, reason = "only the exact identity speed takes the lossless path")]
    fn is_identity_speed(&self) -> bool {
        self.speed == 1.0
    }
}

/// Signed nanoseconds between the UNIX epoch and `time`.
pub(crate) fn nanos_since_epoch(time: SystemTime) -> i128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => duration_to_nanos(after),
        Err(before) => -duration_to_nanos(before.duration()),
    }
}

/// Signed nanoseconds of a duration; always fits, since `Duration` holds at most ~2^94 ns.
pub(crate) fn duration_to_nanos(dt: Duration) -> i128 {
    i128::try_from(dt.as_nanos()).unwrap_or(i128::MAX)
}

pub(crate) fn system_time_from_nanos(nanos: i128) -> Option<SystemTime> {
    let magnitude = duration_from_nanos(nanos.unsigned_abs())?;

    if nanos >= 0 {
        UNIX_EPOCH.checked_add(magnitude)
    } else {
        UNIX_EPOCH.checked_sub(magnitude)
    }
}

fn duration_from_nanos(nanos: u128) -> Option<Duration> {
    let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
    let subsec = u32::try_from(nanos % NANOS_PER_SEC).ok()?;

    Some(Duration::new(secs, subsec))
}
