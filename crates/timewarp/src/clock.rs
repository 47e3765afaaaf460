// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime};

use crate::linear::duration_to_nanos;
use crate::registry::TimerRegistry;
use crate::schedule::Schedule;
use crate::{Error, Linear, Result, Timer, TimerId};

/// The snooze reported when no live timer is pending, unless configured otherwise.
pub const DEFAULT_FALLBACK_SNOOZE: Duration = Duration::from_secs(60 * 60);

/// The outcome of moving a [`Clock`] to a new virtual time. See [`Clock::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ramifications {
    /// The timers that elapsed, in the order in which they elapsed.
    ///
    /// Repeating timers are listed once per elapsed period.
    pub elapsed: Vec<TimerId>,

    /// How long to wait, in reference time, before the clock should be advanced again.
    pub snooze: Duration,
}

/// A virtual clock on top of a reference clock, with timers.
///
/// By default the clock follows its reference, but it can change speed, stop, or jump
/// back or forward. At any given time, virtual time is a [`Linear`] function of reference
/// time. The clock never reads the reference clock or sleeps by itself: callers pass in
/// reference or virtual time points, and wait for the returned snooze durations using
/// whatever timer facility they have.
///
/// Timers are expressed in virtual time. After moving the clock with [`Clock::advance`],
/// you find out which timers elapsed and how long to wait (in reference time) until the
/// next one is due.
///
/// # Timer ownership
///
/// The clock stores registered timers and hands out [`TimerId`] handles. A timer stays
/// registered until [`Clock::remove`] is called; a handle to a removed timer is never
/// reported again and never aliases another timer.
///
/// # Threading
///
/// The clock is a plain value mutated through `&mut self`. It does no locking; share it
/// across threads by wrapping it in a mutex or by driving it from one owning thread.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use timewarp::{Clock, Timer};
///
/// let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_707_645_600);
/// let mut clock = Clock::new();
///
/// let (tea, snooze) = clock.schedule(start, Timer::once(Duration::from_secs(180)))?;
/// assert_eq!(snooze, Duration::from_secs(180));
///
/// // Fast-forward: everything runs twice as fast from now on.
/// clock.set_speed(start, 2.0)?;
///
/// let now = clock.at(start + Duration::from_secs(90))?;
/// let ramifications = clock.advance(now);
/// assert_eq!(ramifications.elapsed, vec![tea]);
/// # Ok::<(), timewarp::Error>(())
/// ```
#[derive(Debug)]
pub struct Clock {
    transform: Linear,
    timers: TimerRegistry,
    schedule: Schedule,
    fallback_snooze: Duration,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Creates a clock that follows the reference clock and has no timers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transform: Linear::default(),
            timers: TimerRegistry::default(),
            schedule: Schedule::default(),
            fallback_snooze: DEFAULT_FALLBACK_SNOOZE,
        }
    }

    /// Sets the snooze reported when no live timer is pending, or when the clock is
    /// stopped or running backward so that no timer can be reached.
    ///
    /// Defaults to [`DEFAULT_FALLBACK_SNOOZE`] (one hour).
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, SystemTime};
    ///
    /// use timewarp::Clock;
    ///
    /// let mut clock = Clock::new().fallback_snooze(Duration::from_secs(5));
    /// assert_eq!(clock.advance(SystemTime::now()).snooze, Duration::from_secs(5));
    /// ```
    #[must_use]
    pub fn fallback_snooze(mut self, snooze: Duration) -> Self {
        self.fallback_snooze = snooze;
        self
    }

    /// Starts the clock with the given transform instead of following the reference.
    #[must_use]
    pub fn with_transform(mut self, transform: Linear) -> Self {
        self.transform = transform;
        self
    }

    /// The current reference-to-virtual transform.
    #[must_use]
    pub const fn transform(&self) -> Linear {
        self.transform
    }

    /// The current speed of virtual time relative to the reference clock.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.transform.speed()
    }

    /// Changes the clock so that what is virtual time `a` now becomes virtual time `b`, and
    /// changes its speed to `speed` (0 for a stopped clock, 1 for normal speed and so on).
    ///
    /// The `a -> b` change is relative to the current clock, not to the reference clock.
    /// The speed, however, is absolute: setting 2 twice doesn't make the speed 4 times the
    /// reference. Neither `a` nor `b` has to be current time; they only form a duration.
    ///
    /// Timers already on the schedule keep their virtual deadlines.
    ///
    /// Note that the speed applies to the whole reference time line, so changing only the
    /// speed also moves the current virtual time. Use [`Clock::set_speed`] to change speed
    /// without a jump.
    pub fn change(&mut self, a: SystemTime, b: SystemTime, speed: f64) {
        self.transform = self.transform.compose(a, b, speed);
        self.emit_change();
    }

    /// Changes the speed while keeping the virtual time at `reference` where it is.
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual time at `reference` is out of range, under either
    /// the current or the new speed.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, SystemTime};
    ///
    /// use timewarp::Clock;
    ///
    /// let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_707_645_600);
    /// let mut clock = Clock::new();
    ///
    /// clock.set_speed(now, 2.0)?;
    ///
    /// assert_eq!(clock.at(now)?, now);
    /// assert_eq!(clock.at(now + Duration::from_secs(60))?, now + Duration::from_secs(120));
    /// # Ok::<(), timewarp::Error>(())
    /// ```
    pub fn set_speed(&mut self, reference: SystemTime, speed: f64) -> Result<()> {
        let b = self.transform.at(reference)?;
        let a = self.transform.shifted(0, speed).at(reference)?;

        self.change(a, b, speed);
        Ok(())
    }

    /// Stops virtual time at its value at `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual time at `reference` is out of range.
    pub fn pause(&mut self, reference: SystemTime) -> Result<()> {
        self.set_speed(reference, 0.0)
    }

    /// Lets virtual time run at normal speed from its value at `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual time at `reference` is out of range.
    pub fn resume(&mut self, reference: SystemTime) -> Result<()> {
        self.set_speed(reference, 1.0)
    }

    /// Moves virtual time forward by `by`, keeping the speed.
    pub fn jump_forward(&mut self, by: Duration) {
        self.transform = self.transform.shifted(duration_to_nanos(by), self.speed());
        self.emit_change();
    }

    /// Moves virtual time backward by `by`, keeping the speed.
    pub fn jump_backward(&mut self, by: Duration) {
        self.transform = self.transform.shifted(-duration_to_nanos(by), self.speed());
        self.emit_change();
    }

    /// Translates reference time to virtual time.
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual time cannot be represented as a [`SystemTime`].
    pub fn at(&self, reference: SystemTime) -> Result<SystemTime> {
        self.transform.at(reference)
    }

    /// Registers a timer with the clock without scheduling it.
    ///
    /// The timer is scheduled by [`Clock::add`], possibly several times.
    pub fn register(&mut self, timer: Timer) -> TimerId {
        self.timers.register(timer)
    }

    /// Returns the registered timer, or `None` if it has been removed.
    #[must_use]
    pub fn timer(&self, id: TimerId) -> Option<&Timer> {
        self.timers.get(id)
    }

    /// Cancels a timer.
    ///
    /// The timer's occurrences stay on the schedule until they are consumed by
    /// [`Clock::advance`], but they are no longer reported and the timer no longer repeats.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not registered.
    pub fn cancel(&mut self, id: TimerId) -> Result<()> {
        self.timers.get_mut(id).ok_or(Error::unknown_timer(id))?.cancel();
        Ok(())
    }

    /// Assuming virtual time is now `now`, schedules a registered timer.
    ///
    /// Timers are expressed as a duration, so a 30 min timer added at 10:00 elapses at
    /// 10:30. A repeating one would elapse at 10:30, 11:00, 11:30 and so on, unless
    /// cancelled. A timer can be added several times; each addition is a separate
    /// occurrence on the schedule.
    ///
    /// Returns a snooze just like [`Clock::advance`] does, measured to the earliest
    /// occurrence on the whole schedule, since the new timer may elapse before any already
    /// scheduled. The snooze is zero if that occurrence is already due.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer is not registered, or if its deadline is out of range.
    pub fn add(&mut self, now: SystemTime, id: TimerId) -> Result<Duration> {
        let delay = self.timers.get(id).ok_or(Error::unknown_timer(id))?.delay();
        let when = now
            .checked_add(delay)
            .ok_or_else(|| Error::out_of_range("timer deadline is out of the range of SystemTime"))?;

        self.schedule.insert(when, id);

        Ok(self
            .schedule
            .first()
            .map_or(Duration::ZERO, |(head, _)| self.snooze_until(now, head.tick())))
    }

    /// Registers and schedules a timer in one go. See [`Clock::add`].
    ///
    /// # Errors
    ///
    /// Returns an error if the timer's deadline is out of range; the timer is not
    /// registered in that case.
    pub fn schedule(&mut self, now: SystemTime, timer: Timer) -> Result<(TimerId, Duration)> {
        let id = self.register(timer);

        match self.add(now, id) {
            Ok(snooze) => Ok((id, snooze)),
            Err(e) => {
                self.timers.remove(id);
                Err(e)
            }
        }
    }

    /// Removes a timer from the clock, including all its occurrences on the schedule.
    ///
    /// Not quite the same thing as cancelling it: the handle becomes invalid and the timer
    /// is handed back. Returns `None` if the timer was not registered.
    pub fn remove(&mut self, id: TimerId) -> Option<Timer> {
        let timer = self.timers.remove(id)?;
        self.emit_remove(id);
        Some(timer)
    }

    /// Moves the clock to virtual time `t`.
    ///
    /// This doesn't really change time. It consumes and returns the timers which elapsed
    /// at or before `t`, schedules further occurrences of repeating timers, and tells the
    /// caller how long to wait (in reference time) until the next timer is due.
    ///
    /// - The elapsed timers are sorted by time; same-time timers in the order they were added.
    /// - Cancelled and removed timers are absent, but their occurrences are consumed.
    /// - Repeating timers may be present multiple times. A once-a-day timer is listed
    ///   ~365 times if time moves forward a year.
    /// - Moving backward doesn't make any timers elapse. There are no timers in the past,
    ///   since timers are consumed by moving forward past them.
    /// - Cancelling a timer after it is reported only affects later calls.
    pub fn advance(&mut self, t: SystemTime) -> Ramifications {
        self.expand_repeating(t);

        let snooze = self
            .schedule
            .after(t)
            .find(|(_, id)| self.timers.is_active(**id))
            .map_or(self.fallback_snooze, |(key, _)| self.snooze_until(t, key.tick()));

        let elapsed: Vec<TimerId> = self
            .schedule
            .split_off_up_to(t)
            .into_values()
            .filter(|id| self.timers.is_active(*id))
            .collect();

        debug_assert!(
            self.schedule.first().is_none_or(|(key, _)| key.tick() > t),
            "every occurrence at or before the new time must be consumed"
        );

        let ramifications = Ramifications { elapsed, snooze };
        self.emit_advance(t, &ramifications);
        ramifications
    }

    /// Moves the clock to the virtual time corresponding to `reference`. See [`Clock::advance`].
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual time cannot be represented as a [`SystemTime`].
    pub fn advance_from_reference(&mut self, reference: SystemTime) -> Result<Ramifications> {
        let t = self.at(reference)?;
        Ok(self.advance(t))
    }

    /// The virtual time at which the next live, non-cancelled timer elapses.
    #[must_use]
    pub fn next_deadline(&self) -> Option<SystemTime> {
        self.schedule
            .iter()
            .find(|(_, id)| self.timers.is_active(**id))
            .map(|(key, _)| key.tick())
    }

    /// The number of occurrences on the schedule, including those of cancelled and removed
    /// timers that have not been consumed yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.schedule.len()
    }

    /// The number of registered timers.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.timers.len()
    }

    /// Schedules the occurrences of repeating timers up to and including the first one past `t`.
    #[cfg_attr(test, mutants::skip)] // Causes test timeout.
    fn expand_repeating(&mut self, t: SystemTime) {
        let due: Vec<(SystemTime, TimerId, Duration)> = self
            .schedule
            .up_to(t)
            .filter_map(|(key, id)| {
                let timer = self.timers.get(*id)?;
                (timer.is_repeating() && !timer.is_cancelled()).then(|| (key.tick(), *id, timer.delay()))
            })
            .collect();

        for (mut tick, id, period) in due {
            debug_assert!(!period.is_zero(), "repeating timers have a non-zero period");

            while tick <= t {
                let Some(next) = tick.checked_add(period) else {
                    break;
                };

                self.schedule.insert(next, id);
                tick = next;
            }
        }
    }

    /// Reference time until virtual time reaches `deadline`, starting from virtual time `now`.
    fn snooze_until(&self, now: SystemTime, deadline: SystemTime) -> Duration {
        let gap = deadline.duration_since(now).unwrap_or(Duration::ZERO);
        self.transform.unscale(gap).unwrap_or(self.fallback_snooze)
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(clippy::unused_self, reason = "unused when logs feature not used")
    )]
    fn emit_change(&self) {
        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "timewarp.change",
            tracing::Level::DEBUG,
            timewarp.speed = self.transform.speed(),
            timewarp.offset_nanos = %self.transform.offset_nanos(),
        );
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    fn emit_remove(&self, id: TimerId) {
        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "timewarp.remove",
            tracing::Level::TRACE,
            timewarp.timer = %id,
            timewarp.registered = self.timers.len(),
        );
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    fn emit_advance(&self, t: SystemTime, ramifications: &Ramifications) {
        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "timewarp.advance",
            tracing::Level::DEBUG,
            timewarp.now = ?t,
            timewarp.elapsed = ramifications.elapsed.len(),
            timewarp.snooze = ramifications.snooze.as_secs_f64(),
            timewarp.pending = self.schedule.len(),
        );
    }
}
