// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(
    test,
    allow(
        clippy::arithmetic_side_effects,
        clippy::unchecked_time_subtraction,
        clippy::float_cmp,
        reason = "allow these lints in tests to improve the readability of the tests"
    )
)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A virtual clock with timers, decoupled from any operating-system clock or timer facility.
//!
//! The [`Clock`] runs a program's notion of "now" at an arbitrary speed, pauses it, or jumps it
//! forward and backward relative to a reference clock. It tracks a set of one-shot and
//! repeating [`Timer`]s expressed in that virtual time, and tells you which timers elapsed
//! when you move it to a new time.
//!
//! # Quick Start
//!
//! ```
//! use std::time::{Duration, SystemTime};
//!
//! use timewarp::{Clock, Timer};
//!
//! let ten = SystemTime::UNIX_EPOCH + Duration::from_secs(1_707_645_600);
//! let minutes = |n: u64| Duration::from_secs(n * 60);
//!
//! let mut clock = Clock::new();
//! let (alarm, _) = clock.schedule(ten, Timer::repeating(minutes(10))?)?;
//! let (kettle, _) = clock.schedule(ten, Timer::once(minutes(15)))?;
//!
//! // Jump straight to 10:20.
//! let ramifications = clock.advance(ten + minutes(20));
//!
//! assert_eq!(ramifications.elapsed, vec![alarm, kettle, alarm]);
//! // The alarm rings again at 10:30.
//! assert_eq!(ramifications.snooze, minutes(10));
//! # Ok::<(), timewarp::Error>(())
//! ```
//!
//! # Overview
//!
//! - [`Clock`] - Holds the pending timers, converts reference time into virtual time, and
//!   reports elapsed timers via [`Clock::advance`].
//! - [`Linear`] - The reference-to-virtual transform, `f(x) = kx + m`.
//! - [`Timer`] - A one-shot or repeating timer, expressed as a duration in virtual time.
//! - [`TimerId`] - A handle to a timer registered with a clock.
//! - [`Ramifications`] - The timers that elapsed, and how long to wait until the next one.
//! - [`Error`] - Represents an error that can occur when working with the clock.
//!
//! # Reference time and virtual time
//!
//! The clock never reads a system clock and never sleeps. Callers sample their reference
//! clock (e.g. [`SystemTime::now`][std::time::SystemTime::now]), translate it with
//! [`Clock::at`], push the result into [`Clock::advance`], and then wait for the returned
//! snooze using their own timer facility. This keeps the clock deterministic and easy to test.
//!
//! The speed is a floating-point number, so translation between reference and virtual time
//! is approximate for speeds other than 1. See [`Linear`] for details.
//!
//! # Features
//!
//! - **`logs`** - Emits [`tracing`](https://docs.rs/tracing) events when the clock changes,
//!   advances, or drops a timer.

mod clock;
mod error;
mod linear;
mod registry;
mod schedule;
#[cfg(test)]
mod testing;
mod timer;

pub use clock::{Clock, DEFAULT_FALLBACK_SNOOZE, Ramifications};
pub use error::{Error, Result};
pub use linear::Linear;
pub use timer::{Timer, TimerId};
