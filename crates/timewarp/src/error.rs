// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt;

use crate::TimerId;

/// The result type for fallible operations that use the [`Error`] type of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur when working with a [`Clock`][crate::Clock].
///
/// Most clock operations are total and cannot fail. The ones that can fail do so when:
///
/// * A [`TimerId`] no longer refers to a registered timer.
/// * Time arithmetic leaves the range of [`SystemTime`][std::time::SystemTime].
/// * A repeating timer is created with a zero period.
///
/// # Limited introspection
///
/// Other than implementing the [`std::error::Error`] and [`core::fmt::Debug`] traits, this error type
/// currently provides no introspection capabilities.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use timewarp::Timer;
///
/// let error = Timer::repeating(Duration::ZERO).unwrap_err();
/// assert_eq!(error.to_string(), "a repeating timer must have a non-zero period");
/// ```
#[derive(Debug)]
pub struct Error(ErrorKind);

#[derive(Debug)]
enum ErrorKind {
    UnknownTimer(TimerId),
    OutOfRange(Cow<'static, str>),
    ZeroPeriod,
}

impl Error {
    const fn from_kind(kind: ErrorKind) -> Self {
        Self(kind)
    }

    pub(crate) const fn unknown_timer(id: TimerId) -> Self {
        Self::from_kind(ErrorKind::UnknownTimer(id))
    }

    pub(crate) fn out_of_range(message: impl Into<Cow<'static, str>>) -> Self {
        Self::from_kind(ErrorKind::OutOfRange(message.into()))
    }

    pub(crate) const fn zero_period() -> Self {
        Self::from_kind(ErrorKind::ZeroPeriod)
    }

    #[cfg(test)]
    const fn kind(&self) -> &ErrorKind {
        &self.0
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ErrorKind::UnknownTimer(id) => write!(f, "timer {id} is not registered with the clock"),
            ErrorKind::OutOfRange(msg) => write!(f, "{msg}"),
            ErrorKind::ZeroPeriod => write!(f, "a repeating timer must have a non-zero period"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(Error: Send, Sync, std::error::Error);
    }

    #[test]
    fn unknown_timer_error() {
        let id = TimerId::new(3, 7);
        let error = Error::unknown_timer(id);

        assert!(matches!(error.kind(), ErrorKind::UnknownTimer(v) if *v == id));
        assert_eq!(error.to_string(), "timer #3.7 is not registered with the clock");
    }

    #[test]
    fn out_of_range_error() {
        let error = Error::out_of_range("test");

        assert!(matches!(error.kind(), ErrorKind::OutOfRange(_)));
        assert_eq!(error.to_string(), "test");
    }

    #[test]
    fn zero_period_error() {
        let error = Error::zero_period();

        assert!(matches!(error.kind(), ErrorKind::ZeroPeriod));
        assert_eq!(error.to_string(), "a repeating timer must have a non-zero period");
    }
}
