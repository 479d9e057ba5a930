// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 The OpenState Authors

//! Moments and clocks.
//!
//! All deadlines in the state table are [`Moment`]s taken from a
//! monotonic source, so adjusting the wall clock can neither fire a
//! pending transition early nor hold it back forever.

use core::ops::Add;
use core::time::Duration;
use std::time::Instant;

/// The number of microseconds in a second.
pub const MICROS: u64 = 1_000_000;

/// A moment in time.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Moment {
    inner: Instant,
}

impl Add<Duration> for Moment {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Moment { inner: self.inner + rhs }
    }
}

impl Moment {
    /// Compute the delta `self - earlier` and return as
    /// microseconds. An `earlier` later than `self` yields zero.
    pub fn delta_as_micros(&self, earlier: Moment) -> u64 {
        let delta = self.inner.saturating_duration_since(earlier.inner);
        delta.as_secs() * MICROS + delta.subsec_micros() as u64
    }

    pub fn now() -> Self {
        Self { inner: Instant::now() }
    }
}

impl Default for Moment {
    fn default() -> Self {
        Self::now()
    }
}

/// A source of [`Moment`]s.
///
/// The table never sleeps or arms timers; it only asks the clock for
/// the current moment when a transition is armed or evaluated. Tests
/// substitute a [`ManualClock`] to move time deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Moment;
}

/// The monotonic system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Moment {
        Moment::now()
    }
}

/// A clock which only moves when told to.
#[cfg(any(feature = "test-help", test))]
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset_nanos: core::sync::atomic::AtomicU64,
}

#[cfg(any(feature = "test-help", test))]
impl ManualClock {
    pub fn new() -> Self {
        Self { base: Instant::now(), offset_nanos: Default::default() }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_nanos.fetch_add(
            by.as_nanos() as u64,
            core::sync::atomic::Ordering::SeqCst,
        );
    }
}

#[cfg(any(feature = "test-help", test))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(feature = "test-help", test))]
impl Clock for ManualClock {
    fn now(&self) -> Moment {
        let offset = self
            .offset_nanos
            .load(core::sync::atomic::Ordering::SeqCst);
        Moment { inner: self.base + Duration::from_nanos(offset) }
    }
}
