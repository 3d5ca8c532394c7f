//! Clock sources and bit flags understood by `timerfd_create` / `timerfd_settime`.
use std::ops::{BitOr, BitOrAssign};

/// Clock a timer is driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockSource {
    /// Wall clock, follows `settimeofday` and NTP steps.
    Realtime,
    /// Never goes backwards, ignores wall-clock changes.
    Monotonic,
}

impl Default for ClockSource {
    fn default() -> Self {
        ClockSource::Monotonic
    }
}

impl ClockSource {
    /// The `clockid_t` passed to the kernel.
    pub fn as_raw(self) -> libc::clockid_t {
        match self {
            ClockSource::Realtime => libc::CLOCK_REALTIME,
            ClockSource::Monotonic => libc::CLOCK_MONOTONIC,
        }
    }

    /// Map a raw `clockid_t` back, `None` for clocks this crate doesn't drive timers with.
    pub fn from_raw(raw: libc::clockid_t) -> Option<Self> {
        match raw {
            libc::CLOCK_REALTIME => Some(ClockSource::Realtime),
            libc::CLOCK_MONOTONIC => Some(ClockSource::Monotonic),
            _ => None,
        }
    }
}

macro_rules! impl_bit_flags {
    ($($flags:ident),+) => {
        $(impl $flags {
            /// No flag set.
            pub const fn empty() -> Self {
                $flags(0)
            }

            /// Raw bits as passed to the kernel.
            pub const fn bits(self) -> libc::c_int {
                self.0
            }

            /// Whether every bit of `other` is set in `self`.
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Whether no bit is set.
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl BitOr for $flags {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                $flags(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $flags {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        })+
    }
}

/// Creation flags, applied atomically by `timerfd_create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerFlags(libc::c_int);

impl TimerFlags {
    /// `TFD_CLOEXEC`: the descriptor is not inherited across `exec`.
    pub const CLOSE_ON_EXEC: TimerFlags = TimerFlags(libc::TFD_CLOEXEC);
    /// `TFD_NONBLOCK`: reading an unexpired timer fails with `EAGAIN` instead of blocking.
    pub const NON_BLOCKING: TimerFlags = TimerFlags(libc::TFD_NONBLOCK);

    /// Keep only the bits the kernel accepts at creation.
    pub const fn from_bits_truncate(bits: libc::c_int) -> Self {
        TimerFlags(bits & (libc::TFD_CLOEXEC | libc::TFD_NONBLOCK))
    }
}

impl Default for TimerFlags {
    fn default() -> Self {
        TimerFlags::CLOSE_ON_EXEC | TimerFlags::NON_BLOCKING
    }
}

/// Flags for `timerfd_settime`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArmFlags(libc::c_int);

impl ArmFlags {
    /// `TFD_TIMER_ABSTIME`: the initial expiration is an absolute clock reading.
    pub const ABSOLUTE: ArmFlags = ArmFlags(libc::TFD_TIMER_ABSTIME);
}

impl_bit_flags!(TimerFlags, ArmFlags);
